use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean::{Bean, BeanDefinition, BeanKind};
use crate::event::ApplicationEventMulticaster;
use crate::lifecycle::{BeanPostProcessor, MergedBeanDefinitionPostProcessor};
use crate::ContainerResult;

/// 把单例监听器 Bean 注册到事件多播器
///
/// 固定追加在拦截器链的最后。作用域在合并定义阶段记录，
/// 初始化完成后只有单例监听器会被注册。
pub struct ApplicationListenerDetector {
    multicaster: Arc<dyn ApplicationEventMulticaster>,
    singleton_names: RwLock<HashMap<String, bool>>,
}

impl ApplicationListenerDetector {
    pub fn new(multicaster: Arc<dyn ApplicationEventMulticaster>) -> Self {
        Self {
            multicaster,
            singleton_names: RwLock::new(HashMap::new()),
        }
    }
}

impl BeanPostProcessor for ApplicationListenerDetector {
    fn post_process_after_initialization(&self, bean: Bean, bean_name: &str) -> ContainerResult<Bean> {
        if let Bean::Listener(listener) = &bean {
            let singleton = self.singleton_names.read().get(bean_name).copied();
            match singleton {
                Some(true) => {
                    tracing::debug!("Registering singleton listener bean '{}'", bean_name);
                    self.multicaster.add_listener(Arc::clone(listener));
                }
                Some(false) => {
                    tracing::warn!(
                        "Bean '{}' implements ApplicationListener but is not reachable for event \
                         multicasting because it does not have singleton scope",
                        bean_name
                    );
                    self.singleton_names.write().remove(bean_name);
                }
                None => {}
            }
        }
        Ok(bean)
    }

    fn name(&self) -> &str {
        "ApplicationListenerDetector"
    }

    fn as_merged_bean_definition_post_processor(
        &self,
    ) -> Option<&dyn MergedBeanDefinitionPostProcessor> {
        Some(self)
    }
}

impl MergedBeanDefinitionPostProcessor for ApplicationListenerDetector {
    fn post_process_merged_bean_definition(
        &self,
        definition: &BeanDefinition,
        bean_name: &str,
    ) -> ContainerResult<()> {
        if definition.kind == BeanKind::Listener {
            self.singleton_names
                .write()
                .insert(bean_name.to_string(), definition.scope.is_singleton());
        }
        Ok(())
    }

    fn reset_bean_definition(&self, bean_name: &str) {
        self.singleton_names.write().remove(bean_name);
    }
}
