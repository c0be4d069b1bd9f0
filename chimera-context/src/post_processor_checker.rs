use std::sync::Weak;

use crate::bean::{Bean, BeanRole};
use crate::bean_factory::{ConfigurableBeanFactory, ConfigurableListableBeanFactory};
use crate::lifecycle::BeanPostProcessor;
use crate::ContainerResult;

/// 在拦截器链尚未完整时提示提前创建的 Bean
///
/// 注册阶段最先加入拦截器链。此后、在所有 BeanPostProcessor 就位之前创建的普通 Bean
/// 不会被全部拦截器处理（例如无法被代理），这里只记录一条 INFO 日志，不做任何修改。
pub struct BeanPostProcessorChecker {
    bean_factory: Weak<dyn ConfigurableListableBeanFactory>,
    post_processor_target_count: usize,
}

impl BeanPostProcessorChecker {
    pub fn new(
        bean_factory: Weak<dyn ConfigurableListableBeanFactory>,
        post_processor_target_count: usize,
    ) -> Self {
        Self {
            bean_factory,
            post_processor_target_count,
        }
    }

    pub fn target_count(&self) -> usize {
        self.post_processor_target_count
    }

    /// 拦截器链是否尚未达到目标数量
    fn chain_incomplete(&self, current_count: usize) -> bool {
        current_count < self.post_processor_target_count
    }

    fn is_infrastructure_bean(
        bean_factory: &dyn ConfigurableListableBeanFactory,
        bean_name: &str,
    ) -> bool {
        bean_factory
            .get_merged_bean_definition(bean_name)
            .map(|definition| definition.role == BeanRole::Infrastructure)
            .unwrap_or(false)
    }
}

impl BeanPostProcessor for BeanPostProcessorChecker {
    fn post_process_after_initialization(&self, bean: Bean, bean_name: &str) -> ContainerResult<Bean> {
        let Some(bean_factory) = self.bean_factory.upgrade() else {
            return Ok(bean);
        };

        if !bean.is_post_processor()
            && !Self::is_infrastructure_bean(bean_factory.as_ref(), bean_name)
            && self.chain_incomplete(bean_factory.get_bean_post_processor_count())
        {
            tracing::info!(
                bean = bean_name,
                kind = %bean.kind(),
                "Bean '{}' of kind [{}] is not eligible for getting processed by all \
                 BeanPostProcessors (for example: not eligible for auto-proxying)",
                bean_name,
                bean.kind()
            );
        }

        Ok(bean)
    }

    fn name(&self) -> &str {
        "BeanPostProcessorChecker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean_factory::DefaultListableBeanFactory;
    use std::sync::Arc;

    fn checker(target: usize) -> BeanPostProcessorChecker {
        let factory: Arc<dyn ConfigurableListableBeanFactory> =
            Arc::new(DefaultListableBeanFactory::new());
        BeanPostProcessorChecker::new(Arc::downgrade(&factory), target)
    }

    #[test]
    fn test_chain_incomplete_below_target_only() {
        let checker = checker(3);
        assert_eq!(checker.target_count(), 3);
        assert!(checker.chain_incomplete(0));
        assert!(checker.chain_incomplete(2));
        // 达到目标数量时不再提示
        assert!(!checker.chain_incomplete(3));
        assert!(!checker.chain_incomplete(4));
    }

    #[test]
    fn test_bean_passes_through_without_factory() {
        // 工厂已释放，检查器直接放行
        let checker = checker(5);
        let bean = checker
            .post_process_after_initialization(Bean::component(7u8), "orphan")
            .unwrap();
        assert_eq!(*bean.downcast::<u8>().unwrap(), 7);
    }
}
