//! 占位符解析 - 类似 Spring 的 PropertySourcesPlaceholderConfigurer
//!
//! 作为 PriorityOrdered 的工厂后置处理器，在普通 Bean 实例化之前把所有定义中
//! 属性值和字符串属性里的 `${...}` 替换为 Environment 中的配置。

use std::sync::Arc;

use crate::{
    bean::{BeanDefinition, BeanRole},
    bean_factory::{BeanFactoryExt, ConfigurableListableBeanFactory, ListableBeanFactory},
    config::{ConfigValue, Environment, PLACEHOLDER_PREFIX},
    constants::ENVIRONMENT_BEAN_NAME,
    error::{ContainerError, ContainerResult},
    lifecycle::BeanFactoryPostProcessor,
    ordering::LOWEST_PRECEDENCE,
};

pub struct PropertyPlaceholderConfigurer {
    environment: Arc<Environment>,
}

impl PropertyPlaceholderConfigurer {
    pub fn new(environment: Arc<Environment>) -> Self {
        Self { environment }
    }

    /// 容器内部使用的定义：从 `environment` 单例取得配置
    pub fn definition() -> BeanDefinition {
        BeanDefinition::factory_post_processor(|ctx| {
            let environment = ctx
                .bean_factory()
                .get_component::<Environment>(ENVIRONMENT_BEAN_NAME)?;
            Ok(PropertyPlaceholderConfigurer::new(environment))
        })
        .priority_ordered(LOWEST_PRECEDENCE)
        .with_role(BeanRole::Infrastructure)
    }

    fn resolve_value(&self, value: &ConfigValue, bean_name: &str) -> ContainerResult<ConfigValue> {
        match value {
            ConfigValue::String(text) if text.contains(PLACEHOLDER_PREFIX) => self
                .environment
                .resolve_placeholders(text)
                .map(ConfigValue::String)
                .map_err(|placeholder| ContainerError::UnresolvablePlaceholder {
                    placeholder,
                    bean: bean_name.to_string(),
                }),
            ConfigValue::Array(values) => values
                .iter()
                .map(|v| self.resolve_value(v, bean_name))
                .collect::<ContainerResult<Vec<_>>>()
                .map(ConfigValue::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_definition(
        &self,
        definition: &mut BeanDefinition,
        bean_name: &str,
    ) -> ContainerResult<bool> {
        let mut changed = false;
        for values in [&mut definition.properties, &mut definition.attributes] {
            for value in values.values_mut() {
                let resolved = self.resolve_value(value, bean_name)?;
                if resolved != *value {
                    *value = resolved;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

impl BeanFactoryPostProcessor for PropertyPlaceholderConfigurer {
    fn post_process_bean_factory(
        &self,
        bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()> {
        let mut resolved_count = 0usize;

        for name in bean_factory.get_bean_names() {
            let mut outcome = Ok(false);
            bean_factory.modify_bean_definition(&name, &mut |definition: &mut BeanDefinition| {
                outcome = self.resolve_definition(definition, &name);
            })?;
            if outcome? {
                tracing::trace!("Resolved placeholders in bean definition '{}'", name);
                resolved_count += 1;
            }
        }

        tracing::debug!("Resolved placeholders in {} bean definition(s)", resolved_count);
        Ok(())
    }

    fn name(&self) -> &str {
        "PropertyPlaceholderConfigurer"
    }
}
