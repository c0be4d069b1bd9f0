//! 配置类处理 - 类似 Spring 的 ConfigurationClassPostProcessor
//!
//! 容器在启动前以基础设施角色注册此处理器，它本身也通过注册表后置处理器的
//! 调度流程被发现和调用（PriorityOrdered 批次）。
//!
//! - 注册表回调：把配置类标记为 `full`，声明了 Bean 或 import 的普通组件标记为 `lite`，
//!   然后注册声明的 Bean 和 import 的定义。新注册的配置类会继续被处理。
//! - 工厂回调：把 `full` 配置类标记为已增强。

use std::collections::{HashSet, VecDeque};

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::{
    bean::{BeanDefinition, BeanRole, DefinitionSource},
    bean_factory::{BeanDefinitionRegistry, ConfigurableListableBeanFactory, ListableBeanFactory},
    config::ConfigValue,
    constants::{
        CONFIGURATION_CLASS_ATTRIBUTE, CONFIGURATION_CLASS_FULL, CONFIGURATION_CLASS_LITE,
        ENHANCED_ATTRIBUTE,
    },
    error::ContainerResult,
    lifecycle::{BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor},
    ordering::LOWEST_PRECEDENCE,
};

/// 配置类模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationClassMode {
    Full,
    Lite,
}

impl ConfigurationClassMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigurationClassMode::Full => CONFIGURATION_CLASS_FULL,
            ConfigurationClassMode::Lite => CONFIGURATION_CLASS_LITE,
        }
    }

    /// 根据定义判断配置类模式，不是配置类时返回 None
    pub fn detect(definition: &BeanDefinition) -> Option<Self> {
        if definition.source == DefinitionSource::Configuration {
            Some(ConfigurationClassMode::Full)
        } else if !definition.declared.is_empty() || !definition.imports.is_empty() {
            Some(ConfigurationClassMode::Lite)
        } else {
            None
        }
    }

    /// 读取定义上已经标记的模式
    pub fn of(definition: &BeanDefinition) -> Option<Self> {
        match definition
            .get_attribute(CONFIGURATION_CLASS_ATTRIBUTE)
            .and_then(ConfigValue::as_str)
        {
            Some(CONFIGURATION_CLASS_FULL) => Some(ConfigurationClassMode::Full),
            Some(CONFIGURATION_CLASS_LITE) => Some(ConfigurationClassMode::Lite),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct ConfigurationClassPostProcessor {
    /// 已处理过的注册表（按对象地址）
    registries_post_processed: Mutex<HashSet<usize>>,

    /// 已处理过的工厂（按对象地址）
    factories_post_processed: Mutex<HashSet<usize>>,
}

impl ConfigurationClassPostProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 容器内部使用的定义
    pub fn definition() -> BeanDefinition {
        BeanDefinition::registry_post_processor(|_| Ok(ConfigurationClassPostProcessor::new()))
            .priority_ordered(LOWEST_PRECEDENCE)
            .with_role(BeanRole::Infrastructure)
    }

    /// 处理注册表中的所有配置类候选
    ///
    /// 返回新注册的定义数量
    pub fn process_config_bean_definitions(
        &self,
        registry: &dyn BeanDefinitionRegistry,
    ) -> ContainerResult<usize> {
        let mut candidates: VecDeque<String> = VecDeque::new();
        for name in registry.get_bean_definition_names() {
            let definition = registry.get_bean_definition(&name)?;
            if ConfigurationClassMode::of(&definition).is_some() {
                tracing::debug!(
                    "Bean definition has already been processed as a configuration class: '{}'",
                    name
                );
                continue;
            }
            if ConfigurationClassMode::detect(&definition).is_some() {
                candidates.push_back(name);
            }
        }

        if candidates.is_empty() {
            return Ok(0);
        }

        let mut registered = 0usize;
        while let Some(name) = candidates.pop_front() {
            let definition = registry.get_bean_definition(&name)?;
            let Some(mode) = ConfigurationClassMode::detect(&definition) else {
                continue;
            };

            registry.set_bean_definition_attribute(
                &name,
                CONFIGURATION_CLASS_ATTRIBUTE,
                ConfigValue::from(mode.as_str()),
            )?;
            tracing::debug!("Processing {} configuration class '{}'", mode.as_str(), name);

            for imported in definition.imports {
                let imported_name = imported.type_name.clone();
                // 被引入的配置类保留来源，以便继续按 full 模式处理
                let imported = if imported.source == DefinitionSource::Manual {
                    imported.with_source(DefinitionSource::Import)
                } else {
                    imported
                };
                if self.register_if_absent(registry, &imported_name, imported, &mut candidates)? {
                    registered += 1;
                }
            }

            for (bean_name, declared) in definition.declared {
                let declared = declared.with_source(DefinitionSource::BeanMethod {
                    factory_bean: name.clone(),
                });
                if self.register_if_absent(registry, &bean_name, declared, &mut candidates)? {
                    registered += 1;
                }
            }
        }

        tracing::info!(
            "Registered {} bean definition(s) from configuration classes",
            registered
        );
        Ok(registered)
    }

    fn register_if_absent(
        &self,
        registry: &dyn BeanDefinitionRegistry,
        name: &str,
        definition: BeanDefinition,
        candidates: &mut VecDeque<String>,
    ) -> ContainerResult<bool> {
        if registry.contains_bean_definition(name) {
            tracing::debug!(
                "Skipping bean definition '{}': a definition with that name already exists",
                name
            );
            return Ok(false);
        }

        let is_candidate = ConfigurationClassMode::detect(&definition).is_some();
        registry.register_bean_definition(name, definition)?;
        if is_candidate {
            candidates.push_back(name.to_string());
        }
        Ok(true)
    }

    /// 标记 full 配置类为已增强
    fn enhance_configuration_classes(
        &self,
        bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()> {
        for name in bean_factory.get_bean_names() {
            let definition = bean_factory.get_merged_bean_definition(&name)?;
            if ConfigurationClassMode::of(&definition) != Some(ConfigurationClassMode::Full) {
                continue;
            }
            bean_factory.modify_bean_definition(&name, &mut |definition: &mut BeanDefinition| {
                definition.set_attribute(ENHANCED_ATTRIBUTE, true);
            })?;
            tracing::trace!("Enhanced configuration class '{}'", name);
        }
        Ok(())
    }
}

/// 对象地址，用于识别同一个注册表或工厂
fn identity<T: ?Sized>(target: &T) -> usize {
    target as *const T as *const () as usize
}

impl BeanDefinitionRegistryPostProcessor for ConfigurationClassPostProcessor {
    fn post_process_bean_definition_registry(
        &self,
        registry: &dyn BeanDefinitionRegistry,
    ) -> ContainerResult<()> {
        let registry_id = identity(registry);
        if !self.registries_post_processed.lock().insert(registry_id) {
            return Err(anyhow!(
                "post_process_bean_definition_registry already called on this post-processor \
                 against registry {:#x}",
                registry_id
            )
            .into());
        }
        if self.factories_post_processed.lock().contains(&registry_id) {
            return Err(anyhow!(
                "post_process_bean_factory already called on this post-processor \
                 against registry {:#x}",
                registry_id
            )
            .into());
        }

        self.process_config_bean_definitions(registry)?;
        Ok(())
    }
}

impl BeanFactoryPostProcessor for ConfigurationClassPostProcessor {
    fn post_process_bean_factory(
        &self,
        bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()> {
        let factory_id = identity(bean_factory);
        if !self.factories_post_processed.lock().insert(factory_id) {
            return Err(anyhow!(
                "post_process_bean_factory already called on this post-processor \
                 against factory {:#x}",
                factory_id
            )
            .into());
        }

        let processed = self.registries_post_processed.lock().contains(&factory_id);
        if !processed {
            // 注册表回调没有被调用过，这里补做
            if let Some(registry) = bean_factory.as_registry() {
                self.process_config_bean_definitions(registry)?;
            }
        }

        self.enhance_configuration_classes(bean_factory)
    }

    fn name(&self) -> &str {
        "ConfigurationClassPostProcessor"
    }
}
