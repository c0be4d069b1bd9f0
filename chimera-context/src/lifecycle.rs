//! 容器扩展点 - 类似 Spring 的 BeanFactoryPostProcessor / BeanPostProcessor
//!
//! 三类后置处理器在容器启动时按固定顺序被发现、实例化、排序和调用：
//!
//! 1. `BeanDefinitionRegistryPostProcessor` - 可以直接增删改注册表中的定义，
//!    在任何普通 Bean 实例化之前执行
//! 2. `BeanFactoryPostProcessor` - 可以修改已注册定义的元数据
//! 3. `BeanPostProcessor` - 注册到工厂的拦截器链上，包裹之后创建的每一个 Bean
//!
//! 调度逻辑见 [`crate::post_processor_registration`]。

use std::sync::Arc;

use crate::bean::{Bean, BeanDefinition};
use crate::bean_factory::{BeanDefinitionRegistry, ConfigurableListableBeanFactory};
use crate::ContainerResult;

/// Bean 工厂后置处理器
///
/// 在所有 Bean 定义加载完成后、普通 Bean 实例化之前调用，可以修改定义的元数据。
///
/// # 示例
///
/// ```ignore
/// struct LazyServices;
///
/// impl BeanFactoryPostProcessor for LazyServices {
///     fn post_process_bean_factory(
///         &self,
///         bean_factory: &dyn ConfigurableListableBeanFactory,
///     ) -> ContainerResult<()> {
///         for name in bean_factory.get_bean_names() {
///             if name.ends_with("Service") {
///                 bean_factory.modify_bean_definition(&name, &mut |def| def.lazy = true)?;
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait BeanFactoryPostProcessor: Send + Sync {
    fn post_process_bean_factory(
        &self,
        bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()>;

    /// 处理器名称（用于日志）
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Bean 定义注册表后置处理器
///
/// 比 `BeanFactoryPostProcessor` 更早执行，可以注册新的定义，
/// 包括新的注册表后置处理器（它们会在同一轮启动中被继续发现和调用）。
pub trait BeanDefinitionRegistryPostProcessor: BeanFactoryPostProcessor {
    fn post_process_bean_definition_registry(
        &self,
        registry: &dyn BeanDefinitionRegistry,
    ) -> ContainerResult<()>;
}

/// Bean 后置处理器
///
/// 在 Bean 初始化的前后提供钩子，可以返回原始 Bean 或包装后的 Bean。
/// 只对注册之后创建的 Bean 生效。
pub trait BeanPostProcessor: Send + Sync {
    /// 初始化之前调用
    fn post_process_before_initialization(
        &self,
        bean: Bean,
        _bean_name: &str,
    ) -> ContainerResult<Bean> {
        Ok(bean)
    }

    /// 初始化之后调用
    fn post_process_after_initialization(
        &self,
        bean: Bean,
        _bean_name: &str,
    ) -> ContainerResult<Bean> {
        Ok(bean)
    }

    /// 处理器名称（用于日志和调试）
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 是否同时处理合并后的 Bean 定义
    ///
    /// 返回 `Some` 的处理器在注册阶段的最后会被再注册一次。
    fn as_merged_bean_definition_post_processor(
        &self,
    ) -> Option<&dyn MergedBeanDefinitionPostProcessor> {
        None
    }
}

/// 在实例化之后、初始化回调之前接收合并后 Bean 定义的后置处理器
pub trait MergedBeanDefinitionPostProcessor: BeanPostProcessor {
    fn post_process_merged_bean_definition(
        &self,
        definition: &BeanDefinition,
        bean_name: &str,
    ) -> ContainerResult<()>;

    /// 定义被移除或重置时调用
    fn reset_bean_definition(&self, _bean_name: &str) {}
}

/// 通过 API 直接提供给上下文的工厂后置处理器
#[derive(Clone)]
pub enum FactoryPostProcessorHook {
    Registry(Arc<dyn BeanDefinitionRegistryPostProcessor>),
    Factory(Arc<dyn BeanFactoryPostProcessor>),
}

impl FactoryPostProcessorHook {
    pub fn registry<T: BeanDefinitionRegistryPostProcessor + 'static>(processor: T) -> Self {
        FactoryPostProcessorHook::Registry(Arc::new(processor))
    }

    pub fn factory<T: BeanFactoryPostProcessor + 'static>(processor: T) -> Self {
        FactoryPostProcessorHook::Factory(Arc::new(processor))
    }

    pub fn name(&self) -> &str {
        match self {
            FactoryPostProcessorHook::Registry(p) => p.name(),
            FactoryPostProcessorHook::Factory(p) => p.name(),
        }
    }

    pub fn post_process_bean_factory(
        &self,
        bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()> {
        match self {
            FactoryPostProcessorHook::Registry(p) => p.post_process_bean_factory(bean_factory),
            FactoryPostProcessorHook::Factory(p) => p.post_process_bean_factory(bean_factory),
        }
    }
}

impl std::fmt::Debug for FactoryPostProcessorHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactoryPostProcessorHook::Registry(p) => write!(f, "Registry({})", p.name()),
            FactoryPostProcessorHook::Factory(p) => write!(f, "Factory({})", p.name()),
        }
    }
}
