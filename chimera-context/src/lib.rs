// chimera-context: 类似 Spring 的应用上下文引导核心
//
// 负责容器刷新时后置处理器的注册与调用顺序：
// - Bean 定义注册表后置处理器（PriorityOrdered / Ordered / 其余，直到不再出现新定义）
// - Bean 工厂后置处理器
// - Bean 后置处理器链（含内部的合并定义处理器、检查器和监听器探测器）

pub mod app;
pub mod bean;
pub mod bean_factory;
pub mod component;
pub mod config;
pub mod configuration_class;
pub mod constants;
pub mod context;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod listener_detector;
pub mod logging;
pub mod ordering;
pub mod placeholder;
pub mod post_processor_checker;
pub mod post_processor_registration;
pub mod scope;
pub mod utils;

// 重新导出常用类型
pub use app::ChimeraApplication;
pub use bean::{
    Bean, BeanDefinition, BeanKind, BeanRole, BeanSupplier, Capability, CreationContext,
    DefinitionSource,
};
pub use bean_factory::{
    BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
    ConfigurableListableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
};
pub use component::{Component, ComponentSubmission};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use configuration_class::{ConfigurationClassMode, ConfigurationClassPostProcessor};
pub use constants::*;
pub use context::{ApplicationContext, ApplicationContextBuilder, ContextState, ShutdownHook};
pub use error::{ApplicationError, ApplicationResult, ContainerError, ContainerResult, Result};
pub use event::{
    ApplicationEventMulticaster, ApplicationListener, ContextClosedEvent, ContextRefreshedEvent,
    ErrorHandler, Event, SimpleApplicationEventMulticaster,
};
pub use lifecycle::{
    BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor, BeanPostProcessor,
    FactoryPostProcessorHook, MergedBeanDefinitionPostProcessor,
};
pub use listener_detector::ApplicationListenerDetector;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use ordering::{Precedence, HIGHEST_PRECEDENCE, LOWEST_PRECEDENCE};
pub use placeholder::PropertyPlaceholderConfigurer;
pub use post_processor_checker::BeanPostProcessorChecker;
pub use post_processor_registration::{
    invoke_bean_factory_post_processors, register_bean_post_processors,
};
pub use scope::Scope;

// 导出 inventory，供 submit_component! 使用
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::app::ChimeraApplication;
    pub use crate::bean::{Bean, BeanDefinition, BeanKind, BeanRole, CreationContext};
    pub use crate::bean_factory::{
        BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
        ConfigurableListableBeanFactory, ListableBeanFactory,
    };
    pub use crate::component::Component;
    pub use crate::config::{ConfigValue, Environment, MapPropertySource, PropertySource};
    pub use crate::context::ApplicationContext;
    pub use crate::error::{ContainerError, ContainerResult, Result};
    pub use crate::event::{ApplicationListener, Event};
    pub use crate::lifecycle::{
        BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor, BeanPostProcessor,
        FactoryPostProcessorHook, MergedBeanDefinitionPostProcessor,
    };
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::ordering::{Precedence, HIGHEST_PRECEDENCE, LOWEST_PRECEDENCE};
    pub use crate::scope::Scope;
    pub use crate::submit_component;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
