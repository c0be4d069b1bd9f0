use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    bean::{Bean, BeanDefinition},
    bean_factory::{
        BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
        ConfigurableListableBeanFactory, DefaultListableBeanFactory,
    },
    component::{register_submitted_components, Component},
    config::{Environment, PropertySource},
    configuration_class::ConfigurationClassPostProcessor,
    constants::{
        CONFIGURATION_CLASS_POST_PROCESSOR_BEAN_NAME, ENVIRONMENT_BEAN_NAME,
        PROPERTY_PLACEHOLDER_CONFIGURER_BEAN_NAME,
    },
    error::{ContainerError, ContainerResult},
    event::{
        ApplicationEventMulticaster, ApplicationListener, ContextClosedEvent,
        ContextRefreshedEvent, Event, SimpleApplicationEventMulticaster,
    },
    lifecycle::FactoryPostProcessorHook,
    placeholder::PropertyPlaceholderConfigurer,
    post_processor_registration::{
        invoke_bean_factory_post_processors, register_bean_post_processors,
    },
};

/// Shutdown hook类型
pub type ShutdownHook = Box<dyn Fn() -> ContainerResult<()> + Send + Sync>;

/// 上下文生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// 已创建，可以继续注册定义和处理器
    Created,
    /// 正在刷新
    Refreshing,
    /// 刷新完成
    Active,
    /// 刷新失败
    Failed,
    Closed,
}

/// 应用上下文
///
/// 持有 BeanFactory、Environment 和事件多播器，`refresh()` 负责完整的启动流程：
///
/// 1. 注册 Environment 单例和内部处理器（配置类处理器、占位符解析器）
/// 2. 调用 Bean 工厂后置处理器
/// 3. 注册 Bean 后置处理器
/// 4. 冻结配置并预实例化非延迟单例
/// 5. 发布 `ContextRefreshedEvent`
pub struct ApplicationContext {
    /// Bean 工厂 - 负责 Bean 的创建和管理
    bean_factory: Arc<DefaultListableBeanFactory>,

    /// 配置环境
    environment: Arc<Environment>,

    /// 事件多播器
    multicaster: Arc<SimpleApplicationEventMulticaster>,

    /// 通过 API 提供的 Bean 工厂后置处理器（按添加顺序）
    bean_factory_post_processors: RwLock<Vec<FactoryPostProcessorHook>>,

    shutdown_hooks: RwLock<Vec<ShutdownHook>>,

    state: RwLock<ContextState>,
}

impl ApplicationContext {
    pub fn new() -> Self {
        Self::with_environment(Arc::new(Environment::new()))
    }

    pub fn with_environment(environment: Arc<Environment>) -> Self {
        Self {
            bean_factory: Arc::new(DefaultListableBeanFactory::new()),
            environment,
            multicaster: Arc::new(SimpleApplicationEventMulticaster::new()),
            bean_factory_post_processors: RwLock::new(Vec::new()),
            shutdown_hooks: RwLock::new(Vec::new()),
            state: RwLock::new(ContextState::Created),
        }
    }

    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// 获取内部的 BeanFactory
    pub fn bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn multicaster(&self) -> &Arc<SimpleApplicationEventMulticaster> {
        &self.multicaster
    }

    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }

    /// 注册 Bean 定义
    pub fn register_bean_definition(
        &self,
        name: &str,
        definition: BeanDefinition,
    ) -> ContainerResult<()> {
        self.bean_factory.register_bean_definition(name, definition)
    }

    /// 注册组件
    pub fn register_component<T: Component>(&self) -> ContainerResult<()> {
        self.register_bean_definition(T::BEAN_NAME, T::definition())
    }

    /// 注册一个已经创建好的对象作为单例
    pub fn register_singleton<T: Any + Send + Sync>(
        &self,
        name: &str,
        value: T,
    ) -> ContainerResult<()> {
        self.bean_factory.register_singleton(name, Bean::component(value))
    }

    /// 添加 Bean 工厂后置处理器，刷新时按添加顺序在所有注册表来源的处理器之前处理
    pub fn add_bean_factory_post_processor(&self, processor: FactoryPostProcessorHook) {
        tracing::debug!("Adding BeanFactoryPostProcessor: {:?}", processor);
        self.bean_factory_post_processors.write().push(processor);
    }

    pub fn get_bean_factory_post_processors(&self) -> Vec<FactoryPostProcessorHook> {
        self.bean_factory_post_processors.read().clone()
    }

    /// 直接添加事件监听器
    pub fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>) {
        self.multicaster.add_listener(listener);
    }

    pub fn publish_event(&self, event: Arc<dyn Event>) {
        self.multicaster.multicast_event(event);
    }

    /// 注册 shutdown hook，在 `close()` 时执行
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.shutdown_hooks.write().push(Box::new(hook));
    }

    pub fn get_bean(&self, name: &str) -> ContainerResult<Bean> {
        self.bean_factory.get_bean(name)
    }

    /// 获取普通组件
    pub fn get_component<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.bean_factory.get_component::<T>(name)
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }

    /// 刷新上下文，只能调用一次
    ///
    /// 失败时销毁已经创建的单例并返回原始错误
    pub fn refresh(&self) -> ContainerResult<()> {
        {
            let mut state = self.state.write();
            if *state != ContextState::Created {
                return Err(ContainerError::AlreadyRefreshed);
            }
            *state = ContextState::Refreshing;
        }

        let start = std::time::Instant::now();
        tracing::info!("Refreshing application context");

        match self.do_refresh() {
            Ok(()) => {
                *self.state.write() = ContextState::Active;
                tracing::info!(
                    "Application context refreshed in {} ms with {} bean definition(s)",
                    start.elapsed().as_millis(),
                    self.bean_factory.get_bean_definition_count()
                );
                self.publish_event(Arc::new(ContextRefreshedEvent::new(
                    self.bean_factory.get_bean_definition_count(),
                )));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "Exception encountered during context initialization - cancelling refresh attempt: {}",
                    e
                );
                self.bean_factory.destroy_singletons();
                *self.state.write() = ContextState::Failed;
                Err(e)
            }
        }
    }

    fn do_refresh(&self) -> ContainerResult<()> {
        self.prepare_bean_factory()?;

        let hooks = self.get_bean_factory_post_processors();
        invoke_bean_factory_post_processors(self.bean_factory.as_ref(), &hooks)?;

        let bean_factory: Arc<dyn ConfigurableListableBeanFactory> = self.bean_factory.clone();
        let multicaster: Arc<dyn ApplicationEventMulticaster> = self.multicaster.clone();
        register_bean_post_processors(&bean_factory, multicaster)?;

        self.bean_factory.freeze_configuration();
        self.bean_factory.preinstantiate_singletons()
    }

    /// 注册 Environment 和内部处理器，已存在同名定义时跳过
    fn prepare_bean_factory(&self) -> ContainerResult<()> {
        if !self.bean_factory.contains_bean(ENVIRONMENT_BEAN_NAME) {
            let environment: Arc<dyn Any + Send + Sync> = self.environment.clone();
            self.bean_factory
                .register_singleton(ENVIRONMENT_BEAN_NAME, Bean::Component(environment))?;
        }

        let internal = [
            (
                CONFIGURATION_CLASS_POST_PROCESSOR_BEAN_NAME,
                ConfigurationClassPostProcessor::definition as fn() -> BeanDefinition,
            ),
            (
                PROPERTY_PLACEHOLDER_CONFIGURER_BEAN_NAME,
                PropertyPlaceholderConfigurer::definition,
            ),
        ];
        for (name, definition) in internal {
            if !self.bean_factory.contains_bean_definition(name) {
                tracing::debug!("Registering internal post-processor '{}'", name);
                self.bean_factory.register_bean_definition(name, definition())?;
            }
        }
        Ok(())
    }

    /// 关闭上下文：发布关闭事件、执行 shutdown hooks、销毁单例
    ///
    /// 未刷新或已关闭时什么也不做
    pub fn close(&self) -> ContainerResult<()> {
        {
            let mut state = self.state.write();
            if *state != ContextState::Active {
                tracing::debug!("Context is not active ({:?}), skipping close", *state);
                return Ok(());
            }
            *state = ContextState::Closed;
        }

        tracing::info!("Closing application context");
        self.publish_event(Arc::new(ContextClosedEvent::new()));

        let hooks = self.shutdown_hooks.read();
        tracing::debug!("Executing {} shutdown hook(s)", hooks.len());
        for (idx, hook) in hooks.iter().enumerate() {
            match hook() {
                Ok(()) => tracing::debug!("Shutdown hook {} executed successfully", idx + 1),
                Err(e) => tracing::warn!("Shutdown hook {} failed: {}", idx + 1, e),
            }
        }
        drop(hooks);

        self.bean_factory.destroy_singletons();
        self.multicaster.remove_all_listeners();
        Ok(())
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    context: ApplicationContext,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            context: ApplicationContext::new(),
        }
    }

    /// 使用已有的 Environment
    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.context.environment = environment;
        self
    }

    /// 注册 Bean 定义
    pub fn register_bean_definition(
        self,
        name: &str,
        definition: BeanDefinition,
    ) -> ContainerResult<Self> {
        self.context.register_bean_definition(name, definition)?;
        Ok(self)
    }

    pub fn register_component<T: Component>(self) -> ContainerResult<Self> {
        self.context.register_component::<T>()?;
        Ok(self)
    }

    /// 注册通过 `submit_component!` 提交的所有组件
    pub fn scan_components(self) -> ContainerResult<Self> {
        register_submitted_components(self.context.bean_factory.as_ref())?;
        Ok(self)
    }

    pub fn add_bean_factory_post_processor(self, processor: FactoryPostProcessorHook) -> Self {
        self.context.add_bean_factory_post_processor(processor);
        self
    }

    pub fn add_application_listener(self, listener: Arc<dyn ApplicationListener>) -> Self {
        self.context.add_application_listener(listener);
        self
    }

    /// 添加配置源到 Environment
    pub fn add_property_source(self, source: Box<dyn PropertySource>) -> Self {
        self.context.environment.add_property_source(source);
        self
    }

    /// 设置激活的 profiles
    pub fn set_active_profiles(self, profiles: Vec<String>) -> Self {
        self.context.environment.set_active_profiles(profiles);
        self
    }

    /// 构建上下文（未刷新）
    pub fn build(self) -> Arc<ApplicationContext> {
        Arc::new(self.context)
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
