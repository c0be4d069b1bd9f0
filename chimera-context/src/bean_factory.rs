//! Bean Factory - 核心容器接口
//!
//! 参考 Spring 的 BeanFactory 架构设计。启动流程只依赖这里的 trait，
//! `DefaultListableBeanFactory` 是同时实现注册表和工厂接口的默认实现。

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    bean::{Bean, BeanDefinition, Capability, CreationContext},
    config::ConfigValue,
    error::{ContainerError, ContainerResult},
    lifecycle::BeanPostProcessor,
    utils::dependency::CreationTracker,
};

/// BeanFactory - 最基础的容器接口
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean，单例只会创建一次
    fn get_bean(&self, name: &str) -> ContainerResult<Bean>;

    /// 检查是否包含指定名称的 Bean（定义或手动注册的单例）
    fn contains_bean(&self, name: &str) -> bool;

    /// 不实例化地判断指定名称的 Bean 是否满足某项能力
    fn is_type_match(&self, name: &str, capability: Capability) -> bool;
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 获取普通组件并转型为具体类型
    fn get_component<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        bean.downcast::<T>().ok_or_else(|| ContainerError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            found: bean.kind().to_string(),
        })
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 按注册顺序返回所有 Bean 定义的名称
    fn get_bean_names(&self) -> Vec<String>;

    /// 按注册顺序返回满足指定能力的 Bean 名称
    ///
    /// - `include_non_singletons`: 是否包含原型作用域的 Bean
    /// - `allow_eager_init`: 是否允许为判断类型而提前初始化；能力在定义上声明，
    ///   默认实现从不为此实例化
    fn get_bean_names_for_capability(
        &self,
        capability: Capability,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String>;
}

/// BeanDefinitionRegistry - Bean 定义注册表
///
/// 这是注册表后置处理器接收的参数类型
pub trait BeanDefinitionRegistry: Send + Sync {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()>;

    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()>;

    /// 获取原始（未合并的）Bean 定义的副本
    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition>;

    fn contains_bean_definition(&self, name: &str) -> bool;

    fn get_bean_definition_names(&self) -> Vec<String>;

    fn get_bean_definition_count(&self) -> usize;

    /// 在已注册的定义上设置一个属性，不影响定义顺序
    fn set_bean_definition_attribute(
        &self,
        name: &str,
        key: &str,
        value: ConfigValue,
    ) -> ContainerResult<()>;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 在拦截器链末尾追加一个 BeanPostProcessor
    ///
    /// 链按追加顺序执行，同一个处理器可以出现多次
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    fn get_bean_post_processor_count(&self) -> usize;

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;

    /// 注册一个已经创建好的单例
    fn register_singleton(&self, name: &str, bean: Bean) -> ContainerResult<()>;

    fn contains_singleton(&self, name: &str) -> bool;
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
///
/// 这是 BeanFactoryPostProcessor 接收的参数类型
pub trait ConfigurableListableBeanFactory: ListableBeanFactory + ConfigurableBeanFactory {
    /// 获取合并父定义后的 Bean 定义，结果会被缓存
    fn get_merged_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>>;

    /// 修改原始 Bean 定义
    ///
    /// 已缓存的合并定义不会立即失效，Bean 首次创建时会重新合并
    fn modify_bean_definition(
        &self,
        name: &str,
        modifier: &mut dyn FnMut(&mut BeanDefinition),
    ) -> ContainerResult<()>;

    /// 清除尚未创建的 Bean 的合并定义缓存
    fn clear_metadata_cache(&self);

    /// 预实例化所有非延迟加载的单例 Bean
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;

    /// 冻结配置（不再允许修改 Bean 定义）
    fn freeze_configuration(&self);

    fn is_configuration_frozen(&self) -> bool;

    /// 丢弃所有单例实例
    fn destroy_singletons(&self);

    /// 如果工厂同时是注册表则返回注册表视图
    fn as_registry(&self) -> Option<&dyn BeanDefinitionRegistry>;
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
///
/// 调用供应函数、拦截器和后置处理器时不持有任何锁，因此这些回调可以重入工厂
/// （注册定义、获取其他 Bean、追加拦截器）。
pub struct DefaultListableBeanFactory {
    /// Bean 定义存储
    definitions: RwLock<HashMap<String, BeanDefinition>>,

    /// 定义名称，按注册顺序
    definition_names: RwLock<Vec<String>>,

    /// 合并定义缓存
    merged_definitions: RwLock<HashMap<String, Arc<BeanDefinition>>>,

    /// 至少创建过一次的 Bean 名称
    already_created: RwLock<HashSet<String>>,

    /// 单例 Bean 缓存
    singletons: RwLock<HashMap<String, Bean>>,

    /// 没有定义、直接注册的单例名称，按注册顺序
    manual_singleton_names: RwLock<Vec<String>>,

    /// 循环依赖检测
    creation_tracker: CreationTracker,

    /// Bean 后置处理器链，按追加顺序
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    /// 配置是否已冻结
    configuration_frozen: RwLock<bool>,
}

impl DefaultListableBeanFactory {
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            definition_names: RwLock::new(Vec::new()),
            merged_definitions: RwLock::new(HashMap::new()),
            already_created: RwLock::new(HashSet::new()),
            singletons: RwLock::new(HashMap::new()),
            manual_singleton_names: RwLock::new(Vec::new()),
            creation_tracker: CreationTracker::new(),
            bean_post_processors: RwLock::new(Vec::new()),
            configuration_frozen: RwLock::new(false),
        }
    }

    fn check_not_frozen(&self, action: &'static str) -> ContainerResult<()> {
        if *self.configuration_frozen.read() {
            return Err(ContainerError::ConfigurationFrozen(action));
        }
        Ok(())
    }

    /// 首次创建时丢弃合并定义缓存，之后按最新的原始定义重新合并
    fn mark_bean_as_created(&self, name: &str) {
        if self.already_created.read().contains(name) {
            return;
        }
        let first = self.already_created.write().insert(name.to_string());
        if first {
            self.merged_definitions.write().remove(name);
            tracing::trace!("Re-merging bean definition '{}' before first creation", name);
        }
    }

    fn merge_definition(
        &self,
        name: &str,
        chain: &mut Vec<String>,
    ) -> ContainerResult<Arc<BeanDefinition>> {
        if let Some(merged) = self.merged_definitions.read().get(name) {
            return Ok(Arc::clone(merged));
        }

        if chain.iter().any(|n| n == name) {
            chain.push(name.to_string());
            return Err(ContainerError::creation_failed(
                name,
                format!("circular parent definitions: {}", chain.join(" -> ")),
            ));
        }

        let definition = self.get_bean_definition(name)?;
        let merged = match definition.parent.as_deref() {
            Some(parent_name) => {
                chain.push(name.to_string());
                let parent = self.merge_definition(parent_name, chain)?;
                chain.pop();
                definition.merge_with_parent(&parent)
            }
            None => definition,
        };

        let merged = Arc::new(merged);
        self.merged_definitions
            .write()
            .insert(name.to_string(), Arc::clone(&merged));
        Ok(merged)
    }

    /// 创建 Bean 实例并调用后置处理器
    ///
    /// 1. 创建 depends-on 声明的 Bean
    /// 2. 调用供应函数实例化
    /// 3. MergedBeanDefinitionPostProcessor.post_process_merged_bean_definition
    /// 4. BeanPostProcessor.post_process_before_initialization
    /// 5. BeanPostProcessor.post_process_after_initialization
    fn create_bean(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<Bean> {
        if !self.creation_tracker.start_creating(name) {
            let mut chain = self.creation_tracker.current_creating();
            chain.push(name.to_string());
            return Err(ContainerError::CircularDependency(chain.join(" -> ")));
        }

        // 使用 RAII 模式确保在任何情况下都会清理标记
        struct CreationGuard<'a> {
            tracker: &'a CreationTracker,
            name: &'a str,
        }

        impl Drop for CreationGuard<'_> {
            fn drop(&mut self) {
                self.tracker.finish_creating(self.name);
            }
        }

        let _guard = CreationGuard {
            tracker: &self.creation_tracker,
            name,
        };

        for dependency in &definition.dependencies {
            tracing::trace!("Bean '{}' depends on '{}'", name, dependency);
            self.get_bean(dependency)?;
        }

        let supplier = definition
            .supplier
            .clone()
            .ok_or_else(|| ContainerError::creation_failed(name, "no supplier defined"))?;

        let context = CreationContext::new(name, definition, self);
        let bean = supplier(&context).map_err(|e| match e {
            ContainerError::Other(source) => ContainerError::creation_failed(name, source),
            other => other,
        })?;

        if bean.kind() != definition.kind {
            return Err(ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: definition.kind.to_string(),
                found: bean.kind().to_string(),
            });
        }

        // 快照拦截器链，回调期间不持锁
        let processors = self.get_bean_post_processors();

        for processor in &processors {
            if let Some(merged) = processor.as_merged_bean_definition_post_processor() {
                merged.post_process_merged_bean_definition(definition, name)?;
            }
        }

        let mut bean = bean;
        for processor in &processors {
            bean = processor.post_process_before_initialization(bean, name)?;
        }
        for processor in &processors {
            bean = processor.post_process_after_initialization(bean, name)?;
        }

        Ok(bean)
    }
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<Bean> {
        tracing::trace!("Requesting bean: '{}'", name);

        if let Some(bean) = self.singletons.read().get(name) {
            tracing::trace!("Returning cached instance of singleton bean '{}'", name);
            return Ok(bean.clone());
        }

        self.mark_bean_as_created(name);
        let definition = self.get_merged_bean_definition(name)?;
        if definition.is_abstract {
            return Err(ContainerError::creation_failed(
                name,
                "bean definition is abstract",
            ));
        }

        if definition.scope.is_singleton() {
            tracing::debug!("Creating shared instance of singleton bean '{}'", name);
            let bean = self.create_bean(name, &definition)?;
            self.singletons
                .write()
                .insert(name.to_string(), bean.clone());
            Ok(bean)
        } else {
            tracing::debug!("Creating new instance of prototype bean '{}'", name);
            self.create_bean(name, &definition)
        }
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name) || self.singletons.read().contains_key(name)
    }

    fn is_type_match(&self, name: &str, capability: Capability) -> bool {
        if self.contains_bean_definition(name) {
            return self
                .get_merged_bean_definition(name)
                .map(|def| def.matches(capability))
                .unwrap_or(false);
        }

        // 手动注册的单例只有种类，没有优先级
        match self.singletons.read().get(name) {
            Some(bean) => BeanDefinition {
                kind: bean.kind(),
                ..BeanDefinition::default()
            }
            .matches(capability),
            None => false,
        }
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_names(&self) -> Vec<String> {
        self.definition_names.read().clone()
    }

    fn get_bean_names_for_capability(
        &self,
        capability: Capability,
        include_non_singletons: bool,
        _allow_eager_init: bool,
    ) -> Vec<String> {
        let mut result = Vec::new();

        for name in self.get_bean_names() {
            let definition = match self.get_merged_bean_definition(&name) {
                Ok(definition) => definition,
                Err(e) => {
                    tracing::trace!("Skipping bean '{}' during type lookup: {}", name, e);
                    continue;
                }
            };
            if definition.is_abstract {
                continue;
            }
            if !include_non_singletons && !definition.scope.is_singleton() {
                continue;
            }
            if definition.matches(capability) {
                result.push(name);
            }
        }

        let manual_names = self.manual_singleton_names.read().clone();
        for name in manual_names {
            if self.is_type_match(&name, capability) {
                result.push(name);
            }
        }

        result
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        self.check_not_frozen("register bean definition")?;

        tracing::trace!(
            "Attempting to register bean: name='{}', type='{}', kind={}, scope={}",
            name,
            definition.type_name,
            definition.kind,
            definition.scope
        );

        {
            let mut definitions = self.definitions.write();
            if definitions.contains_key(name) || self.singletons.read().contains_key(name) {
                tracing::warn!("Bean '{}' already exists, registration failed", name);
                return Err(ContainerError::BeanAlreadyExists(name.to_string()));
            }
            definitions.insert(name.to_string(), definition);
        }
        self.definition_names.write().push(name.to_string());
        self.merged_definitions.write().remove(name);

        tracing::debug!("Bean definition registered successfully: '{}'", name);
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()> {
        self.check_not_frozen("remove bean definition")?;

        self.definitions
            .write()
            .remove(name)
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))?;
        self.definition_names.write().retain(|n| n != name);
        self.merged_definitions.write().remove(name);
        self.singletons.write().remove(name);

        for processor in self.get_bean_post_processors() {
            if let Some(merged) = processor.as_merged_bean_definition_post_processor() {
                merged.reset_bean_definition(name);
            }
        }

        tracing::debug!("Bean definition removed: '{}'", name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.definition_names.read().clone()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.definitions.read().len()
    }

    fn set_bean_definition_attribute(
        &self,
        name: &str,
        key: &str,
        value: ConfigValue,
    ) -> ContainerResult<()> {
        self.check_not_frozen("set bean definition attribute")?;

        self.definitions
            .write()
            .get_mut(name)
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))?
            .set_attribute(key, value);
        self.merged_definitions.write().remove(name);
        Ok(())
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        tracing::trace!("Adding BeanPostProcessor: {}", processor.name());
        self.bean_post_processors.write().push(processor);
    }

    fn get_bean_post_processor_count(&self) -> usize {
        self.bean_post_processors.read().len()
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }

    fn register_singleton(&self, name: &str, bean: Bean) -> ContainerResult<()> {
        {
            let mut singletons = self.singletons.write();
            if singletons.contains_key(name) {
                return Err(ContainerError::BeanAlreadyExists(name.to_string()));
            }
            singletons.insert(name.to_string(), bean);
        }
        if !self.contains_bean_definition(name) {
            self.manual_singleton_names.write().push(name.to_string());
        }
        tracing::debug!("Registered singleton bean '{}'", name);
        Ok(())
    }

    fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn get_merged_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        self.merge_definition(name, &mut Vec::new())
    }

    fn modify_bean_definition(
        &self,
        name: &str,
        modifier: &mut dyn FnMut(&mut BeanDefinition),
    ) -> ContainerResult<()> {
        self.check_not_frozen("modify bean definition")?;

        // 先取出定义再回调，避免回调期间持锁
        let mut definition = self.get_bean_definition(name)?;
        modifier(&mut definition);
        self.definitions.write().insert(name.to_string(), definition);

        tracing::debug!("Bean definition '{}' modified successfully", name);
        Ok(())
    }

    fn clear_metadata_cache(&self) {
        let created = self.already_created.read();
        self.merged_definitions
            .write()
            .retain(|name, _| created.contains(name));
        tracing::trace!("Cleared merged bean definition cache");
    }

    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let names = self.get_bean_names();
        tracing::debug!("Pre-instantiating singletons among {} bean(s)", names.len());

        for name in names {
            let definition = self.get_merged_bean_definition(&name)?;
            if definition.is_abstract || definition.lazy || !definition.scope.is_singleton() {
                continue;
            }
            self.get_bean(&name)?;
        }

        Ok(())
    }

    fn freeze_configuration(&self) {
        *self.configuration_frozen.write() = true;
        tracing::debug!("Bean factory configuration frozen");
    }

    fn is_configuration_frozen(&self) -> bool {
        *self.configuration_frozen.read()
    }

    fn destroy_singletons(&self) {
        let count = {
            let mut singletons = self.singletons.write();
            let count = singletons.len();
            singletons.clear();
            count
        };
        self.manual_singleton_names.write().clear();
        tracing::info!("Destroyed {} singleton bean(s)", count);
    }

    fn as_registry(&self) -> Option<&dyn BeanDefinitionRegistry> {
        Some(self)
    }
}
