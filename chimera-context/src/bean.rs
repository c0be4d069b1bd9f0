use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::bean_factory::{BeanFactory, ConfigurableListableBeanFactory};
use crate::config::ConfigValue;
use crate::event::ApplicationListener;
use crate::lifecycle::{
    BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor, BeanPostProcessor,
};
use crate::ordering::Precedence;
use crate::{ContainerResult, Scope};

/// 容器创建出的 Bean 实例
///
/// 按 Bean 在启动流程中扮演的角色区分，启动流程通过匹配变体来分派，
/// 不做运行时的类型探测。
#[derive(Clone)]
pub enum Bean {
    /// 普通组件
    Component(Arc<dyn Any + Send + Sync>),

    /// Bean 工厂后置处理器
    FactoryPostProcessor(Arc<dyn BeanFactoryPostProcessor>),

    /// Bean 定义注册表后置处理器（同时也是工厂后置处理器）
    RegistryPostProcessor(Arc<dyn BeanDefinitionRegistryPostProcessor>),

    /// Bean 后置处理器（实例级拦截器）
    PostProcessor(Arc<dyn BeanPostProcessor>),

    /// 事件监听器
    Listener(Arc<dyn ApplicationListener>),
}

impl Bean {
    pub fn component<T: Any + Send + Sync>(value: T) -> Self {
        Bean::Component(Arc::new(value))
    }

    pub fn kind(&self) -> BeanKind {
        match self {
            Bean::Component(_) => BeanKind::Component,
            Bean::FactoryPostProcessor(_) => BeanKind::FactoryPostProcessor,
            Bean::RegistryPostProcessor(_) => BeanKind::RegistryPostProcessor,
            Bean::PostProcessor(_) => BeanKind::PostProcessor,
            Bean::Listener(_) => BeanKind::Listener,
        }
    }

    pub fn is_post_processor(&self) -> bool {
        matches!(self, Bean::PostProcessor(_))
    }

    /// 将普通组件向下转型为具体类型
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Bean::Component(any) => Arc::clone(any).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// 是否为同一个实例
    pub fn same_instance(&self, other: &Bean) -> bool {
        self.data_ptr() == other.data_ptr()
    }

    fn data_ptr(&self) -> *const () {
        match self {
            Bean::Component(b) => Arc::as_ptr(b) as *const (),
            Bean::FactoryPostProcessor(b) => Arc::as_ptr(b) as *const (),
            Bean::RegistryPostProcessor(b) => Arc::as_ptr(b) as *const (),
            Bean::PostProcessor(b) => Arc::as_ptr(b) as *const (),
            Bean::Listener(b) => Arc::as_ptr(b) as *const (),
        }
    }
}

impl fmt::Debug for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bean::{}", self.kind())
    }
}

/// Bean 的种类，在定义上声明，用于不实例化的类型匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BeanKind {
    #[default]
    Component,
    FactoryPostProcessor,
    RegistryPostProcessor,
    PostProcessor,
    Listener,
}

impl fmt::Display for BeanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BeanKind::Component => "Component",
            BeanKind::FactoryPostProcessor => "BeanFactoryPostProcessor",
            BeanKind::RegistryPostProcessor => "BeanDefinitionRegistryPostProcessor",
            BeanKind::PostProcessor => "BeanPostProcessor",
            BeanKind::Listener => "ApplicationListener",
        };
        f.write_str(name)
    }
}

/// 按名称查询 Bean 时使用的能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// 工厂后置处理器，注册表后置处理器也满足
    FactoryPostProcessor,
    RegistryPostProcessor,
    PostProcessor,
    ApplicationListener,
    PriorityOrdered,
    /// PriorityOrdered 也满足
    Ordered,
}

/// Bean 的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BeanRole {
    /// 用户定义的 Bean
    #[default]
    Application,
    /// 辅助性的 Bean，通常是较大配置的一部分
    Support,
    /// 框架内部的基础设施 Bean
    Infrastructure,
}

/// Bean 定义的来源
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefinitionSource {
    /// 通过 API 手动注册
    #[default]
    Manual,
    /// 配置类
    Configuration,
    /// 扫描到的组件
    Component,
    /// 由配置类声明的 Bean
    BeanMethod { factory_bean: String },
    /// 通过 import 引入
    Import,
}

/// 创建 Bean 时传给供应函数的上下文
pub struct CreationContext<'a> {
    name: &'a str,
    definition: &'a BeanDefinition,
    bean_factory: &'a dyn ConfigurableListableBeanFactory,
}

impl<'a> CreationContext<'a> {
    pub(crate) fn new(
        name: &'a str,
        definition: &'a BeanDefinition,
        bean_factory: &'a dyn ConfigurableListableBeanFactory,
    ) -> Self {
        Self {
            name,
            definition,
            bean_factory,
        }
    }

    pub fn bean_name(&self) -> &str {
        self.name
    }

    /// 合并后的 Bean 定义
    pub fn definition(&self) -> &BeanDefinition {
        self.definition
    }

    pub fn bean_factory(&self) -> &dyn ConfigurableListableBeanFactory {
        self.bean_factory
    }

    pub fn property(&self, key: &str) -> Option<&ConfigValue> {
        self.definition.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(ConfigValue::as_str)
    }

    /// 获取依赖的 Bean
    pub fn get_bean(&self, name: &str) -> ContainerResult<Bean> {
        self.bean_factory.get_bean(name)
    }
}

/// Bean 供应函数
pub type BeanSupplier = Arc<dyn Fn(&CreationContext<'_>) -> ContainerResult<Bean> + Send + Sync>;

/// Bean 定义 - 描述如何创建和管理一个具名的 Bean
///
/// 在第一次实例化之前都可以修改，归注册表所有。
#[derive(Clone, Default)]
pub struct BeanDefinition {
    /// 目标类型名称（用于日志和 import 命名）
    pub type_name: String,

    /// 供应函数；子定义可以留空并从父定义继承
    pub supplier: Option<BeanSupplier>,

    /// Bean 的种类
    pub kind: BeanKind,

    /// 优先级标记
    pub precedence: Precedence,

    /// 作用域
    pub scope: Scope,

    /// 是否延迟初始化（仅对单例有效）
    pub lazy: bool,

    pub primary: bool,

    pub role: BeanRole,

    /// 抽象定义只作为模板，不会被实例化
    pub is_abstract: bool,

    /// 父定义名称
    pub parent: Option<String>,

    pub source: DefinitionSource,

    /// 附加在定义上的标记，例如配置类的 full/lite
    pub attributes: BTreeMap<String, ConfigValue>,

    /// 属性值，可以包含 `${...}` 占位符
    pub properties: BTreeMap<String, ConfigValue>,

    /// 创建前需要先创建的 Bean（depends-on）
    pub dependencies: Vec<String>,

    /// 配置类声明的 Bean
    pub declared: Vec<(String, BeanDefinition)>,

    /// 配置类引入的定义
    pub imports: Vec<BeanDefinition>,
}

impl BeanDefinition {
    /// 用任意供应函数创建定义
    pub fn new<F>(kind: BeanKind, type_name: impl Into<String>, supplier: F) -> Self
    where
        F: Fn(&CreationContext<'_>) -> ContainerResult<Bean> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            supplier: Some(Arc::new(supplier)),
            kind,
            ..Self::default()
        }
    }

    /// 普通组件
    pub fn component<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&CreationContext<'_>) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(BeanKind::Component, std::any::type_name::<T>(), move |ctx| {
            Ok(Bean::component(factory(ctx)?))
        })
    }

    /// Bean 定义注册表后置处理器
    pub fn registry_post_processor<T, F>(factory: F) -> Self
    where
        T: BeanDefinitionRegistryPostProcessor + 'static,
        F: Fn(&CreationContext<'_>) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(
            BeanKind::RegistryPostProcessor,
            std::any::type_name::<T>(),
            move |ctx| Ok(Bean::RegistryPostProcessor(Arc::new(factory(ctx)?))),
        )
    }

    /// Bean 工厂后置处理器
    pub fn factory_post_processor<T, F>(factory: F) -> Self
    where
        T: BeanFactoryPostProcessor + 'static,
        F: Fn(&CreationContext<'_>) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(
            BeanKind::FactoryPostProcessor,
            std::any::type_name::<T>(),
            move |ctx| Ok(Bean::FactoryPostProcessor(Arc::new(factory(ctx)?))),
        )
    }

    /// Bean 后置处理器
    pub fn post_processor<T, F>(factory: F) -> Self
    where
        T: BeanPostProcessor + 'static,
        F: Fn(&CreationContext<'_>) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(
            BeanKind::PostProcessor,
            std::any::type_name::<T>(),
            move |ctx| Ok(Bean::PostProcessor(Arc::new(factory(ctx)?))),
        )
    }

    /// 事件监听器
    pub fn listener<T, F>(factory: F) -> Self
    where
        T: ApplicationListener + 'static,
        F: Fn(&CreationContext<'_>) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(BeanKind::Listener, std::any::type_name::<T>(), move |ctx| {
            Ok(Bean::Listener(Arc::new(factory(ctx)?)))
        })
    }

    /// 没有供应函数的子定义，从父定义继承类型
    pub fn child(parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_role(mut self, role: BeanRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// 标记为 PriorityOrdered
    pub fn priority_ordered(self, order: i32) -> Self {
        self.with_precedence(Precedence::PriorityOrdered(order))
    }

    /// 标记为 Ordered
    pub fn ordered(self, order: i32) -> Self {
        self.with_precedence(Precedence::Ordered(order))
    }

    pub fn with_source(mut self, source: DefinitionSource) -> Self {
        self.source = source;
        self
    }

    /// 标记为配置类
    pub fn configuration(self) -> Self {
        self.with_source(DefinitionSource::Configuration)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// 在配置类上声明一个 Bean
    pub fn declare_bean(mut self, name: impl Into<String>, definition: BeanDefinition) -> Self {
        self.declared.push((name.into(), definition));
        self
    }

    /// 在配置类上引入一个定义，注册时以类型名称命名
    pub fn import(mut self, definition: BeanDefinition) -> Self {
        self.imports.push(definition);
        self
    }

    pub fn get_attribute(&self, key: &str) -> Option<&ConfigValue> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// 不实例化地判断定义是否满足指定能力
    pub fn matches(&self, capability: Capability) -> bool {
        match capability {
            Capability::FactoryPostProcessor => matches!(
                self.kind,
                BeanKind::FactoryPostProcessor | BeanKind::RegistryPostProcessor
            ),
            Capability::RegistryPostProcessor => self.kind == BeanKind::RegistryPostProcessor,
            Capability::PostProcessor => self.kind == BeanKind::PostProcessor,
            Capability::ApplicationListener => self.kind == BeanKind::Listener,
            Capability::PriorityOrdered => self.precedence.is_priority_ordered(),
            Capability::Ordered => self.precedence.is_ordered(),
        }
    }

    /// 与父定义合并，子定义的值优先
    ///
    /// 子定义没有供应函数时，类型相关的信息（供应函数、种类、优先级、类型名称）整体继承自父定义。
    pub fn merge_with_parent(&self, parent: &BeanDefinition) -> BeanDefinition {
        let mut merged = self.clone();
        if self.supplier.is_none() {
            merged.supplier = parent.supplier.clone();
            merged.kind = parent.kind;
            merged.precedence = parent.precedence;
            merged.type_name = parent.type_name.clone();
        }

        let mut attributes = parent.attributes.clone();
        attributes.extend(self.attributes.clone());
        merged.attributes = attributes;

        let mut properties = parent.properties.clone();
        properties.extend(self.properties.clone());
        merged.properties = properties;

        merged
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("precedence", &self.precedence)
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("role", &self.role)
            .field("abstract", &self.is_abstract)
            .field("parent", &self.parent)
            .field("source", &self.source)
            .field("attributes", &self.attributes)
            .field("properties", &self.properties)
            .field("has_supplier", &self.supplier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_matching() {
        let def = BeanDefinition::component(|_| Ok(42u32)).priority_ordered(0);
        assert!(def.matches(Capability::PriorityOrdered));
        assert!(def.matches(Capability::Ordered));
        assert!(!def.matches(Capability::FactoryPostProcessor));

        let registry_kind = BeanDefinition {
            kind: BeanKind::RegistryPostProcessor,
            ..BeanDefinition::default()
        };
        assert!(registry_kind.matches(Capability::FactoryPostProcessor));
        assert!(registry_kind.matches(Capability::RegistryPostProcessor));
        assert!(!registry_kind.matches(Capability::Ordered));
    }

    #[test]
    fn test_merge_inherits_type_and_overlays_values() {
        let parent = BeanDefinition::component(|_| Ok(String::from("x")))
            .ordered(3)
            .with_attribute("origin", "parent")
            .with_property("url", "jdbc:parent")
            .with_property("pool", 4i64)
            .with_abstract(true);
        let child = BeanDefinition::child("template").with_property("url", "jdbc:child");

        let merged = child.merge_with_parent(&parent);
        assert!(merged.supplier.is_some());
        assert_eq!(merged.kind, BeanKind::Component);
        assert_eq!(merged.precedence, Precedence::Ordered(3));
        assert!(!merged.is_abstract);
        assert_eq!(merged.properties["url"].as_str(), Some("jdbc:child"));
        assert_eq!(merged.properties["pool"].as_i64(), Some(4));
        assert_eq!(merged.attributes["origin"].as_str(), Some("parent"));
    }

    #[test]
    fn test_downcast_component() {
        let bean = Bean::component(String::from("hello"));
        assert_eq!(bean.kind(), BeanKind::Component);
        assert_eq!(bean.downcast::<String>().as_deref().map(String::as_str), Some("hello"));
        assert!(bean.downcast::<u32>().is_none());
        assert!(bean.same_instance(&bean.clone()));
    }
}
