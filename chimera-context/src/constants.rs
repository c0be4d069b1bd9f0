//! 容器内部使用的 Bean 名称和定义属性键
//!
//! 内部处理器以固定名称注册，避免与用户 Bean 冲突，也便于测试断言。

/// 配置类后置处理器
pub const CONFIGURATION_CLASS_POST_PROCESSOR_BEAN_NAME: &str =
    "chimera.internalConfigurationClassPostProcessor";

/// 占位符解析器
pub const PROPERTY_PLACEHOLDER_CONFIGURER_BEAN_NAME: &str =
    "chimera.internalPropertyPlaceholderConfigurer";

/// Environment 单例
pub const ENVIRONMENT_BEAN_NAME: &str = "environment";

/// 定义属性：配置类模式（`full` / `lite`）
pub const CONFIGURATION_CLASS_ATTRIBUTE: &str = "configurationClass";

pub const CONFIGURATION_CLASS_FULL: &str = "full";

pub const CONFIGURATION_CLASS_LITE: &str = "lite";

/// 定义属性：配置类已被增强
pub const ENHANCED_ATTRIBUTE: &str = "enhanced";
