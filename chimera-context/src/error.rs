//! 统一的错误类型
//!
//! 容器内部使用 `ContainerError`，应用启动器使用 `ApplicationError`。
//! 后置处理器可以直接返回 `anyhow::Error`，`?` 会把它转换为 `ContainerError::Other`，
//! 启动流程不会对它做任何包装或恢复。

use thiserror::Error;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("No bean named '{0}' is defined")]
    BeanNotFound(String),

    #[error("Bean definition '{0}' already exists")]
    BeanAlreadyExists(String),

    #[error("Error creating bean '{name}': {reason}")]
    BeanCreationFailed { name: String, reason: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Bean '{name}' is expected to be of kind '{expected}' but was '{found}'")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Cannot {0}: configuration is frozen")]
    ConfigurationFrozen(&'static str),

    #[error("Could not resolve placeholder '{placeholder}' in bean '{bean}'")]
    UnresolvablePlaceholder { placeholder: String, bean: String },

    #[error("Application context has already been refreshed")]
    AlreadyRefreshed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContainerError {
    pub fn creation_failed(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::BeanCreationFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 应用启动错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;

/// 便捷别名，供业务代码使用
pub use anyhow::Result;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_converts_to_other() {
        fn hook() -> ContainerResult<()> {
            Err(anyhow::anyhow!("malformed configuration"))?;
            Ok(())
        }

        let err = hook().unwrap_err();
        assert!(matches!(err, ContainerError::Other(_)));
        assert_eq!(err.to_string(), "malformed configuration");
    }

    #[test]
    fn test_container_error_into_application_error() {
        let err: ApplicationError = ContainerError::BeanNotFound("userService".into()).into();
        assert_eq!(err.to_string(), "No bean named 'userService' is defined");
    }
}
