//! 应用事件 - 类似 Spring 的 ApplicationEvent / ApplicationListener
//!
//! 容器在刷新完成和关闭时发布事件；单例监听器 Bean 由
//! [`ApplicationListenerDetector`](crate::listener_detector::ApplicationListenerDetector)
//! 在创建后自动注册到多播器上。

use std::any::Any;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

/// 事件 trait - 所有事件都必须实现此 trait
pub trait Event: Any + Send + Sync {
    /// 获取事件名称
    fn event_name(&self) -> &str;

    /// 获取事件时间戳
    fn timestamp(&self) -> SystemTime;

    /// 转换为 Any 引用，用于类型转换
    fn as_any(&self) -> &dyn Any;
}

/// 上下文刷新完成事件
///
/// 所有非延迟单例创建完成后发布
#[derive(Debug, Clone)]
pub struct ContextRefreshedEvent {
    /// 上下文中的 Bean 定义数量
    pub bean_definition_count: usize,
    pub timestamp: SystemTime,
}

impl ContextRefreshedEvent {
    pub fn new(bean_definition_count: usize) -> Self {
        Self {
            bean_definition_count,
            timestamp: SystemTime::now(),
        }
    }
}

impl Event for ContextRefreshedEvent {
    fn event_name(&self) -> &str {
        "ContextRefreshedEvent"
    }

    fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 上下文关闭事件
#[derive(Debug, Clone)]
pub struct ContextClosedEvent {
    pub timestamp: SystemTime,
}

impl ContextClosedEvent {
    pub fn new() -> Self {
        Self {
            timestamp: SystemTime::now(),
        }
    }
}

impl Default for ContextClosedEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl Event for ContextClosedEvent {
    fn event_name(&self) -> &str {
        "ContextClosedEvent"
    }

    fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 事件监听器 trait
///
/// 监听器既可以直接添加到多播器上，也可以声明为 `BeanKind::Listener` 的 Bean
pub trait ApplicationListener: Send + Sync {
    /// 处理事件（同步）
    fn on_event(&self, event: Arc<dyn Event>);

    /// 获取监听器名称（用于日志）
    fn listener_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 是否支持该事件类型（默认支持所有事件）
    fn supports_event(&self, _event_name: &str) -> bool {
        true
    }
}

/// 错误处理器类型
///
/// 用于处理监听器执行过程中的 panic
pub type ErrorHandler =
    Arc<dyn Fn(&dyn ApplicationListener, Arc<dyn Event>, &anyhow::Error) + Send + Sync>;

/// 事件多播器 trait
///
/// 负责将事件传播到所有注册的监听器
pub trait ApplicationEventMulticaster: Send + Sync {
    fn add_listener(&self, listener: Arc<dyn ApplicationListener>);

    /// 按名称移除监听器
    fn remove_listener(&self, listener_name: &str);

    fn remove_all_listeners(&self);

    /// 按添加顺序同步调用支持该事件的监听器
    fn multicast_event(&self, event: Arc<dyn Event>);

    fn listener_count(&self) -> usize;
}

/// 简单事件多播器实现（同步）
pub struct SimpleApplicationEventMulticaster {
    listeners: RwLock<Vec<Arc<dyn ApplicationListener>>>,
    error_handler: RwLock<Option<ErrorHandler>>,
}

impl SimpleApplicationEventMulticaster {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            error_handler: RwLock::new(None),
        }
    }

    /// 设置错误处理器，设置后监听器的 panic 不会再传播给发布者
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&dyn ApplicationListener, Arc<dyn Event>, &anyhow::Error) + Send + Sync + 'static,
    {
        *self.error_handler.write() = Some(Arc::new(handler));
    }

    pub fn remove_error_handler(&self) {
        *self.error_handler.write() = None;
    }

    fn invoke_listener(
        &self,
        listener: &Arc<dyn ApplicationListener>,
        event: Arc<dyn Event>,
        error_handler: Option<&ErrorHandler>,
    ) {
        // 使用 catch_unwind 捕获 panic
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            listener.on_event(Arc::clone(&event));
        })) {
            let err = anyhow::anyhow!("Listener panicked: {:?}", e);
            match error_handler {
                Some(handler) => handler(listener.as_ref(), event, &err),
                None => {
                    tracing::error!(
                        "Listener '{}' panicked while handling event '{}'",
                        listener.listener_name(),
                        event.event_name()
                    );
                    std::panic::resume_unwind(e);
                }
            }
        }
    }
}

impl Default for SimpleApplicationEventMulticaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationEventMulticaster for SimpleApplicationEventMulticaster {
    fn add_listener(&self, listener: Arc<dyn ApplicationListener>) {
        tracing::debug!("Added event listener: {}", listener.listener_name());
        self.listeners.write().push(listener);
    }

    fn remove_listener(&self, listener_name: &str) {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.listener_name() != listener_name);
        if listeners.len() != before {
            tracing::debug!("Removed event listener: {}", listener_name);
        }
    }

    fn remove_all_listeners(&self) {
        self.listeners.write().clear();
        tracing::debug!("Removed all event listeners");
    }

    fn multicast_event(&self, event: Arc<dyn Event>) {
        let event_name = event.event_name().to_string();

        // 克隆监听器列表，避免回调期间持锁
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .filter(|l| l.supports_event(&event_name))
            .map(Arc::clone)
            .collect();

        tracing::debug!(
            "Multicasting event: {} to {} listener(s)",
            event_name,
            listeners.len()
        );

        let error_handler = self.error_handler.read().clone();
        for listener in &listeners {
            self.invoke_listener(listener, Arc::clone(&event), error_handler.as_ref());
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        only: Option<&'static str>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ApplicationListener for Recorder {
        fn on_event(&self, event: Arc<dyn Event>) {
            self.seen
                .lock()
                .push(format!("{}:{}", self.name, event.event_name()));
        }

        fn listener_name(&self) -> &str {
            self.name
        }

        fn supports_event(&self, event_name: &str) -> bool {
            self.only.map_or(true, |only| only == event_name)
        }
    }

    struct Panicking;

    impl ApplicationListener for Panicking {
        fn on_event(&self, _event: Arc<dyn Event>) {
            panic!("listener failure");
        }
    }

    #[test]
    fn test_multicast_in_registration_order_with_filter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let multicaster = SimpleApplicationEventMulticaster::new();
        multicaster.add_listener(Arc::new(Recorder {
            name: "all",
            only: None,
            seen: Arc::clone(&seen),
        }));
        multicaster.add_listener(Arc::new(Recorder {
            name: "closedOnly",
            only: Some("ContextClosedEvent"),
            seen: Arc::clone(&seen),
        }));

        multicaster.multicast_event(Arc::new(ContextRefreshedEvent::new(3)));
        multicaster.multicast_event(Arc::new(ContextClosedEvent::new()));

        assert_eq!(
            *seen.lock(),
            [
                "all:ContextRefreshedEvent",
                "all:ContextClosedEvent",
                "closedOnly:ContextClosedEvent"
            ]
        );
    }

    #[test]
    fn test_remove_listener() {
        let multicaster = SimpleApplicationEventMulticaster::new();
        multicaster.add_listener(Arc::new(Recorder {
            name: "a",
            only: None,
            seen: Arc::default(),
        }));
        assert_eq!(multicaster.listener_count(), 1);
        multicaster.remove_listener("a");
        assert_eq!(multicaster.listener_count(), 0);
    }

    #[test]
    fn test_error_handler_catches_panic() {
        let handled = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&handled);
        let multicaster = SimpleApplicationEventMulticaster::new();
        multicaster.set_error_handler(move |_, _, _| *counter.lock() += 1);
        multicaster.add_listener(Arc::new(Panicking));

        multicaster.multicast_event(Arc::new(ContextClosedEvent::new()));
        assert_eq!(*handled.lock(), 1);
    }
}
