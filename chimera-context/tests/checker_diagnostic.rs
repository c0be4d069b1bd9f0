mod common;

use std::fmt;
use std::sync::Arc;

use chimera_context::prelude::*;
use common::*;
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::Layer;

/// 收集所有 INFO 事件消息的 Layer
#[derive(Clone, Default)]
struct CapturedMessages(Arc<Mutex<Vec<String>>>);

struct MessageVisitor<'a>(&'a mut Option<String>);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for CapturedMessages {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
        if *event.metadata().level() != tracing::Level::INFO {
            return;
        }
        let mut message = None;
        event.record(&mut MessageVisitor(&mut message));
        if let Some(message) = message {
            self.0.lock().push(message);
        }
    }
}

impl CapturedMessages {
    fn not_eligible(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|m| m.contains("is not eligible for getting processed by all BeanPostProcessors"))
            .cloned()
            .collect()
    }
}

struct Helper;

#[test]
fn bean_created_by_priority_interceptor_is_reported_once() {
    let captured = CapturedMessages::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());

    tracing::subscriber::with_default(subscriber, || {
        let journal = journal();
        let context = ApplicationContext::new();
        context
            .register_bean_definition("helper", BeanDefinition::component(|_| Ok(Helper)))
            .unwrap();

        let interceptor_journal = Arc::clone(&journal);
        context
            .register_bean_definition(
                "eager",
                BeanDefinition::post_processor(move |ctx| {
                    // 拦截器链尚未完整时就创建了普通 Bean
                    ctx.get_bean("helper")?;
                    Ok(RecordingInterceptor {
                        label: "eager".into(),
                        journal: Arc::clone(&interceptor_journal),
                    })
                })
                .priority_ordered(0),
            )
            .unwrap();
        context
            .register_bean_definition("ordered", interceptor_definition("ordered", &journal).ordered(0))
            .unwrap();
        context
            .register_bean_definition("service", BeanDefinition::component(|_| Ok(1u64)))
            .unwrap();

        context.refresh().unwrap();
    });

    let reported = captured.not_eligible();
    assert_eq!(reported.len(), 1, "reported: {:?}", reported);
    assert!(reported[0].contains("'helper'"));
}

#[test]
fn infrastructure_beans_are_not_reported() {
    let captured = CapturedMessages::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());

    tracing::subscriber::with_default(subscriber, || {
        let context = ApplicationContext::new();
        context
            .register_bean_definition(
                "support",
                BeanDefinition::component(|_| Ok(Helper)).with_role(BeanRole::Infrastructure),
            )
            .unwrap();
        context
            .register_bean_definition(
                "eager",
                BeanDefinition::post_processor(|ctx| {
                    ctx.get_bean("support")?;
                    Ok(RecordingInterceptor {
                        label: "eager".into(),
                        journal: journal(),
                    })
                })
                .priority_ordered(0),
            )
            .unwrap();

        context.refresh().unwrap();
    });

    assert!(captured.not_eligible().is_empty());
}
