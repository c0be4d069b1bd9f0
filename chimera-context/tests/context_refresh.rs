mod common;

use std::sync::Arc;

use chimera_context::prelude::*;
use chimera_context::{
    submit_component, ConfigurationClassMode, ContextState, ENHANCED_ATTRIBUTE,
};
use common::*;
use parking_lot::Mutex;

struct Clock {
    zone: String,
}

impl Component for Clock {
    const BEAN_NAME: &'static str = "clock";

    fn create(ctx: &CreationContext<'_>) -> ContainerResult<Self> {
        Ok(Clock {
            zone: ctx.property_str("zone").unwrap_or("UTC").to_string(),
        })
    }

    fn customize(definition: BeanDefinition) -> BeanDefinition {
        definition.with_property("zone", "${app.zone:UTC}")
    }
}

submit_component!(Clock);
submit_component!(
    name: "banner",
    definition: || BeanDefinition::component(|_| Ok(String::from("chimera")))
);

#[test]
fn scanned_components_are_registered_and_resolved() {
    let context = ApplicationContext::builder()
        .add_property_source(Box::new(
            MapPropertySource::new("test").with_property("app.zone", "Asia/Shanghai"),
        ))
        .scan_components()
        .unwrap()
        .build();
    context.refresh().unwrap();

    assert_eq!(context.get_component::<Clock>("clock").unwrap().zone, "Asia/Shanghai");
    assert_eq!(*context.get_component::<String>("banner").unwrap(), "chimera");
}

#[test]
fn configuration_class_declares_and_imports_beans() {
    let nested = BeanDefinition::component(|_| Ok(()))
        .configuration()
        .declare_bean("nestedBean", BeanDefinition::component(|_| Ok(7i32)));
    let app_config = BeanDefinition::component(|_| Ok(()))
        .configuration()
        .declare_bean("repository", BeanDefinition::component(|_| Ok(vec![1u8, 2, 3])))
        .import(nested);

    let context = ApplicationContext::builder()
        .register_bean_definition("appConfig", app_config)
        .unwrap()
        .build();
    context.refresh().unwrap();

    let factory = context.bean_factory();
    assert_eq!(
        ConfigurationClassMode::of(&factory.get_bean_definition("appConfig").unwrap()),
        Some(ConfigurationClassMode::Full)
    );
    assert_eq!(
        factory
            .get_bean_definition("appConfig")
            .unwrap()
            .get_attribute(ENHANCED_ATTRIBUTE)
            .and_then(ConfigValue::as_bool),
        Some(true)
    );
    assert_eq!(*context.get_component::<Vec<u8>>("repository").unwrap(), vec![1, 2, 3]);
    assert_eq!(*context.get_component::<i32>("nestedBean").unwrap(), 7);
}

#[test]
fn full_bootstrap_order_through_the_context() {
    let journal = journal();
    let context = ApplicationContext::new();

    // 注册表处理器注册的拦截器与普通 Bean 都会在同一次刷新中生效
    let registrar = registry_definition(
        "registrar",
        &journal,
        vec![
            ("tracer", interceptor_definition("tracer", &journal)),
            ("late", factory_definition("late", &journal).ordered(1)),
            ("service", BeanDefinition::component(|_| Ok(5u16))),
        ],
    );
    context.register_bean_definition("registrar", registrar).unwrap();
    context
        .register_bean_definition("tuner", factory_definition("tuner", &journal).priority_ordered(0))
        .unwrap();
    context.add_bean_factory_post_processor(FactoryPostProcessorHook::factory(
        RecordingFactoryProcessor::new("supplied", &journal),
    ));

    context.refresh().unwrap();

    assert_eq!(
        entries(&journal),
        [
            "registry:registrar",
            "factory:registrar",
            "factory:supplied",
            "factory:tuner",
            "factory:late",
            "tracer:service",
        ]
    );
    assert_eq!(context.state(), ContextState::Active);
}

#[test]
fn later_factory_hook_tiers_see_resolved_placeholders() {
    let journal = journal();
    let recorder = Arc::clone(&journal);
    let greeter = BeanDefinition::factory_post_processor(move |ctx| {
        recorder
            .lock()
            .push(ctx.property_str("greeting").unwrap_or_default().to_string());
        Ok(RecordingFactoryProcessor::new("greeter", &recorder))
    })
    .with_property("greeting", "${greeting}")
    .ordered(0);

    let context = ApplicationContext::builder()
        .add_property_source(Box::new(
            MapPropertySource::new("test").with_property("greeting", "hello"),
        ))
        .register_bean_definition("greeter", greeter)
        .unwrap()
        .build();
    context.refresh().unwrap();

    assert_eq!(entries(&journal), ["hello", "factory:greeter"]);
}

#[test]
fn failed_refresh_destroys_singletons() {
    let context = ApplicationContext::new();
    context
        .register_bean_definition("ok", BeanDefinition::component(|_| Ok(1u8)))
        .unwrap();
    context
        .register_bean_definition(
            "broken",
            BeanDefinition::component(|_| -> ContainerResult<u8> {
                Err(anyhow!("disk not mounted").into())
            }),
        )
        .unwrap();

    let err = context.refresh().unwrap_err();
    assert!(err.to_string().contains("broken"));
    assert_eq!(context.state(), ContextState::Failed);
    assert!(!context.bean_factory().contains_singleton("ok"));
}

#[test]
fn close_publishes_event_and_runs_hooks() {
    struct Names(Arc<Mutex<Vec<String>>>);

    impl ApplicationListener for Names {
        fn on_event(&self, event: Arc<dyn Event>) {
            self.0.lock().push(event.event_name().to_string());
        }
    }

    let events = Arc::new(Mutex::new(Vec::new()));
    let hook_ran = Arc::new(Mutex::new(false));
    let context = ApplicationContext::new();
    context.add_application_listener(Arc::new(Names(Arc::clone(&events))));
    let flag = Arc::clone(&hook_ran);
    context.register_shutdown_hook(move || {
        *flag.lock() = true;
        Ok(())
    });

    context.refresh().unwrap();
    context.close().unwrap();
    // 第二次关闭什么也不做
    context.close().unwrap();

    assert_eq!(*events.lock(), ["ContextRefreshedEvent", "ContextClosedEvent"]);
    assert!(*hook_ran.lock());
    assert_eq!(context.state(), ContextState::Closed);
}
