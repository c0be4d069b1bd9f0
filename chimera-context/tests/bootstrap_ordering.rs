mod common;

use chimera_context::prelude::*;
use chimera_context::{invoke_bean_factory_post_processors, DefaultListableBeanFactory};
use common::*;

#[test]
fn supplied_registry_hooks_run_before_registry_sourced_ones() {
    let journal = journal();
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "sourced",
            registry_definition("sourced", &journal, vec![]).priority_ordered(HIGHEST_PRECEDENCE),
        )
        .unwrap();

    let hooks = vec![
        FactoryPostProcessorHook::factory(RecordingFactoryProcessor::new("plain", &journal)),
        FactoryPostProcessorHook::registry(RecordingRegistryProcessor::new("supplied", &journal)),
    ];
    invoke_bean_factory_post_processors(&factory, &hooks).unwrap();

    assert_eq!(
        entries(&journal),
        [
            "registry:supplied",
            "registry:sourced",
            "factory:supplied",
            "factory:sourced",
            "factory:plain",
        ]
    );
}

#[test]
fn equal_order_keeps_registration_order() {
    let journal = journal();
    let factory = DefaultListableBeanFactory::new();
    for (name, definition) in [
        ("z", registry_definition("z", &journal, vec![]).ordered(5)),
        ("y", registry_definition("y", &journal, vec![]).ordered(5)),
        ("x", registry_definition("x", &journal, vec![]).ordered(-5)),
    ] {
        factory.register_bean_definition(name, definition).unwrap();
    }

    invoke_bean_factory_post_processors(&factory, &[]).unwrap();

    assert_eq!(
        entries(&journal),
        ["registry:x", "registry:z", "registry:y", "factory:x", "factory:z", "factory:y"]
    );
}

#[test]
fn priority_tier_registrations_are_picked_up_by_later_tiers() {
    let journal = journal();
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition(
            "first",
            registry_definition(
                "first",
                &journal,
                vec![("second", registry_definition("second", &journal, vec![]).ordered(0))],
            )
            .priority_ordered(0),
        )
        .unwrap();

    invoke_bean_factory_post_processors(&factory, &[]).unwrap();

    assert_eq!(
        entries(&journal),
        ["registry:first", "registry:second", "factory:first", "factory:second"]
    );
}

#[test]
fn transitive_registrations_reach_a_fixed_point() {
    let journal = journal();
    let factory = DefaultListableBeanFactory::new();

    // 最后一个带有 Ordered 标记，但它出现时 Ordered 批次已经结束
    let c = registry_definition("c", &journal, vec![]).ordered(1);
    let b = registry_definition("b", &journal, vec![("c", c)]);
    let a = registry_definition("a", &journal, vec![("b", b)]);
    factory.register_bean_definition("a", a).unwrap();

    invoke_bean_factory_post_processors(&factory, &[]).unwrap();

    assert_eq!(
        entries(&journal),
        [
            "registry:a",
            "registry:b",
            "registry:c",
            "factory:a",
            "factory:b",
            "factory:c",
        ]
    );
}

#[test]
fn processed_registry_hooks_are_not_invoked_again() {
    let journal = journal();
    let factory = DefaultListableBeanFactory::new();
    // PriorityOrdered 同时满足 Ordered，不能在第二批再执行一次
    factory
        .register_bean_definition("both", registry_definition("both", &journal, vec![]).priority_ordered(1))
        .unwrap();
    factory
        .register_bean_definition("later", registry_definition("later", &journal, vec![]))
        .unwrap();

    invoke_bean_factory_post_processors(&factory, &[]).unwrap();

    let entries = entries(&journal);
    for label in ["both", "later"] {
        assert_eq!(
            entries.iter().filter(|e| **e == format!("registry:{}", label)).count(),
            1
        );
        assert_eq!(
            entries.iter().filter(|e| **e == format!("factory:{}", label)).count(),
            1
        );
    }
}

#[test]
fn factory_only_hooks_run_after_all_registry_hooks() {
    let journal = journal();
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition("early", factory_definition("early", &journal).priority_ordered(HIGHEST_PRECEDENCE))
        .unwrap();
    factory
        .register_bean_definition("registrar", registry_definition("registrar", &journal, vec![]))
        .unwrap();

    invoke_bean_factory_post_processors(&factory, &[]).unwrap();

    assert_eq!(
        entries(&journal),
        ["registry:registrar", "factory:registrar", "factory:early"]
    );
}

#[test]
fn registry_callback_failure_aborts_bootstrap() {
    struct Failing;

    impl BeanFactoryPostProcessor for Failing {
        fn post_process_bean_factory(
            &self,
            _bean_factory: &dyn ConfigurableListableBeanFactory,
        ) -> ContainerResult<()> {
            Ok(())
        }
    }

    impl BeanDefinitionRegistryPostProcessor for Failing {
        fn post_process_bean_definition_registry(
            &self,
            _registry: &dyn BeanDefinitionRegistry,
        ) -> ContainerResult<()> {
            Err(anyhow!("registry is malformed").into())
        }
    }

    let journal = journal();
    let factory = DefaultListableBeanFactory::new();
    factory
        .register_bean_definition("failing", BeanDefinition::registry_post_processor(|_| Ok(Failing)).priority_ordered(0))
        .unwrap();
    factory
        .register_bean_definition("never", factory_definition("never", &journal))
        .unwrap();

    let err = invoke_bean_factory_post_processors(&factory, &[]).unwrap_err();
    assert!(err.to_string().contains("registry is malformed"));
    assert!(entries(&journal).is_empty());
}
