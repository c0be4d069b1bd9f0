//! 后置处理器的发现、排序与调用
//!
//! 容器刷新时按顺序执行两个阶段：
//!
//! 1. [`invoke_bean_factory_post_processors`] - 调用注册表后置处理器和工厂后置处理器
//! 2. [`register_bean_post_processors`] - 把 Bean 后置处理器按优先级追加到拦截器链
//!
//! 每一批都按 PriorityOrdered、Ordered、其余 的顺序处理。批次由定义上的优先级标记决定，
//! 因此判断批次时不会实例化任何 Bean。注册表后置处理器可以注册新的注册表后置处理器，
//! 所以每一批都重新查询注册表，最后一批循环到不再发现新名称为止。

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    bean::{Bean, BeanKind, Capability},
    bean_factory::{
        BeanDefinitionRegistry, BeanFactory, ConfigurableBeanFactory,
        ConfigurableListableBeanFactory, ListableBeanFactory,
    },
    error::{ContainerError, ContainerResult},
    event::ApplicationEventMulticaster,
    lifecycle::{
        BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor, BeanPostProcessor,
        FactoryPostProcessorHook,
    },
    listener_detector::ApplicationListenerDetector,
    ordering::{sort_post_processors, OrderedHook, Precedence},
    post_processor_checker::BeanPostProcessorChecker,
};

type RegistryHook = OrderedHook<Arc<dyn BeanDefinitionRegistryPostProcessor>>;
type InterceptorHook = OrderedHook<Arc<dyn BeanPostProcessor>>;

/// 调用所有 Bean 工厂后置处理器
///
/// `external_hooks` 是通过 API 直接提供的处理器，按提供顺序处理：
/// 注册表处理器立刻执行注册表回调，其余的留到最后执行工厂回调。
///
/// 任何回调或实例化错误都会原样返回并中止启动。
pub fn invoke_bean_factory_post_processors(
    bean_factory: &dyn ConfigurableListableBeanFactory,
    external_hooks: &[FactoryPostProcessorHook],
) -> ContainerResult<()> {
    let mut processed_beans = HashSet::new();

    match bean_factory.as_registry() {
        Some(registry) => {
            let mut regular_post_processors: Vec<Arc<dyn BeanFactoryPostProcessor>> = Vec::new();
            let mut registry_processors: Vec<Arc<dyn BeanDefinitionRegistryPostProcessor>> =
                Vec::new();

            for hook in external_hooks {
                match hook {
                    FactoryPostProcessorHook::Registry(processor) => {
                        tracing::debug!(
                            "Invoking registry callback of supplied post-processor: {}",
                            processor.name()
                        );
                        processor.post_process_bean_definition_registry(registry)?;
                        registry_processors.push(Arc::clone(processor));
                    }
                    FactoryPostProcessorHook::Factory(processor) => {
                        regular_post_processors.push(Arc::clone(processor));
                    }
                }
            }

            // 第一批：PriorityOrdered
            let current = collect_registry_post_processors(
                bean_factory,
                &mut processed_beans,
                |name| bean_factory.is_type_match(name, Capability::PriorityOrdered),
            )?;
            invoke_registry_post_processors(
                "PriorityOrdered",
                current,
                registry,
                &mut registry_processors,
            )?;

            // 第二批：Ordered（前一批可能注册了新的处理器，必须重新查询）
            let current = collect_registry_post_processors(
                bean_factory,
                &mut processed_beans,
                |name| bean_factory.is_type_match(name, Capability::Ordered),
            )?;
            invoke_registry_post_processors(
                "Ordered",
                current,
                registry,
                &mut registry_processors,
            )?;

            // 最后：其余所有处理器，直到某一轮不再出现新的处理器
            let mut pass = 0usize;
            loop {
                let current =
                    collect_registry_post_processors(bean_factory, &mut processed_beans, |_| true)?;
                if current.is_empty() {
                    break;
                }
                pass += 1;
                tracing::trace!("Registry post-processor discovery pass {}", pass);
                invoke_registry_post_processors(
                    "remaining",
                    current,
                    registry,
                    &mut registry_processors,
                )?;
            }

            // 先执行所有注册表处理器的工厂回调，再执行 API 提供的普通处理器
            for processor in &registry_processors {
                tracing::debug!(
                    "Invoking factory callback of post-processor: {}",
                    processor.name()
                );
                processor.post_process_bean_factory(bean_factory)?;
            }
            for processor in &regular_post_processors {
                tracing::debug!(
                    "Invoking supplied BeanFactoryPostProcessor: {}",
                    processor.name()
                );
                processor.post_process_bean_factory(bean_factory)?;
            }
        }
        None => {
            // 工厂不是注册表，只调用 API 提供的处理器
            for hook in external_hooks {
                tracing::debug!("Invoking supplied post-processor: {:?}", hook);
                hook.post_process_bean_factory(bean_factory)?;
            }
        }
    }

    invoke_factory_only_post_processors(bean_factory, &processed_beans)?;

    // 工厂后置处理器可能修改了原始定义（例如替换占位符）
    bean_factory.clear_metadata_cache();
    Ok(())
}

/// 只实现工厂回调的处理器，以及未在注册表阶段处理过的处理器
fn invoke_factory_only_post_processors(
    bean_factory: &dyn ConfigurableListableBeanFactory,
    processed_beans: &HashSet<String>,
) -> ContainerResult<()> {
    let post_processor_names =
        bean_factory.get_bean_names_for_capability(Capability::FactoryPostProcessor, true, false);

    let mut priority_ordered = Vec::new();
    let mut ordered_names = Vec::new();
    let mut non_ordered_names = Vec::new();

    for name in post_processor_names {
        if processed_beans.contains(&name) {
            // 注册表阶段已经处理过
            continue;
        }
        if bean_factory.is_type_match(&name, Capability::PriorityOrdered) {
            let hook = get_factory_post_processor(bean_factory, &name)?;
            let precedence = precedence_of(bean_factory, &name);
            priority_ordered.push(OrderedHook::new(name, precedence, hook));
        } else if bean_factory.is_type_match(&name, Capability::Ordered) {
            ordered_names.push(name);
        } else {
            non_ordered_names.push(name);
        }
    }

    sort_post_processors(&mut priority_ordered);
    invoke_factory_post_processors("PriorityOrdered", &priority_ordered, bean_factory)?;

    // Ordered 批次在 PriorityOrdered 批次执行之后才实例化
    let mut ordered = Vec::with_capacity(ordered_names.len());
    for name in ordered_names {
        let hook = get_factory_post_processor(bean_factory, &name)?;
        let precedence = precedence_of(bean_factory, &name);
        ordered.push(OrderedHook::new(name, precedence, hook));
    }
    sort_post_processors(&mut ordered);
    invoke_factory_post_processors("Ordered", &ordered, bean_factory)?;

    // 其余的保持发现顺序，不排序
    let mut non_ordered = Vec::with_capacity(non_ordered_names.len());
    for name in non_ordered_names {
        let hook = get_factory_post_processor(bean_factory, &name)?;
        non_ordered.push(OrderedHook::new(name, Precedence::Unordered, hook));
    }
    invoke_factory_post_processors("remaining", &non_ordered, bean_factory)?;

    Ok(())
}

/// 收集尚未处理、且满足过滤条件的注册表后置处理器
///
/// 处理器在这里实例化并记入已处理集合，返回前已排序
fn collect_registry_post_processors<F>(
    bean_factory: &dyn ConfigurableListableBeanFactory,
    processed_beans: &mut HashSet<String>,
    filter: F,
) -> ContainerResult<Vec<RegistryHook>>
where
    F: Fn(&str) -> bool,
{
    let post_processor_names =
        bean_factory.get_bean_names_for_capability(Capability::RegistryPostProcessor, true, false);

    let mut current = Vec::new();
    for name in post_processor_names {
        if processed_beans.contains(&name) || !filter(&name) {
            continue;
        }
        let processor = get_registry_post_processor(bean_factory, &name)?;
        let precedence = precedence_of(bean_factory, &name);
        processed_beans.insert(name.clone());
        current.push(OrderedHook::new(name, precedence, processor));
    }

    sort_post_processors(&mut current);
    Ok(current)
}

fn invoke_registry_post_processors(
    tier: &str,
    current: Vec<RegistryHook>,
    registry: &dyn BeanDefinitionRegistry,
    registry_processors: &mut Vec<Arc<dyn BeanDefinitionRegistryPostProcessor>>,
) -> ContainerResult<()> {
    if current.is_empty() {
        return Ok(());
    }

    tracing::info!(
        "Invoking {} {} BeanDefinitionRegistryPostProcessor(s)",
        current.len(),
        tier
    );
    for hook in &current {
        tracing::debug!("Invoking registry callback of '{}' ({:?})", hook.name, hook.precedence);
        hook.hook.post_process_bean_definition_registry(registry)?;
    }

    registry_processors.extend(current.into_iter().map(|h| h.hook));
    Ok(())
}

fn invoke_factory_post_processors(
    tier: &str,
    hooks: &[OrderedHook<FactoryPostProcessorHook>],
    bean_factory: &dyn ConfigurableListableBeanFactory,
) -> ContainerResult<()> {
    if hooks.is_empty() {
        return Ok(());
    }

    tracing::info!("Invoking {} {} BeanFactoryPostProcessor(s)", hooks.len(), tier);
    for hook in hooks {
        tracing::debug!("Invoking BeanFactoryPostProcessor '{}'", hook.name);
        hook.hook.post_process_bean_factory(bean_factory)?;
    }
    Ok(())
}

/// 把 Bean 后置处理器注册到工厂的拦截器链上
///
/// 链上的顺序：检查器、PriorityOrdered、Ordered、其余、合并定义处理器（再注册一次）、
/// 监听器探测器。合并定义处理器会在链上出现两次。
pub fn register_bean_post_processors(
    bean_factory: &Arc<dyn ConfigurableListableBeanFactory>,
    multicaster: Arc<dyn ApplicationEventMulticaster>,
) -> ContainerResult<()> {
    let factory = bean_factory.as_ref();
    let post_processor_names =
        factory.get_bean_names_for_capability(Capability::PostProcessor, true, false);

    // 检查器最先注册，用于发现在拦截器全部就位之前就被创建的 Bean
    let target_count = factory.get_bean_post_processor_count() + 1 + post_processor_names.len();
    factory.add_bean_post_processor(Arc::new(BeanPostProcessorChecker::new(
        Arc::downgrade(bean_factory),
        target_count,
    )));

    let mut priority_ordered: Vec<InterceptorHook> = Vec::new();
    let mut internal_post_processors: Vec<InterceptorHook> = Vec::new();
    let mut ordered_names = Vec::new();
    let mut non_ordered_names = Vec::new();

    for name in post_processor_names {
        if factory.is_type_match(&name, Capability::PriorityOrdered) {
            let hook = instantiate_post_processor(factory, &name, &mut internal_post_processors)?;
            priority_ordered.push(hook);
        } else if factory.is_type_match(&name, Capability::Ordered) {
            ordered_names.push(name);
        } else {
            non_ordered_names.push(name);
        }
    }

    sort_post_processors(&mut priority_ordered);
    add_post_processors("PriorityOrdered", factory, &priority_ordered);

    let mut ordered = Vec::with_capacity(ordered_names.len());
    for name in ordered_names {
        ordered.push(instantiate_post_processor(factory, &name, &mut internal_post_processors)?);
    }
    sort_post_processors(&mut ordered);
    add_post_processors("Ordered", factory, &ordered);

    let mut non_ordered = Vec::with_capacity(non_ordered_names.len());
    for name in non_ordered_names {
        non_ordered.push(instantiate_post_processor(factory, &name, &mut internal_post_processors)?);
    }
    add_post_processors("remaining", factory, &non_ordered);

    // 合并定义处理器再注册一次，保证它们排在普通处理器之后
    sort_post_processors(&mut internal_post_processors);
    add_post_processors("MergedBeanDefinition", factory, &internal_post_processors);

    factory.add_bean_post_processor(Arc::new(ApplicationListenerDetector::new(multicaster)));

    tracing::debug!(
        "Registered BeanPostProcessors, chain length is now {}",
        factory.get_bean_post_processor_count()
    );
    Ok(())
}

fn instantiate_post_processor(
    bean_factory: &dyn ConfigurableListableBeanFactory,
    name: &str,
    internal_post_processors: &mut Vec<InterceptorHook>,
) -> ContainerResult<InterceptorHook> {
    let processor = get_bean_post_processor(bean_factory, name)?;
    let hook = OrderedHook::new(name, precedence_of(bean_factory, name), processor);
    if hook.hook.as_merged_bean_definition_post_processor().is_some() {
        internal_post_processors.push(hook.clone());
    }
    Ok(hook)
}

fn add_post_processors(
    tier: &str,
    bean_factory: &dyn ConfigurableListableBeanFactory,
    hooks: &[InterceptorHook],
) {
    if hooks.is_empty() {
        return;
    }

    tracing::info!("Registering {} {} BeanPostProcessor(s)", hooks.len(), tier);
    for hook in hooks {
        tracing::debug!("Registering BeanPostProcessor '{}'", hook.name);
        bean_factory.add_bean_post_processor(Arc::clone(&hook.hook));
    }
}

/// 定义上声明的优先级；手动注册的单例没有定义，视为无序
fn precedence_of(bean_factory: &dyn ConfigurableListableBeanFactory, name: &str) -> Precedence {
    bean_factory
        .get_merged_bean_definition(name)
        .map(|definition| definition.precedence)
        .unwrap_or_default()
}

fn kind_mismatch(name: &str, expected: BeanKind, found: &Bean) -> ContainerError {
    ContainerError::TypeMismatch {
        name: name.to_string(),
        expected: expected.to_string(),
        found: found.kind().to_string(),
    }
}

fn get_registry_post_processor(
    bean_factory: &dyn ConfigurableListableBeanFactory,
    name: &str,
) -> ContainerResult<Arc<dyn BeanDefinitionRegistryPostProcessor>> {
    match bean_factory.get_bean(name)? {
        Bean::RegistryPostProcessor(processor) => Ok(processor),
        other => Err(kind_mismatch(name, BeanKind::RegistryPostProcessor, &other)),
    }
}

fn get_factory_post_processor(
    bean_factory: &dyn ConfigurableListableBeanFactory,
    name: &str,
) -> ContainerResult<FactoryPostProcessorHook> {
    match bean_factory.get_bean(name)? {
        Bean::RegistryPostProcessor(processor) => Ok(FactoryPostProcessorHook::Registry(processor)),
        Bean::FactoryPostProcessor(processor) => Ok(FactoryPostProcessorHook::Factory(processor)),
        other => Err(kind_mismatch(name, BeanKind::FactoryPostProcessor, &other)),
    }
}

fn get_bean_post_processor(
    bean_factory: &dyn ConfigurableListableBeanFactory,
    name: &str,
) -> ContainerResult<Arc<dyn BeanPostProcessor>> {
    match bean_factory.get_bean(name)? {
        Bean::PostProcessor(processor) => Ok(processor),
        other => Err(kind_mismatch(name, BeanKind::PostProcessor, &other)),
    }
}
