#![allow(dead_code)]

use std::sync::Arc;

use chimera_context::prelude::*;
use parking_lot::Mutex;

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::default()
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

/// 记录两个回调的注册表后置处理器，回调时可以注册更多定义
pub struct RecordingRegistryProcessor {
    pub label: String,
    pub journal: Journal,
    pub registers: Vec<(String, BeanDefinition)>,
}

impl RecordingRegistryProcessor {
    pub fn new(label: &str, journal: &Journal) -> Self {
        Self {
            label: label.to_string(),
            journal: Arc::clone(journal),
            registers: Vec::new(),
        }
    }

    pub fn registering(mut self, name: &str, definition: BeanDefinition) -> Self {
        self.registers.push((name.to_string(), definition));
        self
    }
}

impl BeanFactoryPostProcessor for RecordingRegistryProcessor {
    fn post_process_bean_factory(
        &self,
        _bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()> {
        self.journal.lock().push(format!("factory:{}", self.label));
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

impl BeanDefinitionRegistryPostProcessor for RecordingRegistryProcessor {
    fn post_process_bean_definition_registry(
        &self,
        registry: &dyn BeanDefinitionRegistry,
    ) -> ContainerResult<()> {
        self.journal.lock().push(format!("registry:{}", self.label));
        for (name, definition) in &self.registers {
            registry.register_bean_definition(name, definition.clone())?;
        }
        Ok(())
    }
}

pub struct RecordingFactoryProcessor {
    pub label: String,
    pub journal: Journal,
}

impl RecordingFactoryProcessor {
    pub fn new(label: &str, journal: &Journal) -> Self {
        Self {
            label: label.to_string(),
            journal: Arc::clone(journal),
        }
    }
}

impl BeanFactoryPostProcessor for RecordingFactoryProcessor {
    fn post_process_bean_factory(
        &self,
        _bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()> {
        self.journal.lock().push(format!("factory:{}", self.label));
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// 注册表后置处理器的定义，`registers` 中的定义会在注册表回调中注册
pub fn registry_definition(
    label: &str,
    journal: &Journal,
    registers: Vec<(&str, BeanDefinition)>,
) -> BeanDefinition {
    let label = label.to_string();
    let journal = Arc::clone(journal);
    let registers: Vec<(String, BeanDefinition)> = registers
        .into_iter()
        .map(|(name, definition)| (name.to_string(), definition))
        .collect();
    BeanDefinition::registry_post_processor(move |_| {
        Ok(RecordingRegistryProcessor {
            label: label.clone(),
            journal: Arc::clone(&journal),
            registers: registers.clone(),
        })
    })
}

pub fn factory_definition(label: &str, journal: &Journal) -> BeanDefinition {
    let label = label.to_string();
    let journal = Arc::clone(journal);
    BeanDefinition::factory_post_processor(move |_| {
        Ok(RecordingFactoryProcessor::new(&label, &journal))
    })
}

/// 在初始化后记录 Bean 名称的拦截器
pub struct RecordingInterceptor {
    pub label: String,
    pub journal: Journal,
}

impl BeanPostProcessor for RecordingInterceptor {
    fn post_process_after_initialization(&self, bean: Bean, bean_name: &str) -> ContainerResult<Bean> {
        self.journal
            .lock()
            .push(format!("{}:{}", self.label, bean_name));
        Ok(bean)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

pub fn interceptor_definition(label: &str, journal: &Journal) -> BeanDefinition {
    let label = label.to_string();
    let journal = Arc::clone(journal);
    BeanDefinition::post_processor(move |_| {
        Ok(RecordingInterceptor {
            label: label.clone(),
            journal: Arc::clone(&journal),
        })
    })
}
