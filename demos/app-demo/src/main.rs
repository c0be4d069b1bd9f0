use std::sync::Arc;

use chimera_context::prelude::*;
use chimera_context::{submit_component, ContextRefreshedEvent};
use parking_lot::Mutex;

type Journal = Arc<Mutex<Vec<String>>>;

// ==================== 组件 ====================

/// 数据库配置，连接地址来自配置文件或默认值
#[derive(Debug)]
struct DatabaseConfig {
    url: String,
    pool_size: i64,
}

impl Component for DatabaseConfig {
    const BEAN_NAME: &'static str = "databaseConfig";

    fn create(ctx: &CreationContext<'_>) -> ContainerResult<Self> {
        Ok(DatabaseConfig {
            url: ctx.property_str("url").unwrap_or_default().to_string(),
            pool_size: ctx
                .property("pool-size")
                .and_then(ConfigValue::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        })
    }

    fn customize(definition: BeanDefinition) -> BeanDefinition {
        definition
            .with_property("url", "${database.url:postgres://localhost/demo}")
            .with_property("pool-size", "${database.pool-size:8}")
    }
}

submit_component!(DatabaseConfig);

#[derive(Debug)]
struct UserRepository {
    config: Arc<DatabaseConfig>,
}

impl UserRepository {
    fn find_all(&self) -> Vec<&'static str> {
        vec!["alice", "bob"]
    }
}

// ==================== 后置处理器 ====================

/// 注册表后置处理器：按需注册审计 Bean
struct AuditRegistrar {
    journal: Journal,
}

impl BeanFactoryPostProcessor for AuditRegistrar {
    fn post_process_bean_factory(
        &self,
        bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()> {
        self.journal.lock().push(format!(
            "AuditRegistrar saw {} bean definition(s)",
            bean_factory.get_bean_names().len()
        ));
        Ok(())
    }

    fn name(&self) -> &str {
        "AuditRegistrar"
    }
}

impl BeanDefinitionRegistryPostProcessor for AuditRegistrar {
    fn post_process_bean_definition_registry(
        &self,
        registry: &dyn BeanDefinitionRegistry,
    ) -> ContainerResult<()> {
        self.journal.lock().push("AuditRegistrar registering auditLog".to_string());
        if !registry.contains_bean_definition("auditLog") {
            registry.register_bean_definition(
                "auditLog",
                BeanDefinition::component(|_| Ok(Mutex::new(Vec::<String>::new()))),
            )?;
        }
        Ok(())
    }
}

/// 工厂后置处理器：把名称以 Repository 结尾的定义标记为 primary
struct RepositoryTuner {
    journal: Journal,
}

impl BeanFactoryPostProcessor for RepositoryTuner {
    fn post_process_bean_factory(
        &self,
        bean_factory: &dyn ConfigurableListableBeanFactory,
    ) -> ContainerResult<()> {
        for name in bean_factory.get_bean_names() {
            if name.ends_with("Repository") {
                bean_factory.modify_bean_definition(&name, &mut |def: &mut BeanDefinition| {
                    def.primary = true;
                })?;
                self.journal.lock().push(format!("RepositoryTuner marked '{}' primary", name));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "RepositoryTuner"
    }
}

/// Bean 后置处理器：记录每个初始化完成的组件
struct CreationTracer {
    journal: Journal,
}

impl BeanPostProcessor for CreationTracer {
    fn post_process_after_initialization(&self, bean: Bean, bean_name: &str) -> ContainerResult<Bean> {
        if bean.kind() == BeanKind::Component {
            self.journal.lock().push(format!("CreationTracer saw '{}'", bean_name));
        }
        Ok(bean)
    }

    fn name(&self) -> &str {
        "CreationTracer"
    }
}

struct StartupListener {
    journal: Journal,
}

impl ApplicationListener for StartupListener {
    fn on_event(&self, event: Arc<dyn Event>) {
        if let Some(refreshed) = event.as_any().downcast_ref::<ContextRefreshedEvent>() {
            self.journal.lock().push(format!(
                "StartupListener: context refreshed with {} definition(s)",
                refreshed.bean_definition_count
            ));
        }
    }

    fn supports_event(&self, event_name: &str) -> bool {
        event_name == "ContextRefreshedEvent"
    }
}

// ==================== 配置类 ====================

fn repository_config() -> BeanDefinition {
    BeanDefinition::component(|_| Ok(()))
        .configuration()
        .declare_bean(
            "userRepository",
            BeanDefinition::component(|ctx| {
                let config = ctx
                    .bean_factory()
                    .get_component::<DatabaseConfig>(DatabaseConfig::BEAN_NAME)?;
                Ok(UserRepository { config })
            })
            .with_dependencies(vec![DatabaseConfig::BEAN_NAME.to_string()]),
        )
}

fn main() -> anyhow::Result<()> {
    let journal: Journal = Arc::default();

    let tracer_journal = Arc::clone(&journal);
    let listener_journal = Arc::clone(&journal);
    let registrar_journal = Arc::clone(&journal);

    let context = ChimeraApplication::new("AppDemo")
        .env_prefix("DEMO_")
        .bean_factory_post_processor(FactoryPostProcessorHook::factory(RepositoryTuner {
            journal: Arc::clone(&journal),
        }))
        .initializer(move |ctx| {
            ctx.register_bean_definition("repositoryConfig", repository_config())?;

            let journal = Arc::clone(&registrar_journal);
            ctx.register_bean_definition(
                "auditRegistrar",
                BeanDefinition::registry_post_processor(move |_| {
                    Ok(AuditRegistrar {
                        journal: Arc::clone(&journal),
                    })
                })
                .ordered(0),
            )?;

            let journal = Arc::clone(&tracer_journal);
            ctx.register_bean_definition(
                "creationTracer",
                BeanDefinition::post_processor(move |_| {
                    Ok(CreationTracer {
                        journal: Arc::clone(&journal),
                    })
                }),
            )?;

            let journal = Arc::clone(&listener_journal);
            ctx.register_bean_definition(
                "startupListener",
                BeanDefinition::listener(move |_| {
                    Ok(StartupListener {
                        journal: Arc::clone(&journal),
                    })
                }),
            )?;
            Ok(())
        })
        .run()?;

    let repository = context.get_component::<UserRepository>("userRepository")?;
    tracing::info!(
        "UserRepository connected to {} (pool size {}), users: {:?}",
        repository.config.url,
        repository.config.pool_size,
        repository.find_all()
    );

    println!("\nBootstrap journal:");
    for (index, entry) in journal.lock().iter().enumerate() {
        println!("  {:>2}. {}", index + 1, entry);
    }

    context.close()?;
    Ok(())
}
