use std::path::Path;
use std::sync::Arc;

use crate::config::{Environment, EnvironmentPropertySource, TomlPropertySource};
use crate::context::ApplicationContext;
use crate::error::{ApplicationError, ApplicationResult};
use crate::lifecycle::FactoryPostProcessorHook;
use crate::logging::LoggingConfig;

type Initializer = Box<dyn Fn(&Arc<ApplicationContext>) -> ApplicationResult<()> + Send + Sync>;

/// Chimera 应用程序
///
/// 提供便捷的应用启动方式：加载配置、初始化日志、扫描组件并刷新上下文
pub struct ChimeraApplication {
    /// 应用名称
    name: String,

    /// 配置文件路径
    config_files: Vec<String>,

    /// 环境变量前缀
    env_prefix: String,

    /// 激活的 profiles
    profiles: Vec<String>,

    /// 是否显示 banner
    show_banner: bool,

    /// 日志配置，None 表示不安装订阅者
    logging_config: Option<LoggingConfig>,

    /// 是否注册通过 `submit_component!` 提交的组件
    scan_components: bool,

    bean_factory_post_processors: Vec<FactoryPostProcessorHook>,

    /// 自定义初始化函数，在刷新之前执行
    initializers: Vec<Initializer>,
}

impl ChimeraApplication {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec!["application.toml".to_string()],
            env_prefix: "APP_".to_string(),
            profiles: Vec::new(),
            show_banner: true,
            logging_config: Some(LoggingConfig::from_env()),
            scan_components: true,
            bean_factory_post_processors: Vec::new(),
            initializers: Vec::new(),
        }
    }

    /// 设置配置文件路径
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    /// 设置环境变量前缀
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// 设置日志配置，配置文件中的 `logging.*` 仍会覆盖这里的值
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 不初始化日志（例如测试中已经安装了订阅者）
    pub fn without_logging(mut self) -> Self {
        self.logging_config = None;
        self
    }

    pub fn scan_components(mut self, scan: bool) -> Self {
        self.scan_components = scan;
        self
    }

    /// 添加 Bean 工厂后置处理器
    pub fn bean_factory_post_processor(mut self, processor: FactoryPostProcessorHook) -> Self {
        self.bean_factory_post_processors.push(processor);
        self
    }

    /// 添加初始化器
    pub fn initializer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<ApplicationContext>) -> ApplicationResult<()> + Send + Sync + 'static,
    {
        self.initializers.push(Box::new(f));
        self
    }

    /// 运行应用，返回已刷新的上下文
    pub fn run(self) -> ApplicationResult<Arc<ApplicationContext>> {
        let start_time = std::time::Instant::now();

        let active_profiles = self.resolve_active_profiles();
        let environment = Arc::new(Environment::new());
        self.load_configurations(&environment, &active_profiles)?;
        environment.add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));
        environment.set_active_profiles(active_profiles.clone());

        if let Some(logging_config) = &self.logging_config {
            logging_config.clone().merge_environment(&environment).init()?;
        }

        if self.show_banner {
            self.print_banner();
        }

        tracing::info!("Starting {} application", self.name);
        if active_profiles.is_empty() {
            tracing::info!("No active profiles set, using default configuration");
        } else {
            tracing::info!("Active profiles: {:?}", active_profiles);
        }
        tracing::debug!("Environment variable prefix: {}", self.env_prefix);

        let mut builder = ApplicationContext::builder().environment(environment);
        if self.scan_components {
            builder = builder.scan_components()?;
        }
        for processor in self.bean_factory_post_processors {
            builder = builder.add_bean_factory_post_processor(processor);
        }
        let context = builder.build();

        for initializer in &self.initializers {
            initializer(&context)?;
        }

        context.refresh()?;

        tracing::info!("Started {} in {}ms", self.name, start_time.elapsed().as_millis());
        Ok(context)
    }

    /// 代码设置的 profiles 优先，否则读取环境变量 `{prefix}PROFILES_ACTIVE`
    fn resolve_active_profiles(&self) -> Vec<String> {
        if !self.profiles.is_empty() {
            return self.profiles.clone();
        }
        std::env::var(format!("{}PROFILES_ACTIVE", self.env_prefix))
            .map(|profiles| {
                profiles
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 加载配置文件
    ///
    /// 加载顺序（优先级从低到高）：
    /// 1. application.toml (default)
    /// 2. application-{profile}.toml (profile specific)
    fn load_configurations(
        &self,
        environment: &Environment,
        active_profiles: &[String],
    ) -> ApplicationResult<()> {
        for base_config in &self.config_files {
            load_config_file(environment, base_config, 0)?;
        }

        for (index, profile) in active_profiles.iter().enumerate() {
            for base_config in &self.config_files {
                let profile_config = profile_config_path(base_config, profile);
                load_config_file(environment, &profile_config, 10 + index as i32)?;
            }
        }

        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(r"   ____ _     _                           ");
        println!(r"  / ___| |__ (_)_ __ ___   ___ _ __ __ _ ");
        println!(r" | |   | '_ \| | '_ ` _ \ / _ \ '__/ _` |");
        println!(r" | |___| | | | | | | | | |  __/ | | (_| |");
        println!(r"  \____|_| |_|_|_| |_| |_|\___|_|  \__,_|");
        println!();
        println!("  :: Chimera Context ::        (v{})", env!("CARGO_PKG_VERSION"));
        println!();
    }
}

impl Default for ChimeraApplication {
    fn default() -> Self {
        Self::new("ChimeraApplication")
    }
}

/// 例如：application.toml -> application-dev.toml
fn profile_config_path(base_path: &str, profile: &str) -> String {
    match base_path.rfind('.') {
        Some(dot_pos) => {
            let (name, ext) = base_path.split_at(dot_pos);
            format!("{}-{}{}", name, profile, ext)
        }
        None => format!("{}-{}", base_path, profile),
    }
}

/// 文件不存在时跳过，存在但无法解析时返回错误
fn load_config_file(environment: &Environment, config_file: &str, priority: i32) -> ApplicationResult<()> {
    if !Path::new(config_file).exists() {
        tracing::debug!("Configuration file not found: {}", config_file);
        return Ok(());
    }

    let source = TomlPropertySource::from_file(config_file).map_err(ApplicationError::ConfigLoadFailed)?;
    environment.add_property_source(Box::new(source.with_priority(priority)));
    tracing::info!("Loaded configuration from: {} (priority: {})", config_file, priority);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_config_path() {
        assert_eq!(profile_config_path("application.toml", "dev"), "application-dev.toml");
        assert_eq!(profile_config_path("config/app", "prod"), "config/app-prod");
    }

    #[test]
    fn test_missing_config_file_is_skipped() {
        let environment = Environment::new();
        load_config_file(&environment, "does-not-exist.toml", 0).unwrap();
        assert!(environment.property_source_names().is_empty());
    }

    #[test]
    fn test_run_without_logging() {
        let context = ChimeraApplication::new("test")
            .config_file("does-not-exist.toml")
            .banner(false)
            .without_logging()
            .scan_components(false)
            .profiles(vec!["test".into()])
            .initializer(|ctx| {
                ctx.register_singleton("marker", 7u8)?;
                Ok(())
            })
            .run()
            .unwrap();

        assert!(context.is_active());
        assert_eq!(*context.get_component::<u8>("marker").unwrap(), 7);
        assert!(context.environment().accepts_profiles("test"));
    }
}
