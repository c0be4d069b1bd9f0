use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;

/// 占位符前缀
pub const PLACEHOLDER_PREFIX: &str = "${";

/// 占位符后缀
pub const PLACEHOLDER_SUFFIX: char = '}';

/// 占位符默认值分隔符
pub const VALUE_SEPARATOR: char = ':';

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 转换为整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Array(values) => {
                let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(","))
            }
            ConfigValue::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let parts: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}={}", k, map[k]))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Int(i64::from(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置管理器
///
/// 类似 Spring Boot 的 Environment，提供统一的配置访问接口和占位符解析
pub struct Environment {
    /// 配置源列表（按优先级排序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,

    /// 当前激活的 profile
    active_profiles: RwLock<Vec<String>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("active_profiles", &*self.active_profiles.read())
            .field("sources_count", &self.sources.read().len())
            .finish()
    }
}

impl Environment {
    /// 创建新的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            active_profiles: RwLock::new(Vec::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        tracing::debug!(
            "Adding property source '{}' (priority {})",
            source.name(),
            source.priority()
        );
        let mut sources = self.sources.write();
        sources.push(source);
        // 按优先级降序排序，相同优先级保持添加顺序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 配置源名称，按查找顺序
    pub fn property_source_names(&self) -> Vec<String> {
        self.sources
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        tracing::trace!("Config '{}' not found in any source", key);
        None
    }

    pub fn contains_property(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 获取字符串配置，非字符串值会被格式化
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    /// 获取整数配置
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// 获取布尔值配置
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 获取字符串数组配置
    /// 支持两种格式:
    /// 1. TOML数组: key = ["a", "b", "c"]
    /// 2. 逗号分隔字符串: key = "a, b, c"
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            ConfigValue::Array(arr) => Some(arr.iter().map(ToString::to_string).collect()),
            ConfigValue::String(s) => Some(
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// 设置激活的 profile
    pub fn set_active_profiles(&self, profiles: Vec<String>) {
        *self.active_profiles.write() = profiles;
    }

    /// 获取激活的 profile
    pub fn get_active_profiles(&self) -> Vec<String> {
        self.active_profiles.read().clone()
    }

    /// 检查是否包含指定的 profile
    pub fn accepts_profiles(&self, profile: &str) -> bool {
        self.active_profiles.read().iter().any(|p| p == profile)
    }

    /// 解析文本中的 `${key}` 和 `${key:default}` 占位符
    ///
    /// 解析出的值会继续解析其中的占位符，键本身也可以包含占位符。
    /// 出错时返回无法解析的占位符键（循环引用同样视为无法解析）。
    pub fn resolve_placeholders(&self, text: &str) -> Result<String, String> {
        self.resolve_nested(text, &mut Vec::new())
    }

    fn resolve_nested(&self, text: &str, visiting: &mut Vec<String>) -> Result<String, String> {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
            result.push_str(&rest[..start]);
            let body_start = &rest[start + PLACEHOLDER_PREFIX.len()..];

            let Some(end) = find_top_level(body_start, PLACEHOLDER_SUFFIX) else {
                // 没有闭合的占位符按原样保留
                result.push_str(&rest[start..]);
                return Ok(result);
            };

            let body = &body_start[..end];
            let (raw_key, default) = match find_top_level(body, VALUE_SEPARATOR) {
                Some(sep) => (&body[..sep], Some(&body[sep + 1..])),
                None => (body, None),
            };
            let key = self.resolve_nested(raw_key, visiting)?;

            if visiting.iter().any(|k| *k == key) {
                tracing::warn!("Circular placeholder reference '{}'", key);
                return Err(key);
            }

            match self.get(&key) {
                Some(value) => {
                    visiting.push(key);
                    let resolved = self.resolve_nested(&value.to_string(), visiting)?;
                    visiting.pop();
                    result.push_str(&resolved);
                }
                None => match default {
                    Some(default) => result.push_str(&self.resolve_nested(default, visiting)?),
                    None => return Err(key),
                },
            }

            rest = &body_start[end + 1..];
        }

        result.push_str(rest);
        Ok(result)
    }
}

/// 查找不在嵌套占位符内的字符位置
fn find_top_level(text: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if c == '$' && matches!(chars.peek(), Some((_, '{'))) {
            chars.next();
            depth += 1;
            continue;
        }
        if c == PLACEHOLDER_SUFFIX && depth > 0 {
            depth -= 1;
            continue;
        }
        if c == target && depth == 0 {
            return Some(idx);
        }
    }
    None
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// 创建环境变量配置源
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，例如 "APP_"
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100, // 环境变量优先级较高
        }
    }

    /// 将配置键转换为环境变量名
    /// 例如: database.url -> APP_DATABASE_URL
    fn key_to_env(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace(['.', '-'], "_").to_uppercase())
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key))
            .ok()
            .map(ConfigValue::String)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 文件配置源，嵌套表展开为点分隔的键
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {:?}: {}", path, e))?;

        Self::parse(&content, path.display().to_string())
    }

    pub fn parse(content: &str, name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let table: toml::Table = content
            .parse()
            .map_err(|e| format!("Failed to parse TOML source '{}': {}", name, e))?;

        let mut properties = HashMap::new();
        for (key, value) in &table {
            flatten_into(key.clone(), value, &mut properties);
        }

        Ok(Self {
            name,
            properties,
            priority: 0,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// `[database] url = "x"` 展开为 `database.url = "x"`，数组保持为一个值
fn flatten_into(key: String, value: &toml::Value, properties: &mut HashMap<String, ConfigValue>) {
    match value {
        toml::Value::Table(table) => {
            for (child, child_value) in table {
                flatten_into(format!("{}.{}", key, child), child_value, properties);
            }
        }
        other => {
            properties.insert(key, ConfigValue::from(other));
        }
    }
}

impl From<&toml::Value> for ConfigValue {
    fn from(value: &toml::Value) -> Self {
        match value {
            toml::Value::String(s) => ConfigValue::String(s.clone()),
            toml::Value::Integer(i) => ConfigValue::Int(*i),
            toml::Value::Float(f) => ConfigValue::Float(*f),
            toml::Value::Boolean(b) => ConfigValue::Bool(*b),
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
            toml::Value::Array(values) => {
                ConfigValue::Array(values.iter().map(ConfigValue::from).collect())
            }
            toml::Value::Table(table) => ConfigValue::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), ConfigValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> Environment {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property("db.host", "localhost")
                .with_property("db.port", 5432i64)
                .with_property("db.url", "postgres://${db.host}:${db.port}/app")
                .with_property("profile", "dev")
                .with_property("host.dev", "dev.internal")
                .with_property("loop.a", "${loop.b}")
                .with_property("loop.b", "${loop.a}"),
        ));
        env
    }

    #[test]
    fn test_source_priority() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("low")
                .with_property("key", "low")
                .with_priority(1),
        ));
        env.add_property_source(Box::new(
            MapPropertySource::new("high")
                .with_property("key", "high")
                .with_priority(10),
        ));

        assert_eq!(env.get_string("key").as_deref(), Some("high"));
        assert_eq!(env.property_source_names(), ["high", "low"]);
    }

    #[test]
    fn test_resolve_simple_and_nested_values() {
        let env = environment();
        assert_eq!(
            env.resolve_placeholders("${db.url}").unwrap(),
            "postgres://localhost:5432/app"
        );
        assert_eq!(env.resolve_placeholders("no placeholders").unwrap(), "no placeholders");
    }

    #[test]
    fn test_resolve_default_value() {
        let env = environment();
        assert_eq!(env.resolve_placeholders("${missing:fallback}").unwrap(), "fallback");
        assert_eq!(env.resolve_placeholders("${missing:}").unwrap(), "");
        assert_eq!(
            env.resolve_placeholders("${missing:${db.host}}").unwrap(),
            "localhost"
        );
    }

    #[test]
    fn test_resolve_placeholder_in_key() {
        let env = environment();
        assert_eq!(
            env.resolve_placeholders("${host.${profile}}").unwrap(),
            "dev.internal"
        );
    }

    #[test]
    fn test_unresolvable_placeholder() {
        let env = environment();
        assert_eq!(env.resolve_placeholders("a ${nope} b"), Err("nope".to_string()));
    }

    #[test]
    fn test_circular_placeholder() {
        let env = environment();
        assert!(env.resolve_placeholders("${loop.a}").is_err());
    }

    #[test]
    fn test_unclosed_placeholder_is_kept() {
        let env = environment();
        assert_eq!(env.resolve_placeholders("x ${db.host").unwrap(), "x ${db.host");
    }

    #[test]
    fn test_toml_flatten() {
        let source = TomlPropertySource::parse(
            r#"
            [server]
            port = 8080
            tags = ["a", "b"]

            [server.tls]
            enabled = true
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(source.get("server.port"), Some(ConfigValue::Int(8080)));
        assert_eq!(source.get("server.tls.enabled"), Some(ConfigValue::Bool(true)));

        let env = Environment::new();
        env.add_property_source(Box::new(source));
        assert_eq!(env.get_string_array("server.tags").unwrap(), ["a", "b"]);
        assert_eq!(env.get_string("server.port").as_deref(), Some("8080"));
    }

    #[test]
    fn test_env_key_mapping() {
        let source = EnvironmentPropertySource::new("CHIMERA_TEST_");
        assert_eq!(source.key_to_env("database.url"), "CHIMERA_TEST_DATABASE_URL");
        assert_eq!(source.key_to_env("logging.show-target"), "CHIMERA_TEST_LOGGING_SHOW_TARGET");
    }

    #[test]
    fn test_profiles() {
        let env = Environment::new();
        env.set_active_profiles(vec!["dev".into(), "local".into()]);
        assert!(env.accepts_profiles("local"));
        assert!(!env.accepts_profiles("prod"));
    }
}
