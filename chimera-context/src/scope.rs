/// Bean 的作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// 单例 - 每个名称最多实例化一次，实例缓存在工厂中
    Singleton,

    /// 原型 - 每次获取都创建新实例，不缓存
    Prototype,
}

impl Scope {
    pub fn is_singleton(self) -> bool {
        matches!(self, Scope::Singleton)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Singleton
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Singleton => write!(f, "singleton"),
            Scope::Prototype => write!(f, "prototype"),
        }
    }
}
