//! 排序标记 - 对应 Spring 的 PriorityOrdered / Ordered
//!
//! 优先级标记挂在 Bean 定义上，因此无需实例化即可判断一个处理器属于哪一批。
//! 数字越小优先级越高；相同 order 的处理器保持发现顺序（稳定排序）。

/// 最高优先级
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// 最低优先级，未声明顺序的处理器视为此值
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// 处理器的优先级标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precedence {
    /// 最先执行的一批（PriorityOrdered），同时也满足 Ordered 能力
    PriorityOrdered(i32),

    /// 显式顺序（Ordered）
    Ordered(i32),

    /// 无任何标记
    #[default]
    Unordered,
}

/// 优先级分批
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTier {
    PriorityOrdered,
    Ordered,
    Unordered,
}

impl Precedence {
    /// 没有显式 order 的 PriorityOrdered，同批内彼此相等
    pub fn priority() -> Self {
        Precedence::PriorityOrdered(LOWEST_PRECEDENCE)
    }

    pub fn order(self) -> i32 {
        match self {
            Precedence::PriorityOrdered(order) | Precedence::Ordered(order) => order,
            Precedence::Unordered => LOWEST_PRECEDENCE,
        }
    }

    pub fn is_priority_ordered(self) -> bool {
        matches!(self, Precedence::PriorityOrdered(_))
    }

    /// PriorityOrdered 是 Ordered 的特化，两者都返回 true
    pub fn is_ordered(self) -> bool {
        !matches!(self, Precedence::Unordered)
    }

    pub fn tier(self) -> OrderTier {
        match self {
            Precedence::PriorityOrdered(_) => OrderTier::PriorityOrdered,
            Precedence::Ordered(_) => OrderTier::Ordered,
            Precedence::Unordered => OrderTier::Unordered,
        }
    }

    /// 比较键：PriorityOrdered 总在前面，其余按 order 升序
    fn sort_key(self) -> (bool, i32) {
        (!self.is_priority_ordered(), self.order())
    }
}

/// 已实例化、带有名称和优先级的处理器
#[derive(Clone)]
pub struct OrderedHook<T> {
    pub name: String,
    pub precedence: Precedence,
    pub hook: T,
}

impl<T> OrderedHook<T> {
    pub fn new(name: impl Into<String>, precedence: Precedence, hook: T) -> Self {
        Self {
            name: name.into(),
            precedence,
            hook,
        }
    }
}

impl<T> std::fmt::Debug for OrderedHook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedHook")
            .field("name", &self.name)
            .field("precedence", &self.precedence)
            .finish()
    }
}

/// 按优先级排序处理器（稳定排序，相等时保持发现顺序）
pub fn sort_post_processors<T>(hooks: &mut [OrderedHook<T>]) {
    hooks.sort_by_key(|h| h.precedence.sort_key());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<T>(hooks: &[OrderedHook<T>]) -> Vec<&str> {
        hooks.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn test_sort_by_order_ascending() {
        let mut hooks = vec![
            OrderedHook::new("c", Precedence::Ordered(30), ()),
            OrderedHook::new("a", Precedence::Ordered(-5), ()),
            OrderedHook::new("b", Precedence::Ordered(10), ()),
        ];
        sort_post_processors(&mut hooks);
        assert_eq!(names(&hooks), ["a", "b", "c"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_order() {
        let mut hooks = vec![
            OrderedHook::new("first", Precedence::Ordered(5), ()),
            OrderedHook::new("early", Precedence::Ordered(1), ()),
            OrderedHook::new("second", Precedence::Ordered(5), ()),
            OrderedHook::new("third", Precedence::Ordered(5), ()),
        ];
        sort_post_processors(&mut hooks);
        assert_eq!(names(&hooks), ["early", "first", "second", "third"]);
    }

    #[test]
    fn test_priority_ordered_sorts_before_ordered() {
        let mut hooks = vec![
            OrderedHook::new("ordered", Precedence::Ordered(HIGHEST_PRECEDENCE), ()),
            OrderedHook::new("unordered", Precedence::Unordered, ()),
            OrderedHook::new("priority", Precedence::priority(), ()),
        ];
        sort_post_processors(&mut hooks);
        assert_eq!(names(&hooks), ["priority", "ordered", "unordered"]);
    }

    #[test]
    fn test_priority_without_order_compare_equal() {
        let mut hooks = vec![
            OrderedHook::new("p1", Precedence::priority(), ()),
            OrderedHook::new("p2", Precedence::priority(), ()),
            OrderedHook::new("p0", Precedence::PriorityOrdered(0), ()),
        ];
        sort_post_processors(&mut hooks);
        assert_eq!(names(&hooks), ["p0", "p1", "p2"]);
    }

    #[test]
    fn test_unordered_equals_lowest_ordered() {
        let mut hooks = vec![
            OrderedHook::new("unordered", Precedence::Unordered, ()),
            OrderedHook::new("lowest", Precedence::Ordered(LOWEST_PRECEDENCE), ()),
        ];
        sort_post_processors(&mut hooks);
        assert_eq!(names(&hooks), ["unordered", "lowest"]);
    }

    #[test]
    fn test_capabilities() {
        assert!(Precedence::priority().is_ordered());
        assert!(Precedence::priority().is_priority_ordered());
        assert!(Precedence::Ordered(1).is_ordered());
        assert!(!Precedence::Ordered(1).is_priority_ordered());
        assert!(!Precedence::Unordered.is_ordered());
        assert_eq!(Precedence::Unordered.tier(), OrderTier::Unordered);
    }
}
