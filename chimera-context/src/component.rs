use crate::bean::{BeanDefinition, CreationContext, DefinitionSource};
use crate::bean_factory::BeanDefinitionRegistry;
use crate::ContainerResult;

/// Component trait - 用于标记可以自动注册到容器的组件
///
/// # 示例
///
/// ```ignore
/// struct UserService {
///     repository: Arc<UserRepository>,
/// }
///
/// impl Component for UserService {
///     const BEAN_NAME: &'static str = "userService";
///
///     fn create(ctx: &CreationContext<'_>) -> ContainerResult<Self> {
///         let repository = ctx.bean_factory().get_component::<UserRepository>("userRepository")?;
///         Ok(UserService { repository })
///     }
/// }
///
/// submit_component!(UserService);
/// ```
pub trait Component: Sized + Send + Sync + 'static {
    /// Bean 名称
    const BEAN_NAME: &'static str;

    /// 创建实例
    fn create(ctx: &CreationContext<'_>) -> ContainerResult<Self>;

    /// 调整生成的定义（作用域、延迟加载、依赖等）
    fn customize(definition: BeanDefinition) -> BeanDefinition {
        definition
    }

    /// 组件对应的 Bean 定义
    fn definition() -> BeanDefinition {
        Self::customize(
            BeanDefinition::component(Self::create).with_source(DefinitionSource::Component),
        )
    }
}

/// 通过 inventory 收集的组件
pub struct ComponentSubmission {
    pub name: &'static str,
    pub definition: fn() -> BeanDefinition,
}

impl ComponentSubmission {
    pub const fn of<T: Component>() -> Self {
        Self {
            name: T::BEAN_NAME,
            definition: T::definition,
        }
    }
}

inventory::collect!(ComponentSubmission);

/// 全局提交一个组件，`ApplicationContextBuilder::scan_components` 会注册它
///
/// ```ignore
/// submit_component!(UserService);
/// submit_component!(name: "clock", definition: || BeanDefinition::component(|_| Ok(SystemClock)));
/// ```
#[macro_export]
macro_rules! submit_component {
    (name: $name:expr, definition: $definition:expr $(,)?) => {
        $crate::inventory::submit! {
            $crate::component::ComponentSubmission {
                name: $name,
                definition: $definition,
            }
        }
    };
    ($component:ty) => {
        $crate::inventory::submit! {
            $crate::component::ComponentSubmission::of::<$component>()
        }
    };
}

/// 所有已提交的组件，按名称排序
pub fn submitted_components() -> Vec<&'static ComponentSubmission> {
    let mut submissions: Vec<_> = inventory::iter::<ComponentSubmission>().collect();
    submissions.sort_by_key(|s| s.name);
    submissions
}

/// 按名称顺序注册所有已提交的组件
///
/// 返回注册的组件数量
pub fn register_submitted_components(registry: &dyn BeanDefinitionRegistry) -> ContainerResult<usize> {
    let submissions = submitted_components();
    tracing::info!("Scanning components, found {} submission(s)", submissions.len());

    for submission in &submissions {
        tracing::debug!("Registering component '{}'", submission.name);
        registry.register_bean_definition(submission.name, (submission.definition)())?;
    }

    Ok(submissions.len())
}
