//! One of the basic blocks of dependency injection is a [Component]. Components are constructible
//! types, which can depend on other components, factory-provided instances and configuration
//! values.
//!
//! ## Describing components
//!
//! Any type which wants to be assembled, needs to implement `Component`. For convenience, the trait
//! can be automatically derived with all infrastructure if the `derive` feature is enabled:
//!
//! ```
//! use autowire::instance_provider::InstancePtr;
//! use autowire::{component_alias, injectable, Component};
//!
//! #[injectable]
//! trait Greeter {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! #[derive(Component)]
//! struct EnglishGreeter {
//!     greeting: String,
//! }
//!
//! #[component_alias]
//! impl Greeter for EnglishGreeter {
//!     fn greet(&self, name: &str) -> String {
//!         format!("{}, {name}!", self.greeting)
//!     }
//! }
//!
//! #[derive(Component)]
//! #[component(singleton = false, profiles = ["prod"])]
//! struct Client {
//!     // dyn Trait dependency - note Send + Sync
//!     greeter: InstancePtr<dyn Greeter + Send + Sync>,
//!     // optional dependency - left empty when nothing is registered
//!     fallback: Option<InstancePtr<dyn Greeter + Send + Sync>>,
//!     // all registered components exposing given type
//!     all_greeters: Vec<InstancePtr<dyn Greeter + Send + Sync>>,
//!     // read from the value store under "RETRIES", unless present
//!     #[component(default)]
//!     retries: u32,
//!     // read from the value store under "CLIENT_TIMEOUT"
//!     #[component(setting = "CLIENT_TIMEOUT", default = "default_timeout")]
//!     timeout: f64,
//! }
//!
//! fn default_timeout() -> f64 {
//!     1.5
//! }
//! ```
//!
//! ### Supported `#[component]` struct configuration
//!
//! Presence of the struct attribute registers the component for static discovery (see
//! [ComponentRegistry::from_static](crate::component_registry::ComponentRegistry::from_static)).
//!
//! * `singleton = bool` - cache the first assembled instance (default `true`)
//! * `profiles = ["name"]` - make the component eligible only for given profiles (default: all)
//! * `priority = number` - order of static registration (i8; higher is first; default is 0)
//!
//! ### Supported `#[component]` field configuration
//!
//! * `default` - use `Default::default()` when the parameter cannot be resolved
//! * `default = "expr"` - call `expr()` when the parameter cannot be resolved
//! * `setting = "KEY"` - read the value store using `KEY` instead of the assembly path
//! * `ignore` - don't treat the field as a parameter, initialize it with its default
//!
//! ## Component aliases
//!
//! Aliases are different types, which can refer to a concrete component type. Usually they are
//! simply `dyn Traits`, which makes it possible to inject an abstract `dyn Trait` type instead of a
//! concrete component type. Each injectable trait should be marked with `#[injectable]`, and each
//! implementation with `#[component_alias]`.

use crate::descriptor::{Arguments, ParameterType, TypeDescriptor, TypeKey};
use crate::error::AssemblyError;
use crate::instance_provider::{AnyInstancePtr, CastFunction, InstancePtr};
use crate::value_store::FromScalar;
use derivative::Derivative;
use std::any::Any;

/// Constructor for type-erased instances.
pub type Constructor = fn(arguments: &mut Arguments) -> Result<AnyInstancePtr, AssemblyError>;

/// Marker trait for injectable types - components and aliases.
pub trait Injectable: 'static {
    /// Returns the blueprint used to construct this type when it's not registered. Only concrete
    /// components have one.
    fn blueprint() -> Option<Blueprint> {
        None
    }
}

/// Base trait for components for dependency injection. Acts as the type descriptor and the
/// constructor for given type.
pub trait Component: Injectable + Sized + Send + Sync {
    /// Describes constructor parameters.
    fn descriptor() -> TypeDescriptor;

    /// Creates an instance from bound arguments. Unbound arguments should fall back to defaults or
    /// fail with [AssemblyError::UnboundParameter]. Hand-written constructors report their own
    /// failures with [AssemblyError::ConstructorError].
    fn construct(arguments: &mut Arguments) -> Result<Self, AssemblyError>;
}

/// Helper trait for types (usually `dyn Traits`) implemented by components, thus allowing
/// injection of components based on `dyn Trait` types. The type `C` refers to a concrete component
/// type. Typically automatically derived when using the `#[component_alias]` attribute.
pub trait ComponentDowncast<C: Component>: Injectable {
    fn downcast(source: AnyInstancePtr) -> Result<InstancePtr<Self>, AnyInstancePtr>;
}

/// Everything needed to construct a concrete component in a type-erased way.
#[derive(Derivative, Clone, Copy)]
#[derivative(Debug)]
pub struct Blueprint {
    pub key: TypeKey,
    #[derivative(Debug = "ignore")]
    pub descriptor: fn() -> TypeDescriptor,
    #[derivative(Debug = "ignore")]
    pub constructor: Constructor,
    /// Cast to the component type itself.
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

impl Blueprint {
    pub fn of<C: Component + ComponentDowncast<C>>() -> Self {
        Self {
            key: TypeKey::of::<C>(),
            descriptor: C::descriptor,
            constructor: construct_erased::<C>,
            cast: cast_to::<C, C>,
        }
    }
}

fn construct_erased<C: Component>(
    arguments: &mut Arguments,
) -> Result<AnyInstancePtr, AssemblyError> {
    C::construct(arguments).map(|instance| InstancePtr::new(instance) as AnyInstancePtr)
}

/// Cast function for a component `C` requested as `S`.
pub fn cast_to<S: ComponentDowncast<C> + ?Sized, C: Component>(
    instance: AnyInstancePtr,
) -> Result<Box<dyn Any>, AnyInstancePtr> {
    S::downcast(instance).map(|instance| Box::new(instance) as Box<dyn Any>)
}

/// Types which can be component constructor parameters.
pub trait Injected: Sized {
    fn parameter_type() -> ParameterType;

    /// Optional parameters always have a default.
    fn is_optional() -> bool {
        false
    }

    /// Takes bound argument with given name, returning `None` if unbound.
    fn take(arguments: &mut Arguments, name: &str) -> Result<Option<Self>, AssemblyError>;
}

impl<T: Injectable + ?Sized> Injected for InstancePtr<T> {
    fn parameter_type() -> ParameterType {
        ParameterType::Dependency(TypeKey::of::<T>())
    }

    fn take(arguments: &mut Arguments, name: &str) -> Result<Option<Self>, AssemblyError> {
        arguments.take_instance(name)
    }
}

impl<T: Injectable + ?Sized> Injected for Option<InstancePtr<T>> {
    fn parameter_type() -> ParameterType {
        ParameterType::Dependency(TypeKey::of::<T>())
    }

    fn is_optional() -> bool {
        true
    }

    fn take(arguments: &mut Arguments, name: &str) -> Result<Option<Self>, AssemblyError> {
        arguments.take_instance(name).map(Some)
    }
}

impl<T: Injectable + ?Sized> Injected for Vec<InstancePtr<T>> {
    fn parameter_type() -> ParameterType {
        ParameterType::Collection(TypeKey::of::<T>())
    }

    fn take(arguments: &mut Arguments, name: &str) -> Result<Option<Self>, AssemblyError> {
        arguments.take_instances(name)
    }
}

macro_rules! injected_value {
    ($($ty:ty),*) => {
        $(
            impl Injected for $ty {
                fn parameter_type() -> ParameterType {
                    ParameterType::Value(<$ty as FromScalar>::KIND)
                }

                fn take(arguments: &mut Arguments, name: &str) -> Result<Option<Self>, AssemblyError> {
                    arguments.take_value(name)
                }
            }
        )*
    };
}

injected_value!(bool, String, f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
