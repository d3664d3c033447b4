//! Dependency injection by assembling component graphs from registered components, factories and
//! configuration values.
//!
//! A [Component](component::Component) describes its constructor parameters with a
//! [TypeDescriptor](descriptor::TypeDescriptor), usually generated with `#[derive(Component)]`.
//! Components can be registered in an [Assembler](assembler::Assembler), along with
//! [factories](factory_registry) and a [ValueStore](value_store::ValueStore) filled by the
//! [ConfigLoader](config::ConfigLoader). Assembling a type then recursively resolves its
//! dependencies, honoring profiles and singleton policies:
//!
//! ```
//! use autowire::assembler::AssemblerBuilder;
//! use autowire::component_registry::Registration;
//! use autowire::instance_provider::{InstancePtr, TypedInstanceProvider};
//! use autowire::value_store::ValueStore;
//! use autowire::{component_alias, injectable, Component};
//!
//! #[injectable]
//! trait Storage {
//!     fn name(&self) -> &str;
//! }
//!
//! #[derive(Component)]
//! struct MemoryStorage {
//!     name: String,
//! }
//!
//! #[component_alias]
//! impl Storage for MemoryStorage {
//!     fn name(&self) -> &str {
//!         &self.name
//!     }
//! }
//!
//! #[derive(Component)]
//! struct Service {
//!     storage: InstancePtr<dyn Storage + Send + Sync>,
//! }
//!
//! let mut values = ValueStore::new();
//! values.add_value("storage", "name", "memory").unwrap();
//!
//! let mut assembler = AssemblerBuilder::new()
//!     .register_component(
//!         Registration::component::<MemoryStorage>()
//!             .exposing::<dyn Storage + Send + Sync, MemoryStorage>(),
//!     )
//!     .with_values(values)
//!     .build()
//!     .unwrap();
//!
//! let service = assembler.assemble::<Service>().unwrap();
//! assert_eq!(service.storage.name(), "memory");
//! ```

extern crate self as autowire;

pub mod assembler;
pub mod component;
pub mod component_registry;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod factory_registry;
pub mod instance_provider;
pub mod value_store;

#[cfg(feature = "derive")]
pub use autowire_derive::{component_alias, injectable, Component};

#[cfg(test)]
mod test_components {
    use crate::component::{Blueprint, Component, ComponentDowncast, Injectable};
    use crate::descriptor::{Arguments, Parameter, TypeDescriptor};
    use crate::error::AssemblyError;
    use crate::instance_provider::{AnyInstancePtr, InstancePtr};
    use crate::value_store::ValueKind;

    pub trait TestTrait {
        fn value(&self) -> i64;
    }

    impl Injectable for dyn TestTrait + Send + Sync {}

    impl std::fmt::Debug for dyn TestTrait + Send + Sync {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TestTrait").finish_non_exhaustive()
        }
    }

    macro_rules! test_component {
        ($ty:ty, [$($parameter:expr),*], |$arguments:ident| $construct:expr) => {
            impl Injectable for $ty {
                fn blueprint() -> Option<Blueprint> {
                    Some(Blueprint::of::<Self>())
                }
            }

            impl ComponentDowncast<$ty> for $ty {
                fn downcast(source: AnyInstancePtr) -> Result<InstancePtr<Self>, AnyInstancePtr> {
                    source.downcast::<Self>()
                }
            }

            impl Component for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::new(vec![$($parameter),*])
                }

                fn construct($arguments: &mut Arguments) -> Result<Self, AssemblyError> {
                    $construct
                }
            }
        };
    }

    macro_rules! test_alias {
        ($ty:ty) => {
            impl ComponentDowncast<$ty> for dyn TestTrait + Send + Sync {
                fn downcast(source: AnyInstancePtr) -> Result<InstancePtr<Self>, AnyInstancePtr> {
                    source
                        .downcast::<$ty>()
                        .map(|instance| instance as InstancePtr<Self>)
                }
            }
        };
    }

    #[derive(Debug)]
    pub struct TestComponent {
        pub value: i64,
    }

    impl TestTrait for TestComponent {
        fn value(&self) -> i64 {
            self.value
        }
    }

    test_component!(
        TestComponent,
        [Parameter::value("value", ValueKind::Int)],
        |arguments| Ok(Self {
            value: arguments.require("value")?
        })
    );
    test_alias!(TestComponent);

    #[derive(Debug)]
    pub struct OtherComponent;

    impl TestTrait for OtherComponent {
        fn value(&self) -> i64 {
            -1
        }
    }

    test_component!(OtherComponent, [], |_arguments| Ok(Self));
    test_alias!(OtherComponent);

    #[derive(Debug)]
    pub struct CycleStart {
        pub end: InstancePtr<CycleEnd>,
    }

    test_component!(
        CycleStart,
        [Parameter::dependency::<CycleEnd>("end")],
        |arguments| Ok(Self {
            end: arguments.require("end")?
        })
    );

    #[derive(Debug)]
    pub struct CycleEnd {
        pub start: InstancePtr<CycleStart>,
    }

    test_component!(
        CycleEnd,
        [Parameter::dependency::<CycleStart>("start")],
        |arguments| Ok(Self {
            start: arguments.require("start")?
        })
    );

    #[derive(Debug)]
    pub struct UntypedComponent;

    test_component!(
        UntypedComponent,
        [Parameter::untyped("untyped")],
        |_arguments| Ok(Self)
    );
}
