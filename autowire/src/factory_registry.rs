//! Factories are zero-argument producers standing in for a component of their return type. They
//! are useful for types which cannot be assembled from parameters, e.g. external clients or
//! pre-built configuration. A factory takes precedence over everything else when its return type
//! is requested:
//!
//! ```
//! use autowire::assembler::AssemblerBuilder;
//! use autowire::factory_registry::FactoryRegistration;
//! use autowire::instance_provider::{InstancePtr, TypedInstanceProvider};
//! use autowire::injectable;
//!
//! #[injectable]
//! trait Clock {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//!
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 {
//!         42
//!     }
//! }
//!
//! let mut assembler = AssemblerBuilder::new()
//!     .register_factory(FactoryRegistration::new(|| {
//!         InstancePtr::new(FixedClock) as InstancePtr<dyn Clock + Send + Sync>
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let clock = assembler.assemble::<dyn Clock + Send + Sync>().unwrap();
//! assert_eq!(clock.now(), 42);
//! ```

use crate::component::Injectable;
use crate::component_registry::{find_conflict, profile_matches};
use crate::descriptor::TypeKey;
use crate::error::{AssemblyError, ComponentRegistryError};
use crate::instance_provider::{AnyInstancePtr, CastFunction, ErrorPtr, InstancePtr};
use derivative::Derivative;
use std::any::Any;
use tracing::debug;

/// Type-erased producer. The produced instance holds an `InstancePtr` of the return type, which
/// allows returning unsized types such as `dyn Traits`.
pub type Producer = Box<dyn Fn() -> Result<AnyInstancePtr, ErrorPtr> + Send + Sync>;

/// Cast function for instances produced by factories returning `T`.
pub fn cast_factory_instance<T: ?Sized + Send + Sync + 'static>(
    instance: AnyInstancePtr,
) -> Result<Box<dyn Any>, AnyInstancePtr> {
    instance
        .downcast::<InstancePtr<T>>()
        .map(|instance| Box::new(InstancePtr::clone(&instance)) as Box<dyn Any>)
}

/// Registration information for a factory.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FactoryRegistration {
    return_type: TypeKey,
    #[derivative(Debug = "ignore")]
    producer: Producer,
    #[derivative(Debug = "ignore")]
    cast: CastFunction,
    singleton: bool,
    profiles: Vec<String>,
}

impl FactoryRegistration {
    /// Creates a singleton factory for an infallible producer, eligible for all profiles.
    pub fn new<T, F>(producer: F) -> Self
    where
        T: Injectable + Send + Sync + ?Sized,
        F: Fn() -> InstancePtr<T> + Send + Sync + 'static,
    {
        Self::try_new::<T, _>(move || Ok(producer()))
    }

    /// Creates a singleton factory for a fallible producer. Errors are reported as
    /// [AssemblyError::FactoryError].
    pub fn try_new<T, F>(producer: F) -> Self
    where
        T: Injectable + Send + Sync + ?Sized,
        F: Fn() -> Result<InstancePtr<T>, ErrorPtr> + Send + Sync + 'static,
    {
        Self {
            return_type: TypeKey::of::<T>(),
            producer: Box::new(move || {
                producer().map(|instance| InstancePtr::new(instance) as AnyInstancePtr)
            }),
            cast: cast_factory_instance::<T>,
            singleton: true,
            profiles: vec![],
        }
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn return_type(&self) -> TypeKey {
        self.return_type
    }

    #[inline]
    pub fn profile_list(&self) -> &[String] {
        &self.profiles
    }
}

/// A factory registered in a [FactoryRegistry].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RegisteredFactory {
    return_type: TypeKey,
    #[derivative(Debug = "ignore")]
    producer: Producer,
    #[derivative(Debug = "ignore")]
    cast: CastFunction,
    singleton: bool,
    profiles: Vec<String>,
    #[derivative(Debug = "ignore")]
    cached_instance: Option<AnyInstancePtr>,
}

impl RegisteredFactory {
    pub fn matches(&self, key: TypeKey, profile: Option<&str>) -> bool {
        self.return_type == key && profile_matches(&self.profiles, profile)
    }

    /// Returns the produced instance, running the producer only once for singletons.
    pub fn instance(&mut self) -> Result<(AnyInstancePtr, CastFunction), AssemblyError> {
        if let Some(instance) = &self.cached_instance {
            debug!(factory = self.return_type.type_name(), "Using cached factory instance.");
            return Ok((instance.clone(), self.cast));
        }

        let instance = (self.producer)().map_err(|error| AssemblyError::FactoryError {
            type_name: self.return_type.type_name().to_string(),
            error,
        })?;

        if self.singleton {
            self.cached_instance = Some(instance.clone());
        }

        Ok((instance, self.cast))
    }

    #[inline]
    pub fn return_type(&self) -> TypeKey {
        self.return_type
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    #[inline]
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }
}

/// Registry of factories, keyed by their return types.
#[derive(Default, Debug)]
pub struct FactoryRegistry {
    factories: Vec<RegisteredFactory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the profile for which a factory of `key` restricted to `profiles` would collide
    /// with an existing one, if any.
    pub fn find_conflict(&self, key: TypeKey, profiles: &[String]) -> Option<Option<String>> {
        find_conflict(profiles, |profile| {
            self.factories
                .iter()
                .any(|factory| factory.matches(key, profile))
        })
    }

    pub fn register(
        &mut self,
        registration: FactoryRegistration,
    ) -> Result<(), ComponentRegistryError> {
        if let Some(profile) =
            self.find_conflict(registration.return_type, &registration.profiles)
        {
            return Err(ComponentRegistryError::DuplicateRegistration {
                type_name: registration.return_type.type_name().to_string(),
                profile,
            });
        }

        debug!(factory = registration.return_type.type_name(), singleton = registration.singleton, profiles = ?registration.profiles, "Registering factory.");

        self.factories.push(RegisteredFactory {
            return_type: registration.return_type,
            producer: registration.producer,
            cast: registration.cast,
            singleton: registration.singleton,
            profiles: registration.profiles,
            cached_instance: None,
        });

        Ok(())
    }

    /// Returns the single factory producing `key` for `profile`, failing if there's more than one.
    pub fn lookup(&self, key: TypeKey, profile: Option<&str>) -> Result<Option<usize>, AssemblyError> {
        let mut candidates = self
            .factories
            .iter()
            .enumerate()
            .filter(|(_, factory)| factory.matches(key, profile))
            .map(|(index, _)| index);

        match (candidates.next(), candidates.next()) {
            (None, _) => Ok(None),
            (Some(index), None) => Ok(Some(index)),
            (Some(_), Some(_)) => Err(AssemblyError::MultipleFactoriesForType {
                type_name: key.type_name().to_string(),
                profile: profile.map(str::to_string),
            }),
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&RegisteredFactory> {
        self.factories.get(index)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut RegisteredFactory> {
        self.factories.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::TypeKey;
    use crate::error::{AssemblyError, ComponentRegistryError};
    use crate::factory_registry::{FactoryRegistration, FactoryRegistry};
    use crate::instance_provider::{cast_instance, ErrorPtr, InstancePtr};
    use crate::test_components::{TestComponent, TestTrait};
    use std::io::{Error, ErrorKind};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    type TestTraitPtr = dyn TestTrait + Send + Sync;

    fn counting_factory(counter: Arc<AtomicI64>) -> FactoryRegistration {
        FactoryRegistration::new(move || {
            InstancePtr::new(TestComponent {
                value: counter.fetch_add(1, Ordering::SeqCst),
            })
        })
    }

    #[test]
    fn should_cache_singleton_instance() {
        let counter = Arc::new(AtomicI64::new(0));
        let mut registry = FactoryRegistry::new();
        registry.register(counting_factory(counter.clone())).unwrap();

        let factory = registry.get_mut(0).unwrap();
        let first = cast_instance::<TestComponent>(factory.instance().unwrap()).unwrap();
        let second = cast_instance::<TestComponent>(factory.instance().unwrap()).unwrap();

        assert!(InstancePtr::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_produce_fresh_prototype_instances() {
        let counter = Arc::new(AtomicI64::new(0));
        let mut registry = FactoryRegistry::new();
        registry
            .register(counting_factory(counter.clone()).singleton(false))
            .unwrap();

        let factory = registry.get_mut(0).unwrap();
        let first = cast_instance::<TestComponent>(factory.instance().unwrap()).unwrap();
        let second = cast_instance::<TestComponent>(factory.instance().unwrap()).unwrap();

        assert!(!InstancePtr::ptr_eq(&first, &second));
        assert_eq!(second.value, 1);
    }

    #[test]
    fn should_produce_trait_objects() {
        let mut registry = FactoryRegistry::new();
        registry
            .register(FactoryRegistration::new(|| {
                InstancePtr::new(TestComponent { value: 5 }) as InstancePtr<TestTraitPtr>
            }))
            .unwrap();

        let index = registry
            .lookup(TypeKey::of::<TestTraitPtr>(), None)
            .unwrap()
            .unwrap();
        let instance =
            cast_instance::<TestTraitPtr>(registry.get_mut(index).unwrap().instance().unwrap())
                .unwrap();

        assert_eq!(instance.value(), 5);
        assert!(registry
            .lookup(TypeKey::of::<TestComponent>(), None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn should_report_producer_errors() {
        let mut registry = FactoryRegistry::new();
        registry
            .register(FactoryRegistration::try_new(|| {
                Err::<InstancePtr<TestComponent>, _>(
                    Arc::new(Error::new(ErrorKind::Other, "unavailable")) as ErrorPtr
                )
            }))
            .unwrap();

        assert!(matches!(
            registry.get_mut(0).unwrap().instance().unwrap_err(),
            AssemblyError::FactoryError { .. }
        ));
    }

    #[test]
    fn should_reject_duplicate_factories() {
        let mut registry = FactoryRegistry::new();
        registry
            .register(counting_factory(Default::default()).profiles(["test"]))
            .unwrap();

        assert_eq!(
            registry
                .register(counting_factory(Default::default()).profiles(["prod", "test"]))
                .unwrap_err(),
            ComponentRegistryError::DuplicateRegistration {
                type_name: TypeKey::of::<TestComponent>().type_name().to_string(),
                profile: Some("test".to_string()),
            }
        );

        registry.register(counting_factory(Default::default())).unwrap();
        assert!(matches!(
            registry
                .lookup(TypeKey::of::<TestComponent>(), Some("test"))
                .unwrap_err(),
            AssemblyError::MultipleFactoriesForType { .. }
        ));
    }
}
