//! Functionality related to retrieving assembled instances. An [InstanceProvider] works on
//! type-erased instances, while [TypedInstanceProvider] adds strongly-typed access on top of it.

use crate::assembler::Overrides;
use crate::component::{Blueprint, Injectable};
use crate::descriptor::TypeKey;
use crate::error::AssemblyError;
use std::any::{type_name, Any};
use std::error::Error;
use std::sync::Arc;

/// Shared pointer to an assembled instance.
pub type InstancePtr<T> = Arc<T>;

/// Type-erased [InstancePtr].
pub type AnyInstancePtr = InstancePtr<dyn Any + Send + Sync + 'static>;

/// Shared pointer to errors reported by user-provided producers and constructors.
pub type ErrorPtr = Arc<dyn Error + Send + Sync + 'static>;

/// Casts a type-erased instance into a `Box<dyn Any>` holding an `InstancePtr<Target>`, where
/// `Target` is the type the instance was requested as. Components exposed under multiple types
/// (e.g. `dyn Trait` aliases) carry one cast function per type. On failure, the original instance
/// is returned.
pub type CastFunction = fn(instance: AnyInstancePtr) -> Result<Box<dyn Any>, AnyInstancePtr>;

/// Generic provider of type-erased instances.
pub trait InstanceProvider {
    /// Returns an instance of the `target` type for the given profile. `blueprint` is used to
    /// construct the target when no component or factory is registered for it. Explicit
    /// `overrides` take precedence over every other argument source.
    fn instance(
        &mut self,
        target: TypeKey,
        blueprint: Option<Blueprint>,
        profile: Option<&str>,
        overrides: Overrides,
    ) -> Result<(AnyInstancePtr, CastFunction), AssemblyError>;
}

/// Helper trait for [InstanceProvider] providing strongly-typed access.
pub trait TypedInstanceProvider {
    /// Assembles an instance of `T` without an active profile.
    fn assemble<T: Injectable + ?Sized>(&mut self) -> Result<InstancePtr<T>, AssemblyError> {
        self.assemble_with::<T>(None, Overrides::default())
    }

    /// Assembles an instance of `T` for the given profile.
    fn assemble_for_profile<T: Injectable + ?Sized>(
        &mut self,
        profile: &str,
    ) -> Result<InstancePtr<T>, AssemblyError> {
        self.assemble_with::<T>(Some(profile), Overrides::default())
    }

    /// Assembles an instance of `T` for an optional profile, binding the given overrides to
    /// constructor parameters before any other resolution takes place.
    fn assemble_with<T: Injectable + ?Sized>(
        &mut self,
        profile: Option<&str>,
        overrides: Overrides,
    ) -> Result<InstancePtr<T>, AssemblyError>;
}

impl<P: InstanceProvider + ?Sized> TypedInstanceProvider for P {
    fn assemble_with<T: Injectable + ?Sized>(
        &mut self,
        profile: Option<&str>,
        overrides: Overrides,
    ) -> Result<InstancePtr<T>, AssemblyError> {
        self.instance(TypeKey::of::<T>(), T::blueprint(), profile, overrides)
            .and_then(cast_instance::<T>)
    }
}

/// Applies the cast function to an erased instance and extracts the typed pointer.
pub fn cast_instance<T: ?Sized + 'static>(
    (instance, cast): (AnyInstancePtr, CastFunction),
) -> Result<InstancePtr<T>, AssemblyError> {
    cast(instance)
        .ok()
        .and_then(|instance| instance.downcast::<InstancePtr<T>>().ok())
        .map(|instance| *instance)
        .ok_or_else(|| AssemblyError::IncompatibleComponent(type_name::<T>().to_string()))
}

#[cfg(test)]
mod tests {
    use crate::instance_provider::{cast_instance, AnyInstancePtr, InstancePtr};
    use std::any::Any;

    fn cast_i8(instance: AnyInstancePtr) -> Result<Box<dyn Any>, AnyInstancePtr> {
        instance.downcast::<i8>().map(|p| Box::new(p) as Box<dyn Any>)
    }

    #[test]
    fn should_cast_instance() {
        let instance = InstancePtr::new(5i8) as AnyInstancePtr;
        assert_eq!(*cast_instance::<i8>((instance, cast_i8)).unwrap(), 5);
    }

    #[test]
    fn should_reject_incompatible_instance() {
        let instance = InstancePtr::new(5u8) as AnyInstancePtr;
        assert!(cast_instance::<i8>((instance, cast_i8)).is_err());

        let instance = InstancePtr::new(5i8) as AnyInstancePtr;
        assert!(cast_instance::<u8>((instance, cast_i8)).is_err());
    }
}
