//! Type descriptors describe how to construct a [Component](crate::component::Component): the
//! ordered list of its named parameters, their types, whether they have a default and optional
//! setting keys for value parameters. Descriptors are usually generated by `#[derive(Component)]`,
//! but can be written by hand:
//!
//! ```
//! use autowire::descriptor::{Parameter, TypeDescriptor};
//! use autowire::value_store::ValueKind;
//!
//! let descriptor = TypeDescriptor::new(vec![
//!     Parameter::value("port", ValueKind::Int).with_default(),
//!     Parameter::value("host", ValueKind::String).with_setting("SERVER_HOST"),
//! ]);
//!
//! assert_eq!(descriptor.parameters().len(), 2);
//! ```

use crate::component::{Injectable, Injected};
use crate::error::AssemblyError;
use crate::instance_provider::InstancePtr;
use crate::value_store::{FromScalar, ScalarValue, ValueKind};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::{type_name, Any, TypeId};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Identity of an injectable type - either a concrete component or a `dyn Trait` alias.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Declared type of a constructor parameter.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ParameterType {
    /// Scalar read from the [ValueStore](crate::value_store::ValueStore).
    Value(ValueKind),
    /// Single component or factory-provided instance.
    Dependency(TypeKey),
    /// All components exposing given type.
    Collection(TypeKey),
}

/// A single named constructor parameter.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: &'static str,
    /// `None` when the type is unknown, which makes assembly fail.
    pub parameter_type: Option<ParameterType>,
    /// Parameters with defaults are left unbound when they cannot be resolved.
    pub has_default: bool,
    /// Explicit value store key, replacing the one derived from the assembly path.
    pub setting: Option<&'static str>,
}

impl Parameter {
    pub fn new(name: &'static str, parameter_type: ParameterType) -> Self {
        Self {
            name,
            parameter_type: Some(parameter_type),
            has_default: false,
            setting: None,
        }
    }

    pub fn value(name: &'static str, kind: ValueKind) -> Self {
        Self::new(name, ParameterType::Value(kind))
    }

    pub fn dependency<T: Injectable + ?Sized>(name: &'static str) -> Self {
        Self::new(name, ParameterType::Dependency(TypeKey::of::<T>()))
    }

    pub fn collection<T: Injectable + ?Sized>(name: &'static str) -> Self {
        Self::new(name, ParameterType::Collection(TypeKey::of::<T>()))
    }

    pub fn untyped(name: &'static str) -> Self {
        Self {
            name,
            parameter_type: None,
            has_default: false,
            setting: None,
        }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn with_setting(mut self, key: &'static str) -> Self {
        self.setting = Some(key);
        self
    }
}

/// Ordered list of constructor parameters of a component.
#[derive(Clone, Default, Debug)]
pub struct TypeDescriptor {
    parameters: Vec<Parameter>,
}

impl TypeDescriptor {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self { parameters }
    }

    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
    }
}

/// A value bound to a constructor parameter. Instances are stored after casting, i.e. as a
/// `Box<dyn Any>` holding an `InstancePtr<T>` of the parameter type.
pub enum Argument {
    Value(ScalarValue),
    Instance(Box<dyn Any>),
    Instances(Vec<Box<dyn Any>>),
}

/// Arguments bound for a single construction. Parameters which are absent are unbound - their
/// default should apply.
pub struct Arguments {
    owner: &'static str,
    arguments: FxHashMap<String, Argument>,
    // value store keys of values read from the store
    value_keys: FxHashMap<String, String>,
}

impl Arguments {
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            arguments: Default::default(),
            value_keys: Default::default(),
        }
    }

    /// Name of the type being constructed.
    #[inline]
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn insert(&mut self, name: impl Into<String>, argument: Argument) {
        let name = name.into();
        self.value_keys.remove(&name);
        self.arguments.insert(name, argument);
    }

    /// Binds a value read from the value store under `key`. Conversion errors report the key
    /// instead of the parameter name.
    pub fn insert_stored_value(
        &mut self,
        name: impl Into<String>,
        key: impl Into<String>,
        value: ScalarValue,
    ) {
        let name = name.into();
        self.value_keys.insert(name.clone(), key.into());
        self.arguments.insert(name, Argument::Value(value));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Takes the argument, returning `None` if unbound.
    #[inline]
    pub fn take<T: Injected>(&mut self, name: &str) -> Result<Option<T>, AssemblyError> {
        T::take(self, name)
    }

    /// Takes the argument, failing if unbound.
    pub fn require<T: Injected>(&mut self, name: &str) -> Result<T, AssemblyError> {
        T::take(self, name)?.ok_or_else(|| AssemblyError::UnboundParameter {
            parameter: name.to_string(),
            owner: self.owner.to_string(),
        })
    }

    pub fn take_value<T: FromScalar>(&mut self, name: &str) -> Result<Option<T>, AssemblyError> {
        let key = self.value_keys.remove(name);
        match self.arguments.remove(name) {
            None => Ok(None),
            Some(Argument::Value(value)) => T::from_scalar(&value).map(Some).ok_or_else(|| {
                AssemblyError::TypeConversion {
                    key: key.unwrap_or_else(|| name.to_string()),
                    expected: T::KIND,
                    found: value.to_string(),
                }
            }),
            Some(_) => Err(incompatible_argument(name, self.owner)),
        }
    }

    pub fn take_instance<T: ?Sized + 'static>(
        &mut self,
        name: &str,
    ) -> Result<Option<InstancePtr<T>>, AssemblyError> {
        match self.arguments.remove(name) {
            None => Ok(None),
            Some(Argument::Instance(instance)) => instance
                .downcast::<InstancePtr<T>>()
                .map(|instance| Some(*instance))
                .map_err(|_| incompatible_argument(name, self.owner)),
            Some(_) => Err(incompatible_argument(name, self.owner)),
        }
    }

    pub fn take_instances<T: ?Sized + 'static>(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<InstancePtr<T>>>, AssemblyError> {
        let owner = self.owner;
        match self.arguments.remove(name) {
            None => Ok(None),
            Some(Argument::Instances(instances)) => instances
                .into_iter()
                .map(|instance| {
                    instance
                        .downcast::<InstancePtr<T>>()
                        .map(|instance| *instance)
                        .map_err(|_| incompatible_argument(name, owner))
                })
                .try_collect()
                .map(Some),
            Some(_) => Err(incompatible_argument(name, owner)),
        }
    }
}

fn incompatible_argument(name: &str, owner: &str) -> AssemblyError {
    AssemblyError::IncompatibleArgument {
        parameter: name.to_string(),
        owner: owner.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::{Argument, Arguments, Parameter, TypeDescriptor, TypeKey};
    use crate::error::AssemblyError;
    use crate::instance_provider::InstancePtr;
    use crate::value_store::{ScalarValue, ValueKind};

    #[test]
    fn should_compare_keys_by_type() {
        assert_eq!(TypeKey::of::<i8>(), TypeKey::of::<i8>());
        assert_ne!(TypeKey::of::<i8>(), TypeKey::of::<u8>());
    }

    #[test]
    fn should_find_parameters() {
        let descriptor = TypeDescriptor::new(vec![
            Parameter::value("a", ValueKind::Int).with_setting("KEY_A"),
            Parameter::value("b", ValueKind::Int),
        ]);

        assert_eq!(descriptor.parameter("a").unwrap().setting, Some("KEY_A"));
        assert!(descriptor.parameter("b").unwrap().setting.is_none());
        assert!(descriptor.parameter("c").is_none());
    }

    #[test]
    fn should_take_arguments() {
        let mut arguments = Arguments::new("Owner");
        arguments.insert("value", Argument::Value(ScalarValue::String("7".to_string())));
        arguments.insert(
            "instance",
            Argument::Instance(Box::new(InstancePtr::new(5i8))),
        );

        assert_eq!(arguments.take_value::<u16>("value").unwrap(), Some(7));
        assert_eq!(*arguments.take_instance::<i8>("instance").unwrap().unwrap(), 5);
        assert!(arguments.take_value::<u16>("value").unwrap().is_none());
        assert!(arguments.is_empty());
    }

    #[test]
    fn should_report_store_key_on_conversion_error() {
        let mut arguments = Arguments::new("Owner");
        arguments.insert_stored_value("small", "INNER_SMALL", ScalarValue::Int(300));
        arguments.insert("other", Argument::Value(ScalarValue::Int(300)));

        assert!(matches!(
            arguments.take_value::<u8>("small").unwrap_err(),
            AssemblyError::TypeConversion { key, .. } if key == "INNER_SMALL"
        ));
        assert!(matches!(
            arguments.take_value::<u8>("other").unwrap_err(),
            AssemblyError::TypeConversion { key, .. } if key == "other"
        ));
    }

    #[test]
    fn should_reject_incompatible_arguments() {
        let mut arguments = Arguments::new("Owner");
        arguments.insert(
            "instance",
            Argument::Instance(Box::new(InstancePtr::new(5i8))),
        );

        assert!(matches!(
            arguments.take_instance::<u8>("instance").unwrap_err(),
            AssemblyError::IncompatibleArgument { .. }
        ));
    }

    #[test]
    fn should_require_bound_arguments() {
        let mut arguments = Arguments::new("Owner");

        assert!(matches!(
            arguments.require::<String>("missing").unwrap_err(),
            AssemblyError::UnboundParameter { .. }
        ));
    }
}
