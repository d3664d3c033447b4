//! The [Assembler] resolves constructor parameters of components recursively, using registered
//! components, factories and the [ValueStore].
//!
//! For every requested target, a matching factory takes precedence, followed by a cached singleton
//! instance of a matching component. Otherwise, the parameters of the target are resolved in
//! declaration order:
//!
//! * collections (`Vec<InstancePtr<T>>`) get all components exposing `T`, in registration order
//! * values are read from the [ValueStore] using the field setting key, if present, or the key
//! derived from the assembly path (names of parameters leading to the value, upper-cased and
//! joined with `_`)
//! * dependencies are assembled recursively from registered components or taken from factories
//!
//! Parameters which cannot be resolved are left unbound, so their defaults apply. Explicit
//! [Overrides] skip resolution of given parameters and disable singleton caching for the call.
//!
//! ```
//! use autowire::assembler::{AssemblerBuilder, Overrides};
//! use autowire::component_registry::Registration;
//! use autowire::instance_provider::TypedInstanceProvider;
//! use autowire::value_store::ValueStore;
//! use autowire::Component;
//!
//! #[derive(Component)]
//! struct Server {
//!     host: String,
//!     #[component(default)]
//!     port: u16,
//! }
//!
//! let mut values = ValueStore::new();
//! values.add_value("", "host", "localhost").unwrap();
//!
//! let mut assembler = AssemblerBuilder::new()
//!     .register_component(Registration::component::<Server>().singleton(false))
//!     .with_values(values)
//!     .build()
//!     .unwrap();
//!
//! let server = assembler.assemble::<Server>().unwrap();
//! assert_eq!(server.host, "localhost");
//! assert_eq!(server.port, 0);
//!
//! let server = assembler
//!     .assemble_with::<Server>(None, Overrides::new().value("port", 8080))
//!     .unwrap();
//! assert_eq!(server.port, 8080);
//! ```

use crate::component::Blueprint;
use crate::component_registry::{ComponentRegistry, Registration};
use crate::descriptor::{Argument, Arguments, Parameter, ParameterType, TypeKey};
use crate::error::{AssemblyError, ComponentRegistryError};
use crate::factory_registry::{FactoryRegistration, FactoryRegistry};
use crate::instance_provider::{AnyInstancePtr, CastFunction, InstanceProvider, InstancePtr};
use crate::value_store::{ScalarValue, ValueKind, ValueStore};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::Any;
use std::iter::once;
use tracing::{debug, trace};

/// Explicitly provided constructor arguments, taking precedence over resolved ones.
#[derive(Default)]
pub struct Overrides {
    arguments: FxHashMap<String, Argument>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value parameter.
    pub fn value(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.arguments
            .insert(name.into(), Argument::Value(value.into()));
        self
    }

    /// Binds a dependency. The pointer type must match the parameter type exactly, e.g.
    /// `InstancePtr<dyn Trait + Send + Sync>` for trait dependencies.
    pub fn instance<T: ?Sized + 'static>(
        mut self,
        name: impl Into<String>,
        instance: InstancePtr<T>,
    ) -> Self {
        self.arguments
            .insert(name.into(), Argument::Instance(Box::new(instance)));
        self
    }

    /// Binds a collection.
    pub fn instances<T: ?Sized + 'static>(
        mut self,
        name: impl Into<String>,
        instances: Vec<InstancePtr<T>>,
    ) -> Self {
        self.arguments.insert(
            name.into(),
            Argument::Instances(
                instances
                    .into_iter()
                    .map(|instance| Box::new(instance) as Box<dyn Any>)
                    .collect(),
            ),
        );
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arguments.keys().map(String::as_str)
    }
}

/// Builder for [Assembler]s, collecting registrations made during initialization.
#[derive(Default)]
pub struct AssemblerBuilder {
    static_components: bool,
    components: Vec<Registration>,
    factories: Vec<FactoryRegistration>,
    values: ValueStore,
}

impl AssemblerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers all components declared with the `#[component]` struct attribute, before any
    /// explicit registrations.
    pub fn with_static_components(mut self) -> Self {
        self.static_components = true;
        self
    }

    pub fn register_component(mut self, registration: Registration) -> Self {
        self.components.push(registration);
        self
    }

    pub fn register_factory(mut self, registration: FactoryRegistration) -> Self {
        self.factories.push(registration);
        self
    }

    pub fn with_values(mut self, values: ValueStore) -> Self {
        self.values = values;
        self
    }

    pub fn build(self) -> Result<Assembler, ComponentRegistryError> {
        let mut assembler = Assembler::new(self.values);

        let static_components = if self.static_components {
            ComponentRegistry::static_registrations()
        } else {
            vec![]
        };

        for registration in static_components.into_iter().chain(self.components) {
            assembler.register_component(registration)?;
        }

        for registration in self.factories {
            assembler.register_factory(registration)?;
        }

        Ok(assembler)
    }
}

/// Owner of component and factory registries, and the value store. Assembles instances on demand.
#[derive(Default, Debug)]
pub struct Assembler {
    components: ComponentRegistry,
    factories: FactoryRegistry,
    values: ValueStore,
    // concrete types currently under construction
    stack: Vec<TypeKey>,
}

impl Assembler {
    pub fn new(values: ValueStore) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    /// Registers a component. Fails if any type exposed by the component is already provided by a
    /// factory for an overlapping profile, or if the component itself is already registered.
    pub fn register_component(
        &mut self,
        registration: Registration,
    ) -> Result<(), ComponentRegistryError> {
        if let Some((key, profile)) = registration.exposed_types().find_map(|key| {
            self.factories
                .find_conflict(key, registration.profile_list())
                .map(|profile| (key, profile))
        }) {
            return Err(ComponentRegistryError::DuplicateRegistration {
                type_name: key.type_name().to_string(),
                profile,
            });
        }

        self.components.register(registration)
    }

    /// Registers a factory. Fails if its return type is already provided by a component or another
    /// factory for an overlapping profile.
    pub fn register_factory(
        &mut self,
        registration: FactoryRegistration,
    ) -> Result<(), ComponentRegistryError> {
        let key = registration.return_type();
        if let Some(profile) = self
            .components
            .find_conflict(key, registration.profile_list())
        {
            return Err(ComponentRegistryError::DuplicateRegistration {
                type_name: key.type_name().to_string(),
                profile,
            });
        }

        self.factories.register(registration)
    }

    #[inline]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    #[inline]
    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    #[inline]
    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut ValueStore {
        &mut self.values
    }

    fn assemble_impl(
        &mut self,
        target: TypeKey,
        blueprint: Option<Blueprint>,
        profile: Option<&str>,
        overrides: Overrides,
        path: &[String],
    ) -> Result<(AnyInstancePtr, CastFunction), AssemblyError> {
        if let Some(index) = self.factories.lookup(target, profile)? {
            return self.factory_instance(index, target);
        }

        if let Some(index) = self.components.lookup(target, profile)? {
            return self.assemble_component(index, target, profile, overrides, path);
        }

        let blueprint =
            blueprint.ok_or_else(|| AssemblyError::UnresolvableTarget(target.to_string()))?;

        trace!(target = target.type_name(), "Assembling unregistered component.");

        self.construct(&blueprint, None, profile, overrides, path)
            .map(|instance| (instance, blueprint.cast))
    }

    fn factory_instance(
        &mut self,
        index: usize,
        target: TypeKey,
    ) -> Result<(AnyInstancePtr, CastFunction), AssemblyError> {
        self.factories
            .get_mut(index)
            .ok_or_else(|| AssemblyError::UnresolvableTarget(target.to_string()))?
            .instance()
    }

    fn assemble_component(
        &mut self,
        index: usize,
        target: TypeKey,
        profile: Option<&str>,
        overrides: Overrides,
        path: &[String],
    ) -> Result<(AnyInstancePtr, CastFunction), AssemblyError> {
        let component = self
            .components
            .get(index)
            .ok_or_else(|| AssemblyError::UnresolvableTarget(target.to_string()))?;

        let cast = component
            .cast_for(target)
            .ok_or_else(|| AssemblyError::IncompatibleComponent(target.to_string()))?;

        let cacheable = overrides.is_empty();
        if cacheable {
            if let Some(instance) = component.cached_instance() {
                debug!(component = component.key().type_name(), "Using cached singleton instance.");
                return Ok((instance, cast));
            }
        }

        let blueprint = *component.blueprint();
        let instance = self.construct(&blueprint, Some(index), profile, overrides, path)?;

        if cacheable {
            if let Some(component) = self.components.get_mut(index) {
                component.store_instance(instance.clone())?;
            }
        }

        Ok((instance, cast))
    }

    fn construct(
        &mut self,
        blueprint: &Blueprint,
        component: Option<usize>,
        profile: Option<&str>,
        overrides: Overrides,
        path: &[String],
    ) -> Result<AnyInstancePtr, AssemblyError> {
        if self.stack.contains(&blueprint.key) {
            return Err(AssemblyError::CyclicDependency {
                path: self
                    .stack
                    .iter()
                    .chain(once(&blueprint.key))
                    .map(|key| key.type_name().to_string())
                    .collect(),
            });
        }

        self.stack.push(blueprint.key);
        let result = self.construct_impl(blueprint, component, profile, overrides, path);
        self.stack.pop();

        result
    }

    fn construct_impl(
        &mut self,
        blueprint: &Blueprint,
        component: Option<usize>,
        profile: Option<&str>,
        overrides: Overrides,
        path: &[String],
    ) -> Result<AnyInstancePtr, AssemblyError> {
        let owner = blueprint.key.type_name();
        let descriptor = (blueprint.descriptor)();

        let parameters: Vec<(&Parameter, ParameterType)> = descriptor
            .parameters()
            .iter()
            .map(|parameter| {
                parameter
                    .parameter_type
                    .map(|parameter_type| (parameter, parameter_type))
                    .ok_or_else(|| AssemblyError::MissingTypeAnnotation {
                        parameter: parameter.name.to_string(),
                        owner: owner.to_string(),
                    })
            })
            .try_collect()?;

        if let Some(name) = overrides
            .names()
            .find(|name| descriptor.parameter(name).is_none())
        {
            return Err(AssemblyError::UnexpectedArgument {
                parameter: name.to_string(),
                owner: owner.to_string(),
            });
        }

        let mut arguments = Arguments::new(owner);
        for (parameter, parameter_type) in parameters {
            if overrides.contains(parameter.name) {
                trace!(owner, parameter = parameter.name, "Using explicit argument.");
                continue;
            }

            let argument = match parameter_type {
                ParameterType::Collection(key) => Some(self.resolve_collection(key, profile)?),
                ParameterType::Value(kind) => {
                    let setting = component
                        .and_then(|index| self.components.get(index))
                        .and_then(|component| component.setting(parameter.name))
                        .or(parameter.setting);

                    if let Some((key, value)) =
                        self.resolve_value(parameter, kind, setting, owner, path)?
                    {
                        arguments.insert_stored_value(parameter.name, key, value);
                    } else {
                        trace!(owner, parameter = parameter.name, "Leaving parameter unbound.");
                    }

                    continue;
                }
                ParameterType::Dependency(key) => {
                    self.resolve_dependency(parameter, key, profile, path)?
                }
            };

            if let Some(argument) = argument {
                arguments.insert(parameter.name, argument);
            } else {
                trace!(owner, parameter = parameter.name, "Leaving parameter unbound.");
            }
        }

        for (name, argument) in overrides.arguments {
            arguments.insert(name, argument);
        }

        (blueprint.constructor)(&mut arguments)
    }

    fn resolve_collection(
        &mut self,
        key: TypeKey,
        profile: Option<&str>,
    ) -> Result<Argument, AssemblyError> {
        let indices = self.components.lookup_all(key, profile);

        trace!(element = key.type_name(), count = indices.len(), "Resolving collection.");

        indices
            .into_iter()
            .map(|index| {
                self.assemble_component(index, key, profile, Overrides::default(), &[])
                    .and_then(|(instance, cast)| {
                        cast(instance)
                            .map_err(|_| AssemblyError::IncompatibleComponent(key.to_string()))
                    })
            })
            .try_collect()
            .map(Argument::Instances)
    }

    fn resolve_value(
        &self,
        parameter: &Parameter,
        kind: ValueKind,
        setting: Option<&str>,
        owner: &str,
        path: &[String],
    ) -> Result<Option<(String, ScalarValue)>, AssemblyError> {
        let key = setting
            .map(str::to_uppercase)
            .unwrap_or_else(|| path_key(path, parameter.name));

        trace!(owner, parameter = parameter.name, key = %key, "Resolving value.");

        match self.values.get(&key) {
            Some(value) => match value.convert(kind) {
                Some(converted) => Ok(Some((key, converted))),
                None => Err(AssemblyError::TypeConversion {
                    key,
                    expected: kind,
                    found: value.to_string(),
                }),
            },
            None if parameter.has_default => Ok(None),
            None => Err(AssemblyError::MissingValue {
                parameter: parameter.name.to_string(),
                owner: owner.to_string(),
                key,
            }),
        }
    }

    fn resolve_dependency(
        &mut self,
        parameter: &Parameter,
        key: TypeKey,
        profile: Option<&str>,
        path: &[String],
    ) -> Result<Option<Argument>, AssemblyError> {
        let component = self.components.lookup(key, profile)?;
        let factory = self.factories.lookup(key, profile)?;

        trace!(parameter = parameter.name, dependency = key.type_name(), "Resolving dependency.");

        let (instance, cast) = match (component, factory) {
            (Some(index), _) => {
                let path = path
                    .iter()
                    .cloned()
                    .chain(once(parameter.name.to_string()))
                    .collect_vec();

                self.assemble_component(index, key, profile, Overrides::default(), &path)?
            }
            (None, Some(index)) => self.factory_instance(index, key)?,
            (None, None) => return Ok(None),
        };

        cast(instance)
            .map(|instance| Some(Argument::Instance(instance)))
            .map_err(|_| AssemblyError::IncompatibleComponent(key.to_string()))
    }
}

impl InstanceProvider for Assembler {
    fn instance(
        &mut self,
        target: TypeKey,
        blueprint: Option<Blueprint>,
        profile: Option<&str>,
        overrides: Overrides,
    ) -> Result<(AnyInstancePtr, CastFunction), AssemblyError> {
        debug!(target = target.type_name(), profile = ?profile, "Assembling instance.");
        self.assemble_impl(target, blueprint, profile, overrides, &[])
    }
}

/// Derives the value store key from the assembly path and parameter name.
fn path_key(path: &[String], name: &str) -> String {
    path.iter()
        .map(String::as_str)
        .chain(once(name))
        .map(|segment| segment.trim_start_matches('_').to_uppercase())
        .join("_")
}
