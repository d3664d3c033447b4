//! Functionality related to registering [Component]s. Registered components can be injected into
//! other components and are subject to profile filtering and singleton caching.
//!
//! ## Profiles
//!
//! A component registered without profiles is eligible for every assembly, with or without an
//! active profile. A component registered with profiles is eligible only when one of them is
//! active. At most one component may be eligible when requesting a single instance of a given
//! type, otherwise assembly fails with an ambiguity error.
//!
//! ## Static registration
//!
//! Components with a struct-level `#[component]` attribute and aliases declared with
//! `#[component_alias]` are collected at link time and can be registered in one go with
//! [ComponentRegistry::from_static].

use crate::component::{Blueprint, Component, ComponentDowncast};
use crate::component_registry::internal::{
    AliasRegisterer, ComponentDefinitionRegisterer, StaticAliasDefinition,
    StaticComponentDefinition,
};
use crate::descriptor::TypeKey;
use crate::error::{AssemblyError, ComponentRegistryError};
use crate::instance_provider::{AnyInstancePtr, CastFunction};
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
use tracing::debug;

/// Checks if an entry restricted to `profiles` is eligible for the active `profile`.
pub(crate) fn profile_matches(profiles: &[String], profile: Option<&str>) -> bool {
    profiles.is_empty()
        || profile
            .map(|profile| profiles.iter().any(|candidate| candidate == profile))
            .unwrap_or(false)
}

/// Finds the profile for which a new entry of `profiles` would collide with existing ones:
/// `Some(None)` when colliding with an entry eligible without a profile, `Some(Some(profile))` for
/// a colliding profile.
pub(crate) fn find_conflict(
    profiles: &[String],
    is_taken: impl Fn(Option<&str>) -> bool,
) -> Option<Option<String>> {
    if is_taken(None) {
        return Some(None);
    }

    profiles
        .iter()
        .find(|profile| is_taken(Some(profile)))
        .map(|profile| Some(profile.clone()))
}

/// A type under which a component can be injected, along with its cast function.
#[derive(Derivative, Clone, Copy)]
#[derivative(Debug)]
pub struct Alias {
    pub key: TypeKey,
    /// Component type this alias refers to.
    pub target: TypeKey,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

impl Alias {
    /// Alias `S` for component `C`.
    pub fn of<S: ComponentDowncast<C> + ?Sized, C: Component>() -> Self {
        Self {
            key: TypeKey::of::<S>(),
            target: TypeKey::of::<C>(),
            cast: crate::component::cast_to::<S, C>,
        }
    }
}

/// Registration information for a [Component].
#[derive(Clone, Debug)]
pub struct Registration {
    blueprint: Blueprint,
    singleton: bool,
    profiles: Vec<String>,
    settings: FxHashMap<String, String>,
    aliases: Vec<Alias>,
}

impl Registration {
    /// Creates a singleton registration, eligible for all profiles.
    pub fn component<C: Component + ComponentDowncast<C>>() -> Self {
        Self::from_blueprint(Blueprint::of::<C>())
    }

    pub fn from_blueprint(blueprint: Blueprint) -> Self {
        Self {
            blueprint,
            singleton: true,
            profiles: vec![],
            settings: Default::default(),
            aliases: vec![],
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

    /// Reads given field from the value store using `key`. Takes precedence over setting keys
    /// declared on the field itself.
    pub fn setting(mut self, field: impl Into<String>, key: impl Into<String>) -> Self {
        self.settings.insert(field.into(), key.into());
        self
    }

    /// Exposes the component as `S`, typically a `dyn Trait`.
    pub fn exposing<S: ComponentDowncast<C> + ?Sized, C: Component>(self) -> Self {
        self.alias(Alias::of::<S, C>())
    }

    pub fn alias(mut self, alias: Alias) -> Self {
        self.aliases.push(alias);
        self
    }

    #[inline]
    pub fn key(&self) -> TypeKey {
        self.blueprint.key
    }

    #[inline]
    pub fn profile_list(&self) -> &[String] {
        &self.profiles
    }

    /// All types this registration would be injectable as.
    pub fn exposed_types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        [self.blueprint.key]
            .into_iter()
            .chain(self.aliases.iter().map(|alias| alias.key))
    }
}

/// A [Component] registered in a [ComponentRegistry].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RegisteredComponent {
    blueprint: Blueprint,
    singleton: bool,
    profiles: Vec<String>,
    settings: FxHashMap<String, String>,
    exposed: Vec<Alias>,
    #[derivative(Debug = "ignore")]
    cached_instance: Option<AnyInstancePtr>,
}

impl RegisteredComponent {
    /// Checks if this component can be injected as `key` for the active `profile`.
    pub fn matches(&self, key: TypeKey, profile: Option<&str>) -> bool {
        profile_matches(&self.profiles, profile) && self.exposes(key)
    }

    pub fn exposes(&self, key: TypeKey) -> bool {
        self.exposed.iter().any(|alias| alias.key == key)
    }

    /// Returns the cast function for injecting this component as `key`.
    pub fn cast_for(&self, key: TypeKey) -> Option<CastFunction> {
        self.exposed
            .iter()
            .find(|alias| alias.key == key)
            .map(|alias| alias.cast)
    }

    /// Returns the registration-level setting key for given field.
    pub fn setting(&self, field: &str) -> Option<&str> {
        self.settings.get(field).map(String::as_str)
    }

    #[inline]
    pub fn key(&self) -> TypeKey {
        self.blueprint.key
    }

    #[inline]
    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    #[inline]
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    #[inline]
    pub fn cached_instance(&self) -> Option<AnyInstancePtr> {
        self.cached_instance.clone()
    }

    /// Stores the instance if this component is a singleton. Storing twice is an error.
    pub(crate) fn store_instance(&mut self, instance: AnyInstancePtr) -> Result<(), AssemblyError> {
        if !self.singleton {
            return Ok(());
        }

        if self.cached_instance.is_some() {
            return Err(AssemblyError::SingletonAlreadyCached(
                self.blueprint.key.type_name().to_string(),
            ));
        }

        debug!(component = self.blueprint.key.type_name(), profiles = ?self.profiles, "Caching singleton instance.");

        self.cached_instance = Some(instance);
        Ok(())
    }
}

/// Registry of components, preserving registration order.
#[derive(Default, Debug)]
pub struct ComponentRegistry {
    components: Vec<RegisteredComponent>,
    // exposed type -> indices of exposing components
    index: FxHashMap<TypeKey, Vec<usize>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry containing all statically declared components.
    pub fn from_static() -> Result<Self, ComponentRegistryError> {
        let mut registry = Self::new();
        for registration in Self::static_registrations() {
            registry.register(registration)?;
        }

        Ok(registry)
    }

    /// Collects statically declared components with their aliases, ordered by descending priority
    /// and then by type name. Aliases of components which are not statically declared are skipped.
    pub fn static_registrations() -> Vec<Registration> {
        let aliases: Vec<StaticAliasDefinition> = inventory::iter::<AliasRegisterer>
            .into_iter()
            .map(|registerer| (registerer.register)())
            .collect_vec();

        inventory::iter::<ComponentDefinitionRegisterer>
            .into_iter()
            .map(|registerer| (registerer.register)())
            .sorted_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.blueprint.key.type_name().cmp(b.blueprint.key.type_name()))
            })
            .map(|definition: StaticComponentDefinition| {
                let registration = Registration::from_blueprint(definition.blueprint)
                    .singleton(definition.singleton)
                    .profiles(definition.profiles.iter().copied());

                aliases
                    .iter()
                    .filter(|alias| alias.alias.target == definition.blueprint.key)
                    .fold(registration, |registration, alias| {
                        registration.alias(alias.alias)
                    })
            })
            .collect()
    }

    /// Returns the profile for which registering `registration` would collide with an existing
    /// component, if any. Only the concrete component type is considered.
    pub fn find_conflict(&self, key: TypeKey, profiles: &[String]) -> Option<Option<String>> {
        find_conflict(profiles, |profile| {
            self.matching_indices(key, profile).next().is_some()
        })
    }

    /// Adds a new component. Fails if the component type is already registered without a profile
    /// or for any of the requested profiles.
    pub fn register(&mut self, registration: Registration) -> Result<(), ComponentRegistryError> {
        let key = registration.key();

        if let Some(alias) = registration
            .aliases
            .iter()
            .find(|alias| alias.target != key)
        {
            return Err(ComponentRegistryError::AliasTargetMismatch {
                alias_type: alias.key.type_name().to_string(),
                target_type: alias.target.type_name().to_string(),
                registered_type: key.type_name().to_string(),
            });
        }

        if let Some(profile) = self.find_conflict(key, &registration.profiles) {
            return Err(ComponentRegistryError::DuplicateRegistration {
                type_name: key.type_name().to_string(),
                profile,
            });
        }

        debug!(component = key.type_name(), singleton = registration.singleton, profiles = ?registration.profiles, "Registering component.");

        let exposed = [Alias {
            key,
            target: key,
            cast: registration.blueprint.cast,
        }]
        .into_iter()
        .chain(registration.aliases)
        .unique_by(|alias| alias.key)
        .collect_vec();

        let position = self.components.len();
        for alias in &exposed {
            self.index.entry(alias.key).or_default().push(position);
        }

        self.components.push(RegisteredComponent {
            blueprint: registration.blueprint,
            singleton: registration.singleton,
            profiles: registration.profiles,
            settings: registration.settings,
            exposed,
            cached_instance: None,
        });

        Ok(())
    }

    fn matching_indices<'a>(
        &'a self,
        key: TypeKey,
        profile: Option<&'a str>,
    ) -> impl Iterator<Item = usize> + 'a {
        self.index
            .get(&key)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |index| profile_matches(&self.components[*index].profiles, profile))
    }

    /// Returns the single component eligible as `key` for `profile`, failing if there's more than
    /// one.
    pub fn lookup(&self, key: TypeKey, profile: Option<&str>) -> Result<Option<usize>, AssemblyError> {
        let candidates = self.lookup_all(key, profile);
        match candidates.as_slice() {
            [] => Ok(None),
            [index] => Ok(Some(*index)),
            _ => Err(AssemblyError::AmbiguousDependency {
                type_name: key.type_name().to_string(),
                profile: profile.map(str::to_string),
                candidates: candidates
                    .iter()
                    .map(|index| self.components[*index].key().type_name().to_string())
                    .collect(),
            }),
        }
    }

    /// Returns all components eligible as `key` for `profile` in registration order.
    pub fn lookup_all(&self, key: TypeKey, profile: Option<&str>) -> Vec<usize> {
        self.matching_indices(key, profile).collect()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&RegisteredComponent> {
        self.components.get(index)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut RegisteredComponent> {
        self.components.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredComponent> {
        self.components.iter()
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::component::Blueprint;
    use crate::component_registry::Alias;
    use inventory::collect;
    pub use inventory::submit;

    #[derive(Clone)]
    pub struct StaticComponentDefinition {
        pub blueprint: Blueprint,
        pub singleton: bool,
        pub profiles: &'static [&'static str],
        pub priority: i8,
    }

    pub struct ComponentDefinitionRegisterer {
        pub register: fn() -> StaticComponentDefinition,
    }

    #[derive(Clone)]
    pub struct StaticAliasDefinition {
        pub alias: Alias,
    }

    pub struct AliasRegisterer {
        pub register: fn() -> StaticAliasDefinition,
    }

    collect!(ComponentDefinitionRegisterer);
    collect!(AliasRegisterer);
}

#[cfg(test)]
mod tests {
    use crate::component_registry::{profile_matches, ComponentRegistry, Registration};
    use crate::descriptor::TypeKey;
    use crate::error::{AssemblyError, ComponentRegistryError};
    use crate::instance_provider::InstancePtr;
    use crate::test_components::{OtherComponent, TestComponent, TestTrait};

    type TestTraitPtr = dyn TestTrait + Send + Sync;

    #[test]
    fn should_match_profiles() {
        let profiles = vec!["test".to_string(), "dev".to_string()];

        assert!(profile_matches(&[], None));
        assert!(profile_matches(&[], Some("prod")));
        assert!(profile_matches(&profiles, Some("dev")));
        assert!(!profile_matches(&profiles, Some("prod")));
        assert!(!profile_matches(&profiles, None));
    }

    #[test]
    fn should_register_component() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Registration::component::<TestComponent>().exposing::<TestTraitPtr, TestComponent>())
            .unwrap();

        let index = registry
            .lookup(TypeKey::of::<TestTraitPtr>(), None)
            .unwrap()
            .unwrap();
        let component = registry.get(index).unwrap();

        assert_eq!(component.key(), TypeKey::of::<TestComponent>());
        assert!(component.is_singleton());
        assert!(component
            .cast_for(TypeKey::of::<TestTraitPtr>())
            .is_some());
        assert!(registry
            .lookup(TypeKey::of::<OtherComponent>(), None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn should_reject_duplicate_unscoped_registration() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Registration::component::<TestComponent>())
            .unwrap();

        assert_eq!(
            registry
                .register(Registration::component::<TestComponent>().profiles(["prod"]))
                .unwrap_err(),
            ComponentRegistryError::DuplicateRegistration {
                type_name: TypeKey::of::<TestComponent>().type_name().to_string(),
                profile: None,
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_reject_overlapping_profiles() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Registration::component::<TestComponent>().profiles(["test", "dev"]))
            .unwrap();
        registry
            .register(Registration::component::<TestComponent>().profiles(["prod"]))
            .unwrap();

        assert_eq!(
            registry
                .register(Registration::component::<TestComponent>().profiles(["qa", "dev"]))
                .unwrap_err(),
            ComponentRegistryError::DuplicateRegistration {
                type_name: TypeKey::of::<TestComponent>().type_name().to_string(),
                profile: Some("dev".to_string()),
            }
        );
    }

    #[test]
    fn should_filter_by_profile() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(
                Registration::component::<TestComponent>()
                    .profiles(["prod"])
                    .exposing::<TestTraitPtr, TestComponent>(),
            )
            .unwrap();
        registry
            .register(
                Registration::component::<OtherComponent>()
                    .profiles(["test", "dev"])
                    .exposing::<TestTraitPtr, OtherComponent>(),
            )
            .unwrap();

        let key = TypeKey::of::<TestTraitPtr>();
        let lookup = |profile| {
            registry
                .lookup(key, profile)
                .unwrap()
                .map(|index| registry.get(index).unwrap().key())
        };

        assert_eq!(lookup(Some("prod")), Some(TypeKey::of::<TestComponent>()));
        assert_eq!(lookup(Some("test")), Some(TypeKey::of::<OtherComponent>()));
        assert_eq!(lookup(Some("dev")), Some(TypeKey::of::<OtherComponent>()));
        assert_eq!(lookup(Some("unknown")), None);
        assert_eq!(lookup(None), None);
    }

    #[test]
    fn should_detect_ambiguity() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Registration::component::<TestComponent>().exposing::<TestTraitPtr, TestComponent>())
            .unwrap();
        registry
            .register(Registration::component::<OtherComponent>().exposing::<TestTraitPtr, OtherComponent>())
            .unwrap();

        assert!(matches!(
            registry
                .lookup(TypeKey::of::<TestTraitPtr>(), None)
                .unwrap_err(),
            AssemblyError::AmbiguousDependency { candidates, .. } if candidates.len() == 2
        ));
        assert_eq!(
            registry.lookup_all(TypeKey::of::<TestTraitPtr>(), None),
            vec![0, 1]
        );
    }

    #[test]
    fn should_reject_mismatched_alias() {
        let mut registry = ComponentRegistry::new();

        assert!(matches!(
            registry
                .register(
                    Registration::component::<TestComponent>()
                        .exposing::<TestTraitPtr, OtherComponent>()
                )
                .unwrap_err(),
            ComponentRegistryError::AliasTargetMismatch { .. }
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn should_cache_singletons_once() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Registration::component::<TestComponent>())
            .unwrap();
        registry
            .register(Registration::component::<OtherComponent>().singleton(false))
            .unwrap();

        let singleton = registry.get_mut(0).unwrap();
        singleton
            .store_instance(InstancePtr::new(TestComponent { value: 1 }))
            .unwrap();
        assert!(singleton.cached_instance().is_some());
        assert!(matches!(
            singleton
                .store_instance(InstancePtr::new(TestComponent { value: 2 }))
                .unwrap_err(),
            AssemblyError::SingletonAlreadyCached(..)
        ));

        let prototype = registry.get_mut(1).unwrap();
        prototype
            .store_instance(InstancePtr::new(OtherComponent))
            .unwrap();
        assert!(prototype.cached_instance().is_none());
    }
}
