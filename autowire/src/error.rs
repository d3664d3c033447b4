use crate::instance_provider::ErrorPtr;
use crate::value_store::ValueKind;
use std::path::PathBuf;
use thiserror::Error;

fn profile_suffix(profile: &Option<String>) -> String {
    profile
        .as_ref()
        .map(|profile| format!(" for profile \"{profile}\""))
        .unwrap_or_default()
}

/// Errors related to assembling instances.
#[derive(Error, Clone, Debug)]
pub enum AssemblyError {
    #[error("Ambiguous dependency {type_name}{} - candidates: {}", profile_suffix(.profile), .candidates.join(", "))]
    AmbiguousDependency {
        type_name: String,
        profile: Option<String>,
        candidates: Vec<String>,
    },
    #[error("Multiple factories available for {type_name}{}", profile_suffix(.profile))]
    MultipleFactoriesForType {
        type_name: String,
        profile: Option<String>,
    },
    #[error("Parameter '{parameter}' of {owner} needs a type annotation.")]
    MissingTypeAnnotation { parameter: String, owner: String },
    #[error("Parameter '{parameter}' of {owner} is not defined in value store. Provide it using key: {key} or a static setting key.")]
    MissingValue {
        parameter: String,
        owner: String,
        key: String,
    },
    #[error("Error injecting value with key: {key}. Expected type: {expected:?} but '{found}' was given.")]
    TypeConversion {
        key: String,
        expected: ValueKind,
        found: String,
    },
    #[error("Dependency cycle detected: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },
    #[error("Parameter '{parameter}' of {owner} is not bound and has no default.")]
    UnboundParameter { parameter: String, owner: String },
    #[error("Argument '{parameter}' does not match any parameter of {owner}.")]
    UnexpectedArgument { parameter: String, owner: String },
    #[error("Argument '{parameter}' has an incompatible type for {owner}.")]
    IncompatibleArgument { parameter: String, owner: String },
    #[error("Cannot assemble {0} - it's neither registered nor constructible.")]
    UnresolvableTarget(String),
    #[error("Tried to cast component to incompatible type: {0}")]
    IncompatibleComponent(String),
    #[error("Factory for {type_name} failed: {error}")]
    FactoryError { type_name: String, error: ErrorPtr },
    #[error("Constructor of {type_name} failed: {error}")]
    ConstructorError { type_name: String, error: ErrorPtr },
    #[error("Singleton instance of {0} is already cached.")]
    SingletonAlreadyCached(String),
}

/// Error related to component and factory registries.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ComponentRegistryError {
    #[error("{type_name} already registered{}", profile_suffix(.profile))]
    DuplicateRegistration {
        type_name: String,
        profile: Option<String>,
    },
    #[error("Cannot expose {alias_type} for {registered_type} - the alias targets {target_type}")]
    AliasTargetMismatch {
        alias_type: String,
        target_type: String,
        registered_type: String,
    },
}

/// Errors related to the value store.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum ValueStoreError {
    #[error("Duplicate value: {section}.{key} (stored as {flat_key})")]
    DuplicateValue {
        section: String,
        key: String,
        flat_key: String,
    },
    #[error("Missing value: {key}")]
    MissingValue { key: String },
    #[error("Error reading value with key: {key}. Expected type: {expected:?} but '{found}' was given.")]
    TypeConversion {
        key: String,
        expected: ValueKind,
        found: String,
    },
}

/// Errors related to loading configuration into the value store.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Error loading configuration file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },
    #[error("Unsupported value for key {key} in configuration file {}", .path.display())]
    UnsupportedValue { path: PathBuf, key: String },
    #[error("Error loading configuration from environment: {0}")]
    Environment(#[source] config::ConfigError),
}
