//! Loading of configuration values into a [ValueStore]. Values are read, in order of increasing
//! precedence, from:
//!
//! 1. configuration files in any format supported by the `config` crate (inferred from the file
//! extension) - nested tables are flattened with `_`, so `{"server": {"port": 80}}` becomes
//! `SERVER_PORT`
//! 2. environment variables prefixed with the application name and `_`, e.g. `MYAPP_SERVER_PORT`
//! for application `myapp` - the prefix is matched case-insensitively by
//! [Environment]
//! 3. command line arguments in the form of `--key=value`
//!
//! ```no_run
//! use autowire::config::ConfigLoader;
//! use autowire::value_store::ValueStore;
//!
//! let mut values = ValueStore::new();
//! ConfigLoader::new("myapp")
//!     .load(&mut values, &["config/base.toml", "config/local.json"])
//!     .unwrap();
//! ```

use crate::error::ConfigLoadError;
use crate::value_store::{ScalarValue, ValueStore};
use config::{Config, Environment, File, Map, Source, Value, ValueKind};
#[cfg(test)]
use mockall::automock;
use std::path::Path;
use tracing::{debug, info};

/// Source of environment variables and command line arguments.
#[cfg_attr(test, automock)]
pub trait ConfigSource {
    /// Returns environment variables to use in place of the process environment, or `None` to
    /// read the process environment.
    fn environment_variables(&self) -> Option<Map<String, String>>;

    /// Returns command line arguments, excluding the program name.
    fn arguments(&self) -> Vec<String>;
}

/// [ConfigSource] reading from the current process. Arguments which are not valid unicode are
/// skipped.
#[derive(Clone, Copy, Default, Debug)]
pub struct SystemConfigSource;

impl ConfigSource for SystemConfigSource {
    fn environment_variables(&self) -> Option<Map<String, String>> {
        None
    }

    fn arguments(&self) -> Vec<String> {
        std::env::args_os()
            .skip(1)
            .filter_map(|argument| argument.into_string().ok())
            .collect()
    }
}

/// Loads configuration for a given application name.
#[derive(Clone, Debug)]
pub struct ConfigLoader<S = SystemConfigSource> {
    app_name: String,
    source: S,
}

impl ConfigLoader {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::with_source(app_name, SystemConfigSource)
    }
}

impl<S: ConfigSource> ConfigLoader<S> {
    pub fn with_source(app_name: impl Into<String>, source: S) -> Self {
        Self {
            app_name: app_name.into(),
            source,
        }
    }

    /// Merges files, environment variables and arguments into the store, overwriting existing
    /// values. Later files take precedence over earlier ones. Nothing is written if any file or the
    /// environment fails to load.
    pub fn load<P: AsRef<Path>>(
        &self,
        values: &mut ValueStore,
        file_paths: &[P],
    ) -> Result<(), ConfigLoadError> {
        let file_values = file_paths
            .iter()
            .map(|path| load_file(path.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let environment_values = self.load_environment()?;

        for file_values in file_values {
            values.merge(file_values);
        }

        info!(
            app_name = %self.app_name,
            count = environment_values.len(),
            "Loaded configuration from environment."
        );

        values.merge(environment_values);

        let argument_values = self
            .source
            .arguments()
            .iter()
            .filter_map(|argument| parse_argument(argument))
            .collect::<Vec<_>>();

        info!(
            count = argument_values.len(),
            "Loaded configuration from command line."
        );

        values.merge(argument_values);
        Ok(())
    }

    fn load_environment(&self) -> Result<Vec<(String, String)>, ConfigLoadError> {
        Environment::with_prefix(&self.app_name.to_uppercase())
            .prefix_separator("_")
            .source(self.source.environment_variables())
            .collect()
            .map_err(ConfigLoadError::Environment)?
            .into_iter()
            // a variable named exactly like the prefix leaves an empty key
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| {
                value
                    .into_string()
                    .map(|value| (key.to_uppercase(), value))
                    .map_err(ConfigLoadError::Environment)
            })
            .collect()
    }
}

fn parse_argument(argument: &str) -> Option<(String, String)> {
    let (key, value) = argument.strip_prefix("--")?.split_once('=')?;
    let key = key.trim_start_matches('-').trim();
    if key.is_empty() {
        return None;
    }

    Some((key.to_uppercase(), value.trim().to_string()))
}

fn load_file(path: &Path) -> Result<Vec<(String, ScalarValue)>, ConfigLoadError> {
    let table = Config::builder()
        .add_source(File::from(path))
        .build()
        .and_then(|config| config.try_deserialize::<Map<String, Value>>())
        .map_err(|source| ConfigLoadError::File {
            path: path.to_path_buf(),
            source,
        })?;

    let mut values = vec![];
    flatten_table(path, None, table, &mut values)?;

    info!(path = %path.display(), count = values.len(), "Loaded configuration file.");

    Ok(values)
}

fn flatten_table(
    path: &Path,
    prefix: Option<&str>,
    table: Map<String, Value>,
    output: &mut Vec<(String, ScalarValue)>,
) -> Result<(), ConfigLoadError> {
    for (key, value) in table {
        let key = match prefix {
            Some(prefix) => format!("{prefix}_{key}"),
            None => key,
        };

        let scalar = match value.kind {
            ValueKind::Table(table) => {
                flatten_table(path, Some(&key), table, output)?;
                continue;
            }
            ValueKind::Boolean(value) => ScalarValue::Bool(value),
            ValueKind::I64(value) => ScalarValue::Int(value),
            ValueKind::Float(value) => ScalarValue::Float(value),
            ValueKind::String(value) => ScalarValue::String(value),
            ValueKind::Array(_) => {
                return Err(ConfigLoadError::UnsupportedValue {
                    path: path.to_path_buf(),
                    key,
                })
            }
            // wide integers need to fit in i64
            kind => match Value::new(None, kind).into_int() {
                Ok(value) => ScalarValue::Int(value),
                Err(_) => {
                    return Err(ConfigLoadError::UnsupportedValue {
                        path: path.to_path_buf(),
                        key,
                    })
                }
            },
        };

        debug!(key = %key, "Read configuration value.");
        output.push((key.to_uppercase(), scalar));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::{parse_argument, ConfigLoader, MockConfigSource};
    use crate::error::ConfigLoadError;
    use crate::value_store::{ScalarValue, ValueStore};
    use config::Map;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn source(environment: Vec<(&str, &str)>, arguments: Vec<&str>) -> MockConfigSource {
        let environment: Map<String, String> = environment
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let arguments: Vec<String> = arguments.into_iter().map(str::to_string).collect();

        let mut source = MockConfigSource::new();
        source
            .expect_environment_variables()
            .return_const(Some(environment));
        source.expect_arguments().return_const(arguments);
        source
    }

    #[test]
    fn should_parse_arguments() {
        assert_eq!(
            parse_argument("--server_port = 80 "),
            Some(("SERVER_PORT".to_string(), "80".to_string()))
        );
        assert_eq!(
            parse_argument("--url=http://host/?a=b"),
            Some(("URL".to_string(), "http://host/?a=b".to_string()))
        );
        assert_eq!(parse_argument("--verbose"), None);
        assert_eq!(parse_argument("key=value"), None);
        assert_eq!(parse_argument("--=value"), None);
        assert_eq!(
            parse_argument("---debug=on"),
            Some(("DEBUG".to_string(), "on".to_string()))
        );
        assert_eq!(parse_argument("---=value"), None);
    }

    #[test]
    fn should_apply_precedence() {
        let file = config_file(".json", r#"{"value": 1, "file_only": true}"#);
        let loader = ConfigLoader::with_source(
            "app",
            source(
                vec![("APP_VALUE", "2"), ("APP_ENV_ONLY", "env")],
                vec!["--value=3"],
            ),
        );

        let mut values = ValueStore::new();
        loader.load(&mut values, &[file.path()]).unwrap();

        assert_eq!(values.value::<i64>("", "value").unwrap(), 3);
        assert_eq!(values.value::<bool>("", "file_only").unwrap(), true);
        assert_eq!(values.value::<String>("", "env_only").unwrap(), "env");
    }

    #[test]
    fn should_strip_environment_prefix() {
        let loader = ConfigLoader::with_source(
            "myapp",
            source(
                vec![
                    ("MYAPP_server_port", "80"),
                    ("myapp_DEBUG", "on"),
                    ("MYAPP_", "empty"),
                    ("OTHER_PORT", "90"),
                    ("MYAPPPORT", "1"),
                ],
                vec![],
            ),
        );

        let mut values = ValueStore::new();
        loader.load::<PathBuf>(&mut values, &[]).unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(
            values.get("DEBUG"),
            Some(&ScalarValue::String("on".to_string()))
        );
        assert_eq!(
            values.get("SERVER_PORT"),
            Some(&ScalarValue::String("80".to_string()))
        );
    }

    #[test]
    fn should_flatten_tables() {
        let file = config_file(
            ".toml",
            "timeout = 1.5\n[server]\nhost = \"localhost\"\n[server.tls]\nenabled = false\n",
        );
        let loader = ConfigLoader::with_source("app", source(vec![], vec![]));

        let mut values = ValueStore::new();
        loader.load(&mut values, &[file.path()]).unwrap();

        assert_eq!(values.get("TIMEOUT"), Some(&ScalarValue::Float(1.5)));
        assert_eq!(
            values.get("SERVER_HOST"),
            Some(&ScalarValue::String("localhost".to_string()))
        );
        assert_eq!(values.get("SERVER_TLS_ENABLED"), Some(&ScalarValue::Bool(false)));
    }

    #[test]
    fn should_overwrite_earlier_files() {
        let first = config_file(".json", r#"{"value": 1, "other": 5}"#);
        let second = config_file(".json", r#"{"value": 2}"#);
        let loader = ConfigLoader::with_source("app", source(vec![], vec![]));

        let mut values = ValueStore::new();
        loader
            .load(&mut values, &[first.path(), second.path()])
            .unwrap();

        assert_eq!(values.value::<i64>("", "value").unwrap(), 2);
        assert_eq!(values.value::<i64>("", "other").unwrap(), 5);
    }

    #[test]
    fn should_name_path_on_parse_error() {
        let file = config_file(".json", "{ not json");
        let loader = ConfigLoader::with_source("app", source(vec![], vec![]));

        let mut values = ValueStore::new();
        values.add_value("", "kept", 1).unwrap();

        match loader.load(&mut values, &[file.path()]).unwrap_err() {
            ConfigLoadError::File { path, .. } => assert_eq!(path, file.path()),
            error => panic!("Unexpected error: {error}"),
        }
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn should_reject_arrays() {
        let file = config_file(".json", r#"{"hosts": ["a", "b"]}"#);
        let loader = ConfigLoader::with_source("app", source(vec![], vec![]));

        let mut values = ValueStore::new();

        assert!(matches!(
            loader.load(&mut values, &[file.path()]).unwrap_err(),
            ConfigLoadError::UnsupportedValue { key, .. } if key == "hosts"
        ));
    }
}
