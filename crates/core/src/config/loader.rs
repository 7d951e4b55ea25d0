//! Configuration loader
//!
//! Reads a [`CommandsFile`] from disk so commands can be declared in bulk
//! with [`CommandRegistry::declare_all`](crate::command::registry::CommandRegistry::declare_all).
//!
//! ## Loading Strategy
//! 1. If `BULWARK_CONFIG` is set, load exactly that file
//! 2. Otherwise probe the standard locations
//! 3. Format is chosen by extension (`.toml` or `.json`)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./bulwark.toml`, `./bulwark.json`
//! 2. `./config/bulwark.toml`, `./config/bulwark.json`

use std::path::{Path, PathBuf};

use super::{CommandsFile, ConfigError, ConfigResult};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "BULWARK_CONFIG";

/// Load command declarations, honoring `BULWARK_CONFIG` before probing.
///
/// # Errors
/// Returns `ConfigError` if no file can be found, read or parsed, or if any
/// declared command fails validation.
pub fn load() -> ConfigResult<CommandsFile> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => {
            tracing::info!(env = CONFIG_ENV_VAR, path = %path, "Using configuration from environment");
            load_from_file(Some(PathBuf::from(path)))
        }
        _ => {
            tracing::debug!(env = CONFIG_ENV_VAR, "Not set, probing standard locations");
            load_from_file(None)
        }
    }
}

/// Load command declarations from a file
///
/// If `path` is `None`, probes the standard locations with
/// [`probe_config_paths`].
///
/// # Errors
/// Returns `ConfigError` if the file is missing, unreadable, malformed or
/// declares an invalid command.
pub fn load_from_file(path: Option<PathBuf>) -> ConfigResult<CommandsFile> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::invalid(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ConfigError::invalid("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading command configuration from file");

    let contents = std::fs::read_to_string(&config_path)?;
    parse_config(&contents, &config_path)
}

/// Parse command declarations from string content
///
/// Format is detected by file extension: `.toml` is read as TOML, `.json`
/// or no extension as JSON, and any other extension is rejected. Every
/// declared command is validated.
///
/// # Errors
/// Returns `ConfigError::Parse` for malformed documents and
/// `ConfigError::Invalid` for commands that fail validation.
pub fn parse_config(contents: &str, path: &Path) -> ConfigResult<CommandsFile> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let file: CommandsFile = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConfigError::Parse { format: "TOML", message: e.to_string() })?,
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigError::Parse { format: "JSON", message: e.to_string() })?,
        other => {
            return Err(ConfigError::invalid(format!("Unsupported config format: {other}")));
        }
    };

    for (key, declaration) in &file.commands {
        declaration.config.validate().map_err(|e| {
            ConfigError::invalid(format!("command '{key}': {e}"))
        })?;
    }

    tracing::debug!(commands = file.commands.len(), "Parsed command configuration");
    Ok(file)
}

/// Probe the standard paths for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    probe_in(&cwd)
}

fn probe_in(root: &Path) -> Option<PathBuf> {
    let candidates = [
        root.join("bulwark.toml"),
        root.join("bulwark.json"),
        root.join("config").join("bulwark.toml"),
        root.join("config").join("bulwark.json"),
    ];

    for candidate in candidates {
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "Found config file");
            return Some(candidate);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const TOML_DOC: &str = r#"
        [commands.inventory]
        group = "warehouse"
        executionTimeoutInMilliseconds = 250
        circuitBreakerRequestVolumeThreshold = 5

        [commands.pricing]
        group = "catalog"
    "#;

    #[test]
    fn test_parse_toml() {
        let file = parse_config(TOML_DOC, Path::new("bulwark.toml")).expect("Should parse TOML");

        assert_eq!(file.commands.len(), 2);
        let inventory = &file.commands["inventory"];
        assert_eq!(inventory.group, "warehouse");
        assert_eq!(inventory.config.execution_timeout, Duration::from_millis(250));
        assert_eq!(inventory.config.circuit_breaker_request_volume_threshold, 5);
        assert_eq!(file.commands["pricing"].config.execution_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"commands": {"search": {"group": "catalog", "executionTimeoutInMilliseconds": 0}}}"#;
        let file = parse_config(json, Path::new("bulwark.json")).expect("Should parse JSON");
        assert_eq!(file.commands["search"].config.execution_timeout, Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        let result = parse_config("[commands", Path::new("bulwark.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { format: "TOML", .. })));
    }

    #[test]
    fn test_parse_rejects_invalid_command() {
        let doc = r#"
            [commands.broken]
            group = "g"
            metricsRollingStatisticalWindowBuckets = 0
        "#;
        let err = parse_config(doc, Path::new("bulwark.toml")).expect_err("Should reject");
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_parse_rejects_unknown_extension() {
        let result = parse_config("", Path::new("bulwark.yaml"));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        assert!(result.expect_err("yaml").to_string().contains("Unsupported config format: yaml"));
    }

    #[test]
    fn test_parse_without_extension_reads_json() {
        let file = parse_config(r#"{"commands":{}}"#, Path::new("bulwark")).expect("Should parse JSON");
        assert!(file.commands.is_empty());
    }

    #[test]
    fn test_probe_prefers_root_then_config_dir() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        assert!(probe_in(dir.path()).is_none());

        std::fs::create_dir(dir.path().join("config")).expect("Should create config dir");
        std::fs::write(dir.path().join("config").join("bulwark.json"), "{}")
            .expect("Should write file");
        assert_eq!(probe_in(dir.path()), Some(dir.path().join("config").join("bulwark.json")));

        std::fs::write(dir.path().join("bulwark.toml"), "").expect("Should write file");
        assert_eq!(probe_in(dir.path()), Some(dir.path().join("bulwark.toml")));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/bulwark.toml")));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
