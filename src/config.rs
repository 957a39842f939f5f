use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::Path, path::PathBuf};

pub const CONFIG_FILE_NAME: &str = "manyleb-ide.json";

/// Settings for the language server and CLI.
///
/// Read from the LSP `initializationOptions` or from a `manyleb-ide.json`
/// file. Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub formatter: FormatterConfig,
    /// Run the formatter on `textDocument/didSave`.
    pub format_on_save: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatterConfig {
    pub command: String,
    /// Arguments placed before the file path.
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            command: "manyleb".to_string(),
            args: vec!["format".to_string()],
            timeout_secs: 10,
        }
    }
}

impl FormatterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load a config from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Find and load manyleb-ide.json in `start_dir` or its parents
    pub fn find_and_load<P: AsRef<Path>>(start_dir: P) -> Result<Self, ConfigError> {
        let path = Self::find(start_dir).ok_or(ConfigError::NotFound)?;
        Self::load(path)
    }

    pub fn find<P: AsRef<Path>>(start_dir: P) -> Option<PathBuf> {
        let mut current = start_dir.as_ref().to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Config from LSP initialization options. Missing options give the
    /// defaults.
    pub fn from_initialization_options(options: Option<serde_json::Value>) -> Result<Self, ConfigError> {
        match options {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => {
                serde_json::from_value(value).map_err(|e| ConfigError::ParseError(e.to_string()))
            }
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    NotFound,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::NotFound => write!(f, "{} not found", CONFIG_FILE_NAME),
        }
    }
}

impl std::error::Error for ConfigError {}

impl miette::Diagnostic for ConfigError {
    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            ConfigError::ParseError(_) => Some(Box::new(
                "expected e.g. {\"formatter\": {\"command\": \"manyleb\", \"args\": [\"format\"]}}",
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse() {
        let config_json = r#"{
            "formatter": { "command": "/opt/bin/manyleb", "timeoutSecs": 3 },
            "formatOnSave": true
        }"#;

        let config: Config = serde_json::from_str(config_json).unwrap();
        assert_eq!(config.formatter.command, "/opt/bin/manyleb");
        assert_eq!(config.formatter.args, vec!["format".to_string()]);
        assert_eq!(config.formatter.timeout(), Duration::from_secs(3));
        assert!(config.format_on_save);
    }

    #[test]
    fn test_empty_object_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_initialization_options() {
        assert_eq!(Config::from_initialization_options(None).unwrap(), Config::default());
        assert_eq!(
            Config::from_initialization_options(Some(serde_json::Value::Null)).unwrap(),
            Config::default()
        );

        let options = serde_json::json!({ "formatter": { "args": ["fmt"] } });
        let config = Config::from_initialization_options(Some(options)).unwrap();
        assert_eq!(config.formatter.args, vec!["fmt".to_string()]);

        let bad = serde_json::json!({ "formatOnSave": "yes" });
        assert!(matches!(
            Config::from_initialization_options(Some(bad)),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("api").join("v1");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "formatOnSave": true }"#).unwrap();

        let config = Config::find_and_load(&nested).unwrap();
        assert!(config.format_on_save);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
