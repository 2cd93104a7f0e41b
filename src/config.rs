use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_BASENAME: &str = "virustotal.conf";
const GLOBAL_CONFIG_PATH: &str = "/etc/virustotal.conf";
const API_KEY_FIELD: &str = "API_KEY";
const MAX_API_KEY_LEN: usize = 65;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file found (searched {searched:?})")]
    NoConfigFile { searched: Vec<PathBuf> },
    #[error("failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed line {line} in config file {path:?}: expected KEY=VALUE")]
    Malformed { path: PathBuf, line: usize },
    #[error("failed to parse TOML config at {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config file {path:?} has no API_KEY entry")]
    MissingKey { path: PathBuf },
    #[error("you specified no API key in the config {path:?}")]
    EmptyKey { path: PathBuf },
    #[error("the API key is not valid")]
    InvalidKey,
    #[error("you didn't specify a valid VirusTotal API key")]
    NoApiKey,
}

/// Parsed `KEY = VALUE` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TomlConfig {
    #[serde(default, alias = "API_KEY")]
    api_key: Option<String>,
}

impl ConfigFile {
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
            return Self::parse_toml(path, contents);
        }
        let mut entries = BTreeMap::new();
        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                if line == API_KEY_FIELD {
                    return Err(ConfigError::EmptyKey {
                        path: path.to_path_buf(),
                    });
                }
                return Err(ConfigError::Malformed {
                    path: path.to_path_buf(),
                    line: index + 1,
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Malformed {
                    path: path.to_path_buf(),
                    line: index + 1,
                });
            }
            entries.insert(key.to_string(), unquote(value.trim()).to_string());
        }
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    fn parse_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        let mut entries = BTreeMap::new();
        if let Some(key) = parsed.api_key {
            entries.insert(API_KEY_FIELD.to_string(), key);
        }
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the validated `API_KEY` value.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let value = self.get(API_KEY_FIELD).ok_or_else(|| ConfigError::MissingKey {
            path: self.path.clone(),
        })?;
        if value.is_empty() {
            return Err(ConfigError::EmptyKey {
                path: self.path.clone(),
            });
        }
        validate_api_key(value)?;
        Ok(value.to_string())
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// VirusTotal keys are hexadecimal strings; anything longer than
/// [`MAX_API_KEY_LEN`] or containing non-hex characters is rejected.
pub fn validate_api_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty()
        || key.len() > MAX_API_KEY_LEN
        || !key.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(ConfigError::InvalidKey);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    search_paths: Vec<PathBuf>,
}

impl ConfigManager {
    /// Uses `explicit` alone when given, otherwise the per-user config
    /// directory followed by the system-wide file.
    pub fn new(explicit: Option<PathBuf>) -> Self {
        if let Some(path) = explicit {
            return Self::with_search_paths(vec![path]);
        }
        let mut search_paths = Vec::new();
        if let Some(project_dirs) = ProjectDirs::from("", "", "virustotal") {
            search_paths.push(project_dirs.config_dir().join(CONFIG_FILE_BASENAME));
        }
        search_paths.push(PathBuf::from(GLOBAL_CONFIG_PATH));
        Self::with_search_paths(search_paths)
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn locate(&self) -> Option<&Path> {
        self.search_paths
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.is_file())
    }

    pub fn load(&self) -> Result<ConfigFile, ConfigError> {
        let path = self.locate().ok_or_else(|| ConfigError::NoConfigFile {
            searched: self.search_paths.clone(),
        })?;
        log::debug!("loading configuration from {:?}", path);
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ConfigFile::parse(path, &contents)
    }

    /// Prefers a non-empty `--key` value and falls back to the config file.
    pub fn resolve_api_key(&self, flag: Option<&str>) -> Result<String, ConfigError> {
        match flag.map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => {
                let config = self.load()?;
                log::debug!("using API key from {:?}", config.path());
                config.api_key()
            }
        }
    }
}
