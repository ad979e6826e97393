//! The `.mntrbt` configuration document.
//!
//! A single JSON object, located by walking up from the working directory.
//! Keys are addressed with dotted paths (`browser.headless`).

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{FacturaError, Result};
use crate::page::WaitPolicy;

/// File names searched for, in order, in each directory.
pub const CONFIG_NAMES: [&str; 2] = [".mntrbt", ".mntrbt.json"];

/// Where `save` writes when no file was found.
const DEFAULT_NAME: &str = ".mntrbt.json";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    document: Value,
}

impl ConfigStore {
    /// Find the config file starting at the working directory.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| FacturaError::Config {
            reason: format!("cannot read working directory: {e}"),
        })?;
        Self::discover_from(&cwd)
    }

    /// Walk from `start` up to the filesystem root, then try the home
    /// directory. Falls back to an empty document saved under `start`.
    pub fn discover_from(start: &Path) -> Result<Self> {
        let found = start
            .ancestors()
            .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
            .or_else(|| {
                dirs::home_dir()
                    .map(|home| home.join(DEFAULT_NAME))
                    .filter(|candidate| candidate.is_file())
            });

        match found {
            Some(path) => Self::open(&path),
            None => {
                debug!(dir = %start.display(), "no config file found");
                Ok(Self {
                    path: start.join(DEFAULT_NAME),
                    document: Value::Object(Map::new()),
                })
            }
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| FacturaError::Config {
            reason: format!("cannot open {}: {e}", path.display()),
        })?;
        let document: Value =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| FacturaError::Config {
                reason: format!("{} is not valid JSON: {e}", path.display()),
            })?;
        if !document.is_object() {
            return Err(FacturaError::Config {
                reason: format!("{} must contain a JSON object", path.display()),
            });
        }

        debug!(path = %path.display(), "loaded config");
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.document, |node, part| node.as_object()?.get(part))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Set `key`, creating intermediate objects. Intermediate values that
    /// are not objects are replaced.
    pub fn set(&mut self, key: &str, value: Value) {
        let mut parts: Vec<&str> = key.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };

        let mut node = &mut self.document;
        for part in parts {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Value::Object(map) = node else {
                return;
            };
            node = map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        if let Value::Object(map) = node {
            map.insert(last.to_string(), value);
        }
    }

    pub fn save(&self) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| FacturaError::Config {
                reason: format!("cannot write {}: {e}", self.path.display()),
            })?;

        serde_json::to_writer_pretty(file, &self.document).map_err(|e| FacturaError::Config {
            reason: format!("cannot write {}: {e}", self.path.display()),
        })
    }
}

/// `configure` values: booleans stay booleans, anything else is a string.
/// Identifiers like CUITs must not turn into numbers.
pub fn parse_cli_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

/// Typed view over the keys the invoice flow understands.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub cuit: Option<String>,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub keep_alive_interval: Duration,
    pub wait_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cuit: None,
            headless: true,
            chrome_path: None,
            keep_alive_interval: Duration::from_secs(30),
            wait_timeout: WaitPolicy::default().timeout,
        }
    }
}

impl Settings {
    pub fn from_store(store: &ConfigStore) -> Self {
        let defaults = Self::default();
        let secs = |key: &str| store.get(key).and_then(Value::as_u64).map(Duration::from_secs);

        Self {
            cuit: store.get("cuit").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            headless: store
                .get("browser.headless")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.headless),
            chrome_path: store.get_str("browser.path").map(PathBuf::from),
            keep_alive_interval: secs("keepAlive.intervalSecs")
                .unwrap_or(defaults.keep_alive_interval),
            wait_timeout: secs("wait.timeoutSecs").unwrap_or(defaults.wait_timeout),
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: self.wait_timeout,
            ..WaitPolicy::default()
        }
    }
}
