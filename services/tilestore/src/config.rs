//! Cascading local configuration.
//!
//! Settings come from a list of YAML files read in order; keys in later files
//! override the same keys in earlier ones, and missing files are skipped.
//! Supports environment variable substitution using ${VAR} syntax.
//!
//! ```yaml
//! catalog:
//!   hostname: db.example.org
//!   port: 5432
//!   database: datacube
//! locations:
//!   ls7_ortho: file:///g/data/ls7_ortho
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an extra configuration file.
pub const CONFIG_ENV_VAR: &str = "TILESTORE_CONFIG";

/// Files searched by [`LocalConfig::find_default`], lowest precedence first.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["/etc/tilestore.yaml", "~/.tilestore.yaml"];

pub const DEFAULT_DATABASE: &str = "datacube";
pub const DEFAULT_PORT: u16 = 5432;

// ============================================================================
// Effective Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub hostname: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            username: None,
        }
    }
}

/// Merged configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    pub catalog: CatalogConfig,
    /// Named storage locations (usually URIs).
    pub locations: BTreeMap<String, String>,
    /// Files that contributed, in read order.
    #[serde(skip)]
    pub files_loaded: Vec<PathBuf>,
}

// ============================================================================
// File Layout
// ============================================================================

/// One configuration file; every key optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    catalog: CatalogSection,
    locations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CatalogSection {
    hostname: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    username: Option<String>,
}

// ============================================================================
// Loading Functions
// ============================================================================

impl LocalConfig {
    /// Read `paths` in order, later files overriding earlier keys.
    ///
    /// An empty list yields the defaults.
    pub fn find<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut config = Self::default();
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                debug!(path = %path.display(), "Config file not found, skipping");
                continue;
            }
            let file = load_config_file(path)?;
            config.merge(file);
            config.files_loaded.push(path.to_path_buf());
            debug!(path = %path.display(), "Loaded config file");
        }
        Ok(config)
    }

    /// Read the default search path: system file, `$TILESTORE_CONFIG`, user file.
    pub fn find_default() -> Result<Self> {
        Self::find(&default_config_paths())
    }

    fn merge(&mut self, file: ConfigFile) {
        let catalog = file.catalog;
        if let Some(hostname) = catalog.hostname {
            self.catalog.hostname = hostname;
        }
        if let Some(port) = catalog.port {
            self.catalog.port = port;
        }
        if let Some(database) = catalog.database {
            self.catalog.database = database;
        }
        if let Some(username) = catalog.username {
            self.catalog.username = Some(username);
        }
        self.locations.extend(file.locations);
    }

    /// Resolve a named storage location.
    pub fn location(&self, name: &str) -> Option<&str> {
        self.locations.get(name).map(String::as_str)
    }
}

/// Default configuration files, lowest precedence first, with `~` expanded.
pub fn default_config_paths() -> Vec<PathBuf> {
    let [system, user] = DEFAULT_CONFIG_PATHS;
    let mut paths = vec![PathBuf::from(system)];
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            paths.push(PathBuf::from(shellexpand::tilde(&path).into_owned()));
        }
    }
    paths.push(PathBuf::from(shellexpand::tilde(user).into_owned()));
    paths
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;

    let expanded = expand_env_vars(&content)?;
    if expanded.trim().is_empty() {
        return Ok(ConfigFile::default());
    }

    let file: ConfigFile = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse config from {:?}", path))?;

    validate_config_file(&file, path)?;

    Ok(file)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
pub fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            let value = resolve_var_expr(&var_expr)?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_config_file(file: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(port) = file.catalog.port {
        anyhow::ensure!(port > 0, "{:?}: catalog port must be greater than 0", path);
    }
    if let Some(database) = &file.catalog.database {
        anyhow::ensure!(
            !database.is_empty(),
            "{:?}: catalog database cannot be empty",
            path
        );
    }
    for (name, location) in &file.locations {
        anyhow::ensure!(
            !location.is_empty(),
            "{:?}: location '{}' cannot be empty",
            path,
            name
        );
    }
    Ok(())
}
