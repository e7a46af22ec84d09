//! Configuration primitives for the synet planner.
//!
//! Planner settings come from TOML files in two scopes: a global
//! `~/.synet/config.toml` and per-project `.synet/config.toml` files found
//! on the path from the filesystem root down to the working directory.
//! Scopes are folded innermost-last: a nearer file replaces the planner
//! section and extends the deployment and process-server tables of the
//! scopes above it. Turning the merged records into a catalog-backed
//! deployment group is the embedder's job; this crate only carries names.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs::home_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, ConfigError>;

/// The effective planner configuration after folding all scopes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SynetConfig {
    /// Limits and toggles for the transformation passes.
    pub planner: PlannerConfig,

    /// Deployments registered into the default deployment group.
    pub deployments: Vec<DeploymentRecord>,

    /// Process-server definitions, by name.
    pub process_servers: HashMap<String, ProcessServerConfig>,
}

/// Limits and toggles for the transformation passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Safety bound on merge-solver outer iterations. The solver reaches its
    /// fixed point long before; exceeding the bound is reported as an
    /// internal error.
    pub max_merge_passes: usize,

    /// Emit per-decision pass traces.
    pub trace_passes: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_merge_passes: 64,
            trace_passes: false,
        }
    }
}

/// One deployment made available by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRecord {
    /// Name of the hosting process server.
    pub process_server: String,

    /// Name of the deployment model.
    pub deployment: String,
}

/// Connection details of a process server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessServerConfig {
    /// Host the server runs on.
    pub host: Option<String>,

    /// Port the server listens on.
    pub port: Option<u16>,

    /// Arbitrary server options.
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// One configuration file's contents, before scope folding. Unlike the
/// merged view, a layer records whether its `[planner]` section was present
/// at all, so an inner file without one leaves the outer settings alone.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ConfigLayer {
    planner: Option<PlannerConfig>,
    deployments: Vec<DeploymentRecord>,
    process_servers: HashMap<String, ProcessServerConfig>,
}

impl ConfigLayer {
    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl SynetConfig {
    /// Loads a single configuration file, ignoring all scoping.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = SynetConfig::default();
        config.apply(ConfigLayer::read(path.as_ref())?);
        Ok(config)
    }

    /// Where the global configuration lives: `$HOME/.synet/config.toml`.
    pub fn global_path() -> Result<PathBuf> {
        match home_dir() {
            Some(home) => Ok(home.join(".synet").join("config.toml")),
            None => Err(ConfigError::HomeDirMissing),
        }
    }

    /// Loads the effective configuration for the current working directory.
    pub fn load_scoped() -> Result<Self> {
        let cwd = env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;
        Self::load_scoped_from(&cwd)
    }

    /// Loads the effective configuration for `dir`: the global file first,
    /// then every `.synet/config.toml` between the filesystem root and
    /// `dir`, nearest last. Missing files are skipped, unreadable or
    /// malformed ones fail the whole load.
    pub fn load_scoped_from(dir: &Path) -> Result<Self> {
        let mut config = SynetConfig::default();
        if let Ok(global) = Self::global_path() {
            if global.exists() {
                config.apply(ConfigLayer::read(&global)?);
            }
        }
        let mut project_files: Vec<PathBuf> = dir
            .ancestors()
            .map(|ancestor| ancestor.join(".synet").join("config.toml"))
            .filter(|candidate| candidate.exists())
            .collect();
        // ancestors() yields nearest-first; fold outermost-first instead so
        // the file closest to `dir` has the last word.
        project_files.reverse();
        for path in project_files {
            config.apply(ConfigLayer::read(&path)?);
        }
        Ok(config)
    }

    /// Folds one layer into the merged view. The layer's planner section,
    /// when present, replaces the current one; deployments accumulate
    /// without duplicates; process servers are overridden by name.
    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(planner) = layer.planner {
            self.planner = planner;
        }
        for record in layer.deployments {
            if !self.deployments.contains(&record) {
                self.deployments.push(record);
            }
        }
        for (name, server) in layer.process_servers {
            self.process_servers.insert(name, server);
        }
    }
}

/// Errors raised while loading synet configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}", path = .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid TOML: {source}", path = .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no home directory, cannot locate the global config")]
    HomeDirMissing,
}
