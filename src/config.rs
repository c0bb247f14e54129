//! Formula configuration

use crate::formula::Formula;
use crate::host::{FixedProbe, HostProbe, HostProfile, SystemProbe};
use crate::options::BuildOptions;
use crate::resolver::Layout;
use crate::types::{Dependencies, DependencySpec};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gcc48-formula/formula.toml";

/// Main configuration for a formula run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package manager prefix (HOMEBREW_PREFIX)
    pub brew_prefix: PathBuf,
    /// Keg prefix; defaults to `<brew_prefix>/Cellar/<name>/<version>`
    pub prefix: Option<PathBuf>,
    /// LDFLAGS forwarded to the static bootstrap link
    pub ldflags: String,
    /// Host C compiler; falls back to `CC`
    pub host_compiler: Option<String>,
    /// Explicit path to make
    pub make_path: Option<PathBuf>,
    /// Build options by name
    pub options: BTreeMap<String, bool>,
    /// Dependency prefixes by formula name
    pub dependencies: BTreeMap<String, DependencyEntry>,
    /// Host facts to use instead of probing
    pub host: Option<HostProfile>,
}

/// Per-dependency configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub prefix: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brew_prefix: default_brew_prefix(),
            prefix: None,
            ldflags: std::env::var("LDFLAGS").unwrap_or_default(),
            host_compiler: None,
            make_path: None,
            options: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            host: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::ConfigError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Host facts from configuration, or from the running system
    pub fn probe(&self) -> Box<dyn HostProbe> {
        match self.host {
            Some(ref host) => Box::new(FixedProbe(host.clone())),
            None => Box::new(SystemProbe),
        }
    }

    pub fn build_options(&self) -> Result<BuildOptions> {
        BuildOptions::from_map(&self.options)
    }

    pub fn keg_prefix(&self, formula: &Formula) -> PathBuf {
        self.prefix.clone().unwrap_or_else(|| {
            self.brew_prefix
                .join("Cellar")
                .join(formula.name)
                .join(formula.version)
        })
    }

    pub fn layout(&self, formula: &Formula) -> Layout {
        Layout {
            prefix: self.keg_prefix(formula),
            brew_prefix: self.brew_prefix.clone(),
            ldflags: self.ldflags.clone(),
        }
    }

    /// `opt` link of an installed formula
    pub fn opt_prefix(&self, name: &str) -> PathBuf {
        self.brew_prefix.join("opt").join(name)
    }

    /// Resolve the prefixes of every dependency that applies to this build.
    ///
    /// Configured prefixes win; otherwise the `opt` link is used when it
    /// exists. Unresolved dependencies keep no prefix and are reported by the
    /// resolver. glibc is always looked up since the specs override depends on
    /// whether it is installed, not on whether this build uses it.
    pub fn resolve_dependencies(
        &self,
        formula: &Formula,
        host: &HostProfile,
        options: &BuildOptions,
    ) -> Dependencies {
        let mut specs = formula.applicable_dependencies(host, options);
        if !specs.iter().any(|s| s.name == "glibc") {
            specs.push(DependencySpec::new("glibc").optional());
        }

        specs
            .into_iter()
            .map(|mut spec| {
                spec.install_prefix = match self.dependencies.get(&spec.name) {
                    Some(entry) => Some(entry.prefix.clone()),
                    None => {
                        let opt = self.opt_prefix(&spec.name);
                        opt.exists().then_some(opt)
                    }
                };
                spec
            })
            .collect()
    }

    /// Compiler that will bootstrap GCC, if known
    pub fn host_compiler(&self) -> Option<String> {
        self.host_compiler
            .clone()
            .or_else(|| std::env::var("CC").ok())
            .filter(|cc| !cc.is_empty())
    }
}

fn default_brew_prefix() -> PathBuf {
    if let Ok(prefix) = std::env::var("HOMEBREW_PREFIX") {
        return PathBuf::from(prefix);
    }

    #[cfg(target_os = "linux")]
    return PathBuf::from("/home/linuxbrew/.linuxbrew");

    #[cfg(not(target_os = "linux"))]
    return PathBuf::from("/usr/local");
}
