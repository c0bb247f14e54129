//! GCC 4.8 formula metadata
//!
//! Source location, declared dependencies and host compilers the bootstrap is
//! known to fail with.

use crate::host::{HostProfile, MacOsVersion};
use crate::options::{BuildOption, BuildOptions};
use crate::types::DependencySpec;
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// When a declared dependency applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyCondition {
    Always,
    /// Only when the option is enabled
    Option(BuildOption),
    /// Only when java is built, directly or through all languages
    Java,
    /// Only on macOS hosts older than the given release
    MacOsOlderThan(MacOsVersion),
}

impl DependencyCondition {
    pub fn applies(&self, host: &HostProfile, options: &BuildOptions) -> bool {
        match self {
            DependencyCondition::Always => true,
            DependencyCondition::Option(option) => options.is_enabled(*option),
            DependencyCondition::Java => options.java_enabled(),
            DependencyCondition::MacOsOlderThan(version) => {
                host.is_macos() && host.macos_older_than(*version)
            }
        }
    }
}

/// Dependency as declared by the formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredDependency {
    pub name: &'static str,
    pub optional: bool,
    pub build_only: bool,
    pub condition: DependencyCondition,
}

fn dep(name: &'static str) -> DeclaredDependency {
    DeclaredDependency {
        name,
        optional: false,
        build_only: false,
        condition: DependencyCondition::Always,
    }
}

/// Package metadata for the formula
#[derive(Debug, Clone, Serialize)]
pub struct Formula {
    pub name: &'static str,
    pub version: &'static str,
    pub homepage: &'static str,
    pub url: &'static str,
    pub mirror: &'static str,
    pub sha1: &'static str,
    pub head: &'static str,
    pub bug_url: &'static str,
    pub dependencies: Vec<DeclaredDependency>,
    /// Host compilers that cannot bootstrap this GCC
    pub fails_with: Vec<&'static str>,
}

impl Default for Formula {
    fn default() -> Self {
        Self::gcc48()
    }
}

impl Formula {
    pub fn gcc48() -> Self {
        Self {
            name: "gcc48",
            version: "4.8.4",
            homepage: "https://gcc.gnu.org",
            url: "http://ftpmirror.gnu.org/gcc/gcc-4.8.4/gcc-4.8.4.tar.bz2",
            mirror: "ftp://gcc.gnu.org/pub/gcc/releases/gcc-4.8.4/gcc-4.8.4.tar.bz2",
            sha1: "40867a9ac74a054b1cee855988fd680cabf42006",
            head: "svn://gcc.gnu.org/svn/gcc/branches/gcc-4_8-branch",
            bug_url: "https://github.com/Homebrew/homebrew-versions/issues",
            dependencies: vec![
                DeclaredDependency {
                    condition: DependencyCondition::Option(BuildOption::WithGlibc),
                    ..dep("binutils")
                },
                DeclaredDependency {
                    optional: true,
                    condition: DependencyCondition::Option(BuildOption::WithGlibc),
                    ..dep("glibc")
                },
                dep("gmp"),
                dep("libmpc"),
                dep("mpfr"),
                dep("cloog"),
                dep("isl"),
                DeclaredDependency {
                    condition: DependencyCondition::Java,
                    ..dep("ecj")
                },
                // Tiger's assembler cannot handle the PPC asm in libitm
                DeclaredDependency {
                    build_only: true,
                    condition: DependencyCondition::MacOsOlderThan(MacOsVersion::Leopard),
                    ..dep("cctools")
                },
            ],
            fails_with: vec!["gcc-4.0", "llvm"],
        }
    }

    /// `major.minor` used to namespace installed files, e.g. `4.8`
    pub fn version_suffix(&self) -> Result<String> {
        version_suffix(self.version)
    }

    /// Dependencies that apply to this host and option set, without prefixes
    pub fn applicable_dependencies(
        &self,
        host: &HostProfile,
        options: &BuildOptions,
    ) -> Vec<DependencySpec> {
        self.dependencies
            .iter()
            .filter(|d| d.condition.applies(host, options))
            .map(|d| DependencySpec {
                name: d.name.to_string(),
                optional: d.optional,
                build_only: d.build_only,
                install_prefix: None,
            })
            .collect()
    }

    /// Abort if `compiler` is known to break the bootstrap
    pub fn check_compiler(&self, compiler: &str) -> Result<()> {
        let name = std::path::Path::new(compiler)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| compiler.to_string());

        if self.fails_with.iter().any(|f| name == *f || name.starts_with(&format!("{}-", f))) {
            return Err(Error::IncompatibleCompiler(name));
        }
        Ok(())
    }
}

/// First `digit.digit` run in `version`
pub fn version_suffix(version: &str) -> Result<String> {
    let re = Regex::new(r"\d\.\d").map_err(|e| Error::Other(e.to_string()))?;
    re.find(version)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::Other(format!("no major.minor in version {}", version)))
}
