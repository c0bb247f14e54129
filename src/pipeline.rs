//! Build pipeline
//!
//! Runs one install from an unpacked source tree: resolve arguments, patch
//! the source, configure, bootstrap, install, then apply the rewrite plan.
//! Stages run strictly in order and the first failure aborts the run; there
//! is no resume, the caller starts over from a fresh source tree.

use crate::formula::Formula;
use crate::host::{HostProfile, MacOsVersion};
use crate::options::{BuildOption, BuildOptions};
use crate::resolver::{self, Layout, Resolution};
use crate::rewrite::{RewriteOutcome, RewritePlan, SpecsPolicy, SpecsWriter};
use crate::runner::{BuildEnv, CommandRunner, CommandSpec};
use crate::types::Dependencies;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Makefile fragment that hardcodes the libgcc_s install name
const SLIBGCC_DARWIN: &str = "libgcc/config/t-slibgcc-darwin";
const SLIBDIR_PLACEHOLDER: &str = "@shlib_slibdir@";

/// Target triple the alternate-libc runtime is installed under
const LINUX_TRIPLE: &str = "x86_64-unknown-linux-gnu";

/// Everything one install needs
pub struct Installer<'a> {
    pub formula: &'a Formula,
    pub host: &'a HostProfile,
    pub options: &'a BuildOptions,
    pub deps: &'a Dependencies,
    pub layout: &'a Layout,
    pub make: PathBuf,
    pub host_compiler: Option<String>,
    runner: &'a dyn CommandRunner,
}

/// Outcome of a completed install
#[derive(Debug)]
pub struct InstallReport {
    pub resolution: Resolution,
    pub rewrites: Vec<RewriteOutcome>,
}

impl<'a> Installer<'a> {
    pub fn new(
        formula: &'a Formula,
        host: &'a HostProfile,
        options: &'a BuildOptions,
        deps: &'a Dependencies,
        layout: &'a Layout,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            formula,
            host,
            options,
            deps,
            layout,
            make: PathBuf::from("make"),
            host_compiler: None,
            runner,
        }
    }

    pub fn with_make(mut self, make: impl Into<PathBuf>) -> Self {
        self.make = make.into();
        self
    }

    pub fn with_host_compiler(mut self, compiler: Option<String>) -> Self {
        self.host_compiler = compiler;
        self
    }

    /// Checks that must pass before any external process is started
    pub fn preflight(&self) -> Result<Resolution> {
        self.options.validate(self.host)?;
        if let Some(ref cc) = self.host_compiler {
            self.formula.check_compiler(cc)?;
        }
        resolver::resolve(self.formula, self.host, self.options, self.deps, self.layout)
    }

    /// Environment for configure and make
    pub fn build_env(&self) -> Result<BuildEnv> {
        // GCC fails to build when forced onto a particular linker
        let mut env = BuildEnv::default().remove("LD");

        if self.host.is_macos() && self.host.macos_older_than(MacOsVersion::Leopard) {
            let as_path = self.deps.require("cctools")?.join("bin/as");
            let as_path = as_path.display().to_string();
            env = env
                .set("AS", as_path.clone())
                .set("AS_FOR_TARGET", as_path);
        }

        Ok(env)
    }

    /// Point the libgcc_s install name at the shared versioned libdir
    pub fn patch_source(&self, source_dir: &Path, version_suffix: &str) -> Result<()> {
        let path = source_dir.join(SLIBGCC_DARWIN);
        let content = std::fs::read_to_string(&path).map_err(|e| Error::PatchFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if !content.contains(SLIBDIR_PLACEHOLDER) {
            return Err(Error::PatchFailed {
                path,
                message: format!("{} not found", SLIBDIR_PLACEHOLDER),
            });
        }

        let slibdir = self
            .layout
            .brew_prefix
            .join("lib/gcc")
            .join(version_suffix);
        std::fs::write(
            &path,
            content.replace(SLIBDIR_PLACEHOLDER, &slibdir.display().to_string()),
        )?;
        Ok(())
    }

    /// configure, bootstrap and install, in order
    pub fn build_commands(
        &self,
        resolution: &Resolution,
        source_dir: &Path,
        build_dir: &Path,
        env: &BuildEnv,
    ) -> Vec<CommandSpec> {
        let target = if self.options.is_enabled(BuildOption::EnableProfiledBuild) {
            "profiledbootstrap"
        } else {
            "bootstrap"
        };

        let make = |target: &str| {
            CommandSpec::new(&self.make)
                .arg(target)
                .current_dir(build_dir)
                .env(env.clone())
        };

        vec![
            CommandSpec::new(source_dir.join("configure"))
                .args(resolution.args.iter())
                .current_dir(build_dir)
                .env(env.clone()),
            make(target),
            make("install"),
        ]
    }

    /// The installed, suffixed gcc driver
    pub fn installed_compiler(&self, version_suffix: &str) -> PathBuf {
        self.layout.bin().join(format!("gcc-{}", version_suffix))
    }

    /// Specs override inputs, on Linux only
    pub fn specs_policy(&self) -> Option<SpecsPolicy> {
        if !self.host.is_linux() {
            return None;
        }

        let mut policy = SpecsPolicy::new(&self.layout.brew_prefix);
        if self.options.is_enabled(BuildOption::WithGlibc) {
            policy.runtime_lib_dir = Some(
                self.layout
                    .lib()
                    .join("gcc")
                    .join(LINUX_TRIPLE)
                    .join(self.formula.version),
            );
        }
        if self.deps.is_installed("glibc") {
            policy.libc_lib_dir = self.deps.get("glibc").and_then(|g| g.lib_dir());
        }
        Some(policy)
    }

    /// Run the whole pipeline against an unpacked source tree
    pub async fn install(&self, source_dir: &Path) -> Result<InstallReport> {
        let resolution = self.preflight()?;
        let env = self.build_env()?;

        info!("Patching {}", SLIBGCC_DARWIN);
        self.patch_source(source_dir, &resolution.version_suffix)?;

        // Removed when dropped, whether or not the build succeeds
        let build_dir = tempfile::Builder::new()
            .prefix("build")
            .tempdir_in(source_dir)?;

        for cmd in self.build_commands(&resolution, source_dir, build_dir.path(), &env) {
            self.runner.run(&cmd).await?.check(&cmd)?;
        }
        drop(build_dir);

        let plan = self.rewrite_plan(&resolution)?;
        info!("Applying {} post-install rewrites", plan.len());
        let rewrites = plan.apply(self.runner).await?;

        Ok(InstallReport {
            resolution,
            rewrites,
        })
    }

    /// Post-install rewrites for the keg, ending with the specs override
    pub fn rewrite_plan(&self, resolution: &Resolution) -> Result<RewritePlan> {
        let specs = self
            .specs_policy()
            .map(|policy| (self.installed_compiler(&resolution.version_suffix), policy));
        RewritePlan::scan(self.layout, resolution, specs)
    }

    /// Write the specs override for the installed compiler (Linux only)
    pub async fn post_install(&self, version_suffix: &str) -> Result<Option<PathBuf>> {
        let policy = match self.specs_policy() {
            Some(policy) => policy,
            None => return Ok(None),
        };

        let compiler = self.installed_compiler(version_suffix);
        if !compiler.exists() {
            warn!("{} is not installed", compiler.display());
        }

        let specs = SpecsWriter::new(self.runner, &compiler).write(&policy).await?;
        Ok(Some(specs))
    }
}
