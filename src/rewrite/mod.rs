//! Post-install rewriting
//!
//! After `make install` the keg contains files that collide with other GCC
//! installs. The rewrite plan renames them with the version suffix, removes
//! the info directory and, on Linux, appends a specs override for the
//! installed compiler. Every step can be re-run safely: renames of missing
//! files are skipped and already-suffixed files are left alone.

pub mod specs;

pub use specs::{SpecsPolicy, SpecsWriter};

use crate::resolver::{Layout, Resolution};
use crate::runner::CommandRunner;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Java runtime property files, relative to the keg's `lib`
const JAVA_CONFIG_FILES: &[&str] = &[
    "logging.properties",
    "security/classpath.security",
    "i386/logging.properties",
    "i386/security/classpath.security",
];

/// What to do with a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    /// Insert `-<suffix>` before the extension
    RenameWithSuffix(String),
    /// Remove the directory tree
    DeleteDirectory,
    /// Back up the compiler's default specs and append the override
    AppendSpecs(SpecsPolicy),
}

/// One planned step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteStep {
    pub path: PathBuf,
    pub transformation: Transformation,
}

/// Result of applying a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    Removed(PathBuf),
    SpecsWritten(PathBuf),
    /// Nothing to do; the source path does not exist
    Skipped(PathBuf),
}

/// Ordered post-install steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewritePlan {
    steps: Vec<RewriteStep>,
}

impl RewritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, transformation: Transformation) {
        self.steps.push(RewriteStep {
            path: path.into(),
            transformation,
        });
    }

    pub fn steps(&self) -> &[RewriteStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Plan the rewrites for an installed keg.
    ///
    /// `specs` is the compiler whose specs get overridden, if any.
    pub fn scan(
        layout: &Layout,
        resolution: &Resolution,
        specs: Option<(PathBuf, SpecsPolicy)>,
    ) -> Result<Self> {
        let suffix = &resolution.version_suffix;
        let mut plan = Self::new();

        for path in find_libiberty(&layout.prefix, suffix)? {
            plan.push(path, Transformation::RenameWithSuffix(suffix.clone()));
        }

        for path in find_man7(&layout.man7(), suffix)? {
            plan.push(path, Transformation::RenameWithSuffix(suffix.clone()));
        }

        // install-info still conflicts even with suffixed names
        plan.push(layout.info(), Transformation::DeleteDirectory);

        if resolution.java_enabled() {
            let lib = layout.lib();
            for file in JAVA_CONFIG_FILES {
                plan.push(lib.join(file), Transformation::RenameWithSuffix(suffix.clone()));
            }
        }

        if let Some((compiler, policy)) = specs {
            plan.push(compiler, Transformation::AppendSpecs(policy));
        }

        debug!("Planned {} rewrite steps", plan.len());
        Ok(plan)
    }

    /// Apply every step in order, stopping at the first error
    pub async fn apply(&self, runner: &dyn CommandRunner) -> Result<Vec<RewriteOutcome>> {
        let mut outcomes = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let outcome = match &step.transformation {
                Transformation::RenameWithSuffix(suffix) => add_suffix(&step.path, suffix)?,
                Transformation::DeleteDirectory => remove_tree(&step.path)?,
                Transformation::AppendSpecs(policy) => {
                    let specs = SpecsWriter::new(runner, &step.path).write(policy).await?;
                    RewriteOutcome::SpecsWritten(specs)
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

/// `dir/base.ext` → `dir/base-suffix.ext`
pub fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}-{}", stem, suffix),
    };

    path.with_file_name(name)
}

/// Rename `path` to its suffixed form; a missing path is skipped
pub fn add_suffix(path: &Path, suffix: &str) -> Result<RewriteOutcome> {
    if std::fs::symlink_metadata(path).is_err() {
        warn!("Not renaming {}: no such file", path.display());
        return Ok(RewriteOutcome::Skipped(path.to_path_buf()));
    }

    let target = suffixed_path(path, suffix);
    std::fs::rename(path, &target)?;
    debug!("Renamed {} -> {}", path.display(), target.display());

    Ok(RewriteOutcome::Renamed {
        from: path.to_path_buf(),
        to: target,
    })
}

/// Remove a directory tree; a missing directory is skipped
pub fn remove_tree(path: &Path) -> Result<RewriteOutcome> {
    if !path.exists() {
        return Ok(RewriteOutcome::Skipped(path.to_path_buf()));
    }

    std::fs::remove_dir_all(path)?;
    info!("Removed {}", path.display());
    Ok(RewriteOutcome::Removed(path.to_path_buf()))
}

fn already_suffixed(path: &Path, suffix: &str) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().ends_with(&format!("-{}", suffix)))
        .unwrap_or(false)
}

/// Every `libiberty.*` anywhere under `prefix`
fn find_libiberty(prefix: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !prefix.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(prefix).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let matches = entry.file_name().to_string_lossy().starts_with("libiberty.");
        if matches && !already_suffixed(entry.path(), suffix) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Every `*.7` page directly inside `man7`
fn find_man7(man7: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !man7.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(man7)? {
        let path = entry?.path();
        let is_page = path.extension().map(|e| e == "7").unwrap_or(false);
        if is_page && !already_suffixed(&path, suffix) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
