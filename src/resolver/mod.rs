//! Configure argument resolution
//!
//! Turns host facts, build options and resolved dependencies into the
//! language set, the multilib policy and the argument list handed to
//! `configure`. The arguments come from an ordered table of independent
//! policy rules (see [`rules`]); each rule only ever adds flags, and the
//! either/or pairs are decided inside a single rule so they cannot conflict.

pub mod rules;

use crate::formula::Formula;
use crate::host::HostProfile;
use crate::options::{BuildOption, BuildOptions};
use crate::types::{ArgumentList, Dependencies, Language, LanguageSet, MultilibPolicy};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Install locations the arguments point at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Keg prefix the formula installs into
    pub prefix: PathBuf,
    /// Package manager prefix shared by all formulae
    pub brew_prefix: PathBuf,
    /// Extra linker flags forwarded to the bootstrap
    #[serde(default)]
    pub ldflags: String,
}

impl Layout {
    pub fn new(prefix: impl Into<PathBuf>, brew_prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            brew_prefix: brew_prefix.into(),
            ldflags: String::new(),
        }
    }

    pub fn bin(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    pub fn lib(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    pub fn man7(&self) -> PathBuf {
        self.prefix.join("share/man/man7")
    }

    pub fn info(&self) -> PathBuf {
        self.prefix.join("share/info")
    }
}

/// Everything a policy rule may look at
#[derive(Debug)]
pub struct ResolveContext<'a> {
    pub formula: &'a Formula,
    pub host: &'a HostProfile,
    pub options: &'a BuildOptions,
    pub deps: &'a Dependencies,
    pub layout: &'a Layout,
    pub version_suffix: String,
    pub languages: LanguageSet,
    pub multilib: MultilibPolicy,
}

impl ResolveContext<'_> {
    pub fn prefix(&self) -> &Path {
        &self.layout.prefix
    }
}

/// Output of argument resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub languages: LanguageSet,
    pub multilib: MultilibPolicy,
    pub version_suffix: String,
    pub args: ArgumentList,
}

impl Resolution {
    pub fn java_enabled(&self) -> bool {
        self.languages.contains(Language::Java)
    }
}

/// Languages to build.
///
/// All-languages mode wins over the individual language options.
pub fn resolve_languages(options: &BuildOptions) -> LanguageSet {
    if options.is_enabled(BuildOption::EnableAllLanguages) {
        return LanguageSet::all();
    }

    let mut languages = LanguageSet::base();
    if options.is_enabled(BuildOption::EnableFortran) {
        languages.insert(Language::Fortran);
    }
    if options.is_enabled(BuildOption::EnableJava) {
        languages.insert(Language::Java);
    }
    languages
}

/// Multilib is off unless selected and the host prefers 64-bit builds
pub fn resolve_multilib(host: &HostProfile, options: &BuildOptions) -> MultilibPolicy {
    if !options.multilib_selected(host) || !host.prefers_64bit {
        MultilibPolicy::Disabled
    } else {
        MultilibPolicy::Enabled
    }
}

/// Resolve the configure arguments for one build
pub fn resolve(
    formula: &Formula,
    host: &HostProfile,
    options: &BuildOptions,
    deps: &Dependencies,
    layout: &Layout,
) -> Result<Resolution> {
    let ctx = ResolveContext {
        formula,
        host,
        options,
        deps,
        layout,
        version_suffix: formula.version_suffix()?,
        languages: resolve_languages(options),
        multilib: resolve_multilib(host, options),
    };

    let mut args = ArgumentList::new();
    for (name, rule) in rules::RULES {
        if let Some(flags) = rule(&ctx)? {
            debug!("Rule {} added {:?}", name, flags);
            args.extend(flags);
        }
    }

    info!(
        "Resolved {} configure arguments (languages: {}, multilib: {:?})",
        args.len(),
        ctx.languages.joined(),
        ctx.multilib
    );

    Ok(Resolution {
        languages: ctx.languages,
        multilib: ctx.multilib,
        version_suffix: ctx.version_suffix,
        args,
    })
}
