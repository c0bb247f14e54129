//! Core type definitions for the formula

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// An external library or tool the formula builds against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub build_only: bool,
    /// Resolved install prefix (the `opt` link of the dependency)
    #[serde(default)]
    pub install_prefix: Option<PathBuf>,
}

impl DependencySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            build_only: false,
            install_prefix: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn build_only(mut self) -> Self {
        self.build_only = true;
        self
    }

    pub fn at(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.install_prefix = Some(prefix.into());
        self
    }

    /// A dependency counts as installed once its prefix exists on disk
    pub fn is_installed(&self) -> bool {
        self.install_prefix
            .as_deref()
            .map(Path::exists)
            .unwrap_or(false)
    }

    /// `lib` directory under the install prefix
    pub fn lib_dir(&self) -> Option<PathBuf> {
        self.install_prefix.as_ref().map(|p| p.join("lib"))
    }
}

/// Dependencies handed to the resolver, already resolved by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    specs: Vec<DependencySpec>,
}

impl Dependencies {
    pub fn new(specs: Vec<DependencySpec>) -> Self {
        Self { specs }
    }

    /// Add or replace a dependency by name
    pub fn insert(&mut self, spec: DependencySpec) {
        match self.specs.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DependencySpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn prefix(&self, name: &str) -> Option<&Path> {
        self.get(name).and_then(|s| s.install_prefix.as_deref())
    }

    /// Prefix of a dependency that must be present
    pub fn require(&self, name: &str) -> Result<&Path> {
        self.prefix(name)
            .ok_or_else(|| Error::MissingDependency(name.to_string()))
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.get(name).map(DependencySpec::is_installed).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencySpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<DependencySpec> for Dependencies {
    fn from_iter<I: IntoIterator<Item = DependencySpec>>(iter: I) -> Self {
        let mut deps = Dependencies::default();
        for spec in iter {
            deps.insert(spec);
        }
        deps
    }
}

/// A compiler front end. Variant order is the canonical configure order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    C,
    Cxx,
    Fortran,
    Java,
    Objc,
    ObjCxx,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "c++",
            Language::Fortran => "fortran",
            Language::Java => "java",
            Language::Objc => "objc",
            Language::ObjCxx => "obj-c++",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Languages to enable, always iterated in canonical order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSet(BTreeSet<Language>);

impl LanguageSet {
    /// C, C++, Objective-C and Objective-C++ are always built
    pub fn base() -> Self {
        Self(
            [Language::C, Language::Cxx, Language::Objc, Language::ObjCxx]
                .into_iter()
                .collect(),
        )
    }

    /// Everything except Ada, which needs an existing Ada compiler to bootstrap
    pub fn all() -> Self {
        let mut set = Self::base();
        set.insert(Language::Fortran);
        set.insert(Language::Java);
        set
    }

    pub fn insert(&mut self, language: Language) {
        self.0.insert(language);
    }

    pub fn contains(&self, language: Language) -> bool {
        self.0.contains(&language)
    }

    pub fn iter(&self) -> impl Iterator<Item = Language> + '_ {
        self.0.iter().copied()
    }

    /// Comma-joined value for `--enable-languages`
    pub fn joined(&self) -> String {
        self.iter().map(|l| l.name()).collect::<Vec<_>>().join(",")
    }
}

/// Resolved multilib variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultilibPolicy {
    Enabled,
    Disabled,
}

impl MultilibPolicy {
    pub fn flag(&self) -> &'static str {
        match self {
            MultilibPolicy::Enabled => "--enable-multilib",
            MultilibPolicy::Disabled => "--disable-multilib",
        }
    }
}

/// Ordered arguments for the configure script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentList(Vec<String>);

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }

    pub fn extend<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(args.into_iter().map(Into::into));
    }

    pub fn contains(&self, arg: &str) -> bool {
        self.0.iter().any(|a| a == arg)
    }

    /// First argument starting with `prefix`
    pub fn find(&self, prefix: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|a| a.starts_with(prefix))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
