//! User-selectable build options
//!
//! The option set is fixed. The multilib pair is gated on the host: macOS
//! hosts that prefer 64-bit builds offer `without-multilib`, every other
//! non-macOS host offers `with-multilib`, and 32-bit macOS hosts offer
//! neither.

use crate::host::HostProfile;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A recognized build option
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildOption {
    /// Build the gfortran compiler
    EnableFortran,
    /// Build the gcj compiler
    EnableJava,
    /// Every language except Ada
    EnableAllLanguages,
    /// Native language support
    EnableNls,
    /// Profile guided bootstrap
    EnableProfiledBuild,
    /// Build against the optional glibc dependency
    WithGlibc,
    /// Opt in to multilib (non-macOS hosts)
    WithMultilib,
    /// Opt out of multilib (64-bit macOS hosts)
    WithoutMultilib,
}

impl BuildOption {
    /// Get all options in declaration order
    pub fn all() -> Vec<BuildOption> {
        vec![
            BuildOption::EnableFortran,
            BuildOption::EnableJava,
            BuildOption::EnableAllLanguages,
            BuildOption::EnableNls,
            BuildOption::EnableProfiledBuild,
            BuildOption::WithGlibc,
            BuildOption::WithMultilib,
            BuildOption::WithoutMultilib,
        ]
    }

    /// Get the option name as written on the command line (without dashes)
    pub fn name(&self) -> &'static str {
        match self {
            BuildOption::EnableFortran => "enable-fortran",
            BuildOption::EnableJava => "enable-java",
            BuildOption::EnableAllLanguages => "enable-all-languages",
            BuildOption::EnableNls => "enable-nls",
            BuildOption::EnableProfiledBuild => "enable-profiled-build",
            BuildOption::WithGlibc => "with-glibc",
            BuildOption::WithMultilib => "with-multilib",
            BuildOption::WithoutMultilib => "without-multilib",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BuildOption::EnableFortran => "Build the gfortran compiler",
            BuildOption::EnableJava => "Build the gcj compiler",
            BuildOption::EnableAllLanguages => "Enable all compilers and languages, except Ada",
            BuildOption::EnableNls => "Build with native language support (localization)",
            BuildOption::EnableProfiledBuild => {
                "Make use of profile guided optimization when bootstrapping GCC"
            }
            BuildOption::WithGlibc => "Build with the glibc dependency",
            BuildOption::WithMultilib => "Build with multilib support",
            BuildOption::WithoutMultilib => "Build without multilib support",
        }
    }

    /// Parse an option name, with or without the leading `--`
    pub fn parse(s: &str) -> Option<BuildOption> {
        let s = s.trim().trim_start_matches("--");
        BuildOption::all().into_iter().find(|o| o.name() == s)
    }

    /// Whether the option is offered on `host`
    pub fn offered_on(&self, host: &HostProfile) -> bool {
        match self {
            BuildOption::WithMultilib => !host.is_macos(),
            BuildOption::WithoutMultilib => host.is_macos() && host.prefers_64bit,
            _ => true,
        }
    }
}

impl std::fmt::Display for BuildOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Options chosen by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    enabled: BTreeSet<BuildOption>,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a name → enabled mapping; unknown names are rejected
    pub fn from_map(map: &BTreeMap<String, bool>) -> Result<Self> {
        let mut options = Self::new();
        for (name, enabled) in map {
            let option = BuildOption::parse(name)
                .ok_or_else(|| Error::InvalidOption(name.clone()))?;
            if *enabled {
                options.enable(option);
            }
        }
        Ok(options)
    }

    /// Parse option names as given on the command line
    pub fn parse_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut options = Self::new();
        for name in names {
            let option = BuildOption::parse(name.as_ref())
                .ok_or_else(|| Error::InvalidOption(name.as_ref().to_string()))?;
            options.enable(option);
        }
        Ok(options)
    }

    pub fn with(mut self, option: BuildOption) -> Self {
        self.enable(option);
        self
    }

    pub fn enable(&mut self, option: BuildOption) {
        self.enabled.insert(option);
    }

    pub fn is_enabled(&self, option: BuildOption) -> bool {
        self.enabled.contains(&option)
    }

    /// Merge another set of options into this one
    pub fn extend(&mut self, other: &BuildOptions) {
        self.enabled.extend(other.enabled.iter().copied());
    }

    /// Reject options that the host does not offer
    pub fn validate(&self, host: &HostProfile) -> Result<()> {
        match self.enabled.iter().find(|o| !o.offered_on(host)) {
            Some(option) => Err(Error::InvalidOption(format!(
                "{} is not available on this host",
                option
            ))),
            None => Ok(()),
        }
    }

    /// Java is built either directly or as part of all languages
    pub fn java_enabled(&self) -> bool {
        self.is_enabled(BuildOption::EnableJava) || self.is_enabled(BuildOption::EnableAllLanguages)
    }

    /// Resolve whether multilib was selected for `host`.
    ///
    /// Follows the with/without pair offered on the host; when the host offers
    /// neither, multilib counts as not selected.
    pub fn multilib_selected(&self, host: &HostProfile) -> bool {
        if BuildOption::WithMultilib.offered_on(host) {
            self.is_enabled(BuildOption::WithMultilib)
        } else if BuildOption::WithoutMultilib.offered_on(host) {
            !self.is_enabled(BuildOption::WithoutMultilib)
        } else {
            false
        }
    }

    /// Enabled options formatted as flags, in declaration order
    pub fn used_options(&self) -> Vec<String> {
        self.enabled.iter().map(|o| format!("--{}", o.name())).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = BuildOption> + '_ {
        self.enabled.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CpuArch, MacOsVersion, OsFamily};

    fn host(os_family: OsFamily, prefers_64bit: bool) -> HostProfile {
        HostProfile {
            os_family,
            cpu_arch: CpuArch::Intel,
            prefers_64bit,
            os_major: "14.0.0".to_string(),
            macos_version: if os_family == OsFamily::Macos {
                Some(MacOsVersion::Yosemite)
            } else {
                None
            },
            has_command_line_tools: true,
            sdk_path: None,
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(BuildOption::parse("enable-fortran"), Some(BuildOption::EnableFortran));
        assert_eq!(BuildOption::parse("--with-glibc"), Some(BuildOption::WithGlibc));
        assert_eq!(BuildOption::parse("enable-ada"), None);
    }

    #[test]
    fn test_from_map_rejects_unknown() {
        let mut map = BTreeMap::new();
        map.insert("enable-ada".to_string(), true);
        assert!(matches!(BuildOptions::from_map(&map), Err(Error::InvalidOption(_))));
    }

    #[test]
    fn test_from_map_skips_disabled() {
        let mut map = BTreeMap::new();
        map.insert("enable-fortran".to_string(), true);
        map.insert("enable-java".to_string(), false);
        let options = BuildOptions::from_map(&map).unwrap();
        assert!(options.is_enabled(BuildOption::EnableFortran));
        assert!(!options.is_enabled(BuildOption::EnableJava));
    }

    #[test]
    fn test_multilib_gating() {
        let mac64 = host(OsFamily::Macos, true);
        let mac32 = host(OsFamily::Macos, false);
        let linux = host(OsFamily::Linux, true);

        assert!(BuildOption::WithoutMultilib.offered_on(&mac64));
        assert!(!BuildOption::WithMultilib.offered_on(&mac64));
        assert!(!BuildOption::WithoutMultilib.offered_on(&mac32));
        assert!(!BuildOption::WithMultilib.offered_on(&mac32));
        assert!(BuildOption::WithMultilib.offered_on(&linux));
        assert!(!BuildOption::WithoutMultilib.offered_on(&linux));
    }

    #[test]
    fn test_multilib_selected() {
        let mac64 = host(OsFamily::Macos, true);
        let linux = host(OsFamily::Linux, true);

        assert!(BuildOptions::new().multilib_selected(&mac64));
        assert!(!BuildOptions::new()
            .with(BuildOption::WithoutMultilib)
            .multilib_selected(&mac64));
        assert!(!BuildOptions::new().multilib_selected(&linux));
        assert!(BuildOptions::new()
            .with(BuildOption::WithMultilib)
            .multilib_selected(&linux));
        assert!(!BuildOptions::new().multilib_selected(&host(OsFamily::Macos, false)));
    }

    #[test]
    fn test_validate() {
        let linux = host(OsFamily::Linux, true);
        let options = BuildOptions::new().with(BuildOption::WithoutMultilib);
        assert!(matches!(options.validate(&linux), Err(Error::InvalidOption(_))));
        assert!(BuildOptions::new()
            .with(BuildOption::WithMultilib)
            .validate(&linux)
            .is_ok());
    }

    #[test]
    fn test_used_options() {
        let options = BuildOptions::new()
            .with(BuildOption::EnableNls)
            .with(BuildOption::EnableFortran);
        assert_eq!(options.used_options(), vec!["--enable-fortran", "--enable-nls"]);
    }
}
