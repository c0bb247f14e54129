//! Host platform detection
//!
//! Collects the facts the argument resolver needs about the build machine:
//! operating system family, CPU type, 64-bit preference, kernel release and,
//! on macOS, the OS version, SDK location and whether the command-line tools
//! are installed.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Where the standalone command-line tools install their compiler
const CLT_CLANG: &str = "/Library/Developer/CommandLineTools/usr/bin/clang";

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Macos,
    Linux,
    Other,
}

impl OsFamily {
    /// Family of the OS this binary was compiled for
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => OsFamily::Macos,
            "linux" => OsFamily::Linux,
            _ => OsFamily::Other,
        }
    }
}

/// CPU family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuArch {
    Intel,
    Ppc,
    Other,
}

impl CpuArch {
    /// CPU family of the machine this binary was compiled for
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86" | "x86_64" => CpuArch::Intel,
            "powerpc" | "powerpc64" => CpuArch::Ppc,
            _ => CpuArch::Other,
        }
    }
}

/// macOS releases, ordered oldest to newest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacOsVersion {
    Tiger,
    Leopard,
    SnowLeopard,
    Lion,
    MountainLion,
    Mavericks,
    Yosemite,
    ElCapitan,
    Sierra,
    HighSierra,
    Mojave,
    Catalina,
    BigSurOrNewer,
}

impl MacOsVersion {
    /// Parse a product version such as `10.9.5`
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major: u32 = parts.next()?.parse().ok()?;
        let minor: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);

        if major >= 11 {
            return Some(MacOsVersion::BigSurOrNewer);
        }
        if major != 10 {
            return None;
        }

        match minor {
            0..=4 => Some(MacOsVersion::Tiger),
            5 => Some(MacOsVersion::Leopard),
            6 => Some(MacOsVersion::SnowLeopard),
            7 => Some(MacOsVersion::Lion),
            8 => Some(MacOsVersion::MountainLion),
            9 => Some(MacOsVersion::Mavericks),
            10 => Some(MacOsVersion::Yosemite),
            11 => Some(MacOsVersion::ElCapitan),
            12 => Some(MacOsVersion::Sierra),
            13 => Some(MacOsVersion::HighSierra),
            14 => Some(MacOsVersion::Mojave),
            15 => Some(MacOsVersion::Catalina),
            _ => Some(MacOsVersion::BigSurOrNewer),
        }
    }
}

/// Facts about the build host
///
/// Probed once at the start of an invocation and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    pub os_family: OsFamily,
    pub cpu_arch: CpuArch,
    pub prefers_64bit: bool,
    /// Kernel release as reported by `uname -r`; empty if it could not be read
    #[serde(default)]
    pub os_major: String,
    #[serde(default)]
    pub macos_version: Option<MacOsVersion>,
    #[serde(default)]
    pub has_command_line_tools: bool,
    #[serde(default)]
    pub sdk_path: Option<PathBuf>,
}

impl HostProfile {
    pub fn is_macos(&self) -> bool {
        self.os_family == OsFamily::Macos
    }

    pub fn is_linux(&self) -> bool {
        self.os_family == OsFamily::Linux
    }

    /// True when the host runs macOS older than `version`
    pub fn macos_older_than(&self, version: MacOsVersion) -> bool {
        self.macos_version.map(|v| v < version).unwrap_or(false)
    }

    /// True when the host runs macOS newer than `version`
    pub fn macos_newer_than(&self, version: MacOsVersion) -> bool {
        self.macos_version.map(|v| v > version).unwrap_or(false)
    }

    /// Architecture component of the darwin build triple
    pub fn build_arch(&self) -> Option<&'static str> {
        match (self.cpu_arch, self.prefers_64bit) {
            (CpuArch::Intel, true) => Some("x86_64"),
            (CpuArch::Intel, false) => Some("i686"),
            (CpuArch::Ppc, true) => Some("powerpc64"),
            (CpuArch::Ppc, false) => Some("powerpc"),
            (CpuArch::Other, _) => None,
        }
    }

    /// The `<arch>-apple-darwin<osmajor>` triple passed as `--build`.
    ///
    /// Fails when the architecture, the macOS release or the kernel release
    /// could not be determined.
    pub fn build_triple(&self) -> Result<String> {
        let arch = self.build_arch().ok_or_else(|| {
            Error::UnsupportedHost(format!(
                "cannot determine build architecture for {:?}",
                self.cpu_arch
            ))
        })?;

        if self.is_macos() && self.macos_version.is_none() {
            return Err(Error::UnsupportedHost("macOS version is unknown".to_string()));
        }

        if self.os_major.is_empty() {
            return Err(Error::UnsupportedHost(
                "kernel release is unknown".to_string(),
            ));
        }

        Ok(format!("{}-apple-darwin{}", arch, self.os_major))
    }
}

/// Source of host facts
pub trait HostProbe {
    fn probe(&self) -> Result<HostProfile>;
}

/// Probes the machine this process runs on
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn probe(&self) -> Result<HostProfile> {
        let os_family = OsFamily::current();
        let cpu_arch = CpuArch::current();
        let is_64bit = cfg!(target_pointer_width = "64");

        let os_major = match command_stdout("uname", &["-r"]) {
            Some(release) => release,
            None => {
                warn!("Could not read kernel release");
                String::new()
            }
        };

        let (macos_version, has_command_line_tools, sdk_path) = if os_family == OsFamily::Macos {
            let version = command_stdout("sw_vers", &["-productVersion"])
                .and_then(|v| MacOsVersion::parse(&v));
            let sdk = command_stdout("xcrun", &["--show-sdk-path"]).map(PathBuf::from);
            (version, Path::new(CLT_CLANG).exists(), sdk)
        } else {
            (None, false, None)
        };

        // 64-bit builds are only preferred on macOS after Leopard
        let prefers_64bit = match (os_family, macos_version) {
            (OsFamily::Macos, Some(v)) => is_64bit && v > MacOsVersion::Leopard,
            _ => is_64bit,
        };

        let profile = HostProfile {
            os_family,
            cpu_arch,
            prefers_64bit,
            os_major,
            macos_version,
            has_command_line_tools,
            sdk_path,
        };
        debug!("Probed host: {:?}", profile);

        Ok(profile)
    }
}

/// Host facts supplied up front, e.g. from configuration
#[derive(Debug, Clone)]
pub struct FixedProbe(pub HostProfile);

impl HostProbe for FixedProbe {
    fn probe(&self) -> Result<HostProfile> {
        Ok(self.0.clone())
    }
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        None
    } else {
        Some(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(cpu_arch: CpuArch, prefers_64bit: bool) -> HostProfile {
        HostProfile {
            os_family: OsFamily::Macos,
            cpu_arch,
            prefers_64bit,
            os_major: "14.0.0".to_string(),
            macos_version: Some(MacOsVersion::Yosemite),
            has_command_line_tools: true,
            sdk_path: None,
        }
    }

    #[test]
    fn test_macos_version_parse() {
        assert_eq!(MacOsVersion::parse("10.4.11"), Some(MacOsVersion::Tiger));
        assert_eq!(MacOsVersion::parse("10.9.5"), Some(MacOsVersion::Mavericks));
        assert_eq!(MacOsVersion::parse("10.10"), Some(MacOsVersion::Yosemite));
        assert_eq!(MacOsVersion::parse("14.2"), Some(MacOsVersion::BigSurOrNewer));
        assert_eq!(MacOsVersion::parse("9.2"), None);
        assert_eq!(MacOsVersion::parse("garbage"), None);
    }

    #[test]
    fn test_macos_version_ordering() {
        assert!(MacOsVersion::Tiger < MacOsVersion::Leopard);
        assert!(MacOsVersion::Yosemite > MacOsVersion::Mavericks);
    }

    #[test]
    fn test_build_arch() {
        assert_eq!(mac(CpuArch::Intel, true).build_arch(), Some("x86_64"));
        assert_eq!(mac(CpuArch::Intel, false).build_arch(), Some("i686"));
        assert_eq!(mac(CpuArch::Ppc, true).build_arch(), Some("powerpc64"));
        assert_eq!(mac(CpuArch::Ppc, false).build_arch(), Some("powerpc"));
        assert_eq!(mac(CpuArch::Other, true).build_arch(), None);
    }

    #[test]
    fn test_build_triple() {
        let triple = mac(CpuArch::Intel, true).build_triple().unwrap();
        assert_eq!(triple, "x86_64-apple-darwin14.0.0");
    }

    #[test]
    fn test_build_triple_undetermined() {
        assert!(matches!(
            mac(CpuArch::Other, true).build_triple(),
            Err(Error::UnsupportedHost(_))
        ));

        let mut host = mac(CpuArch::Intel, true);
        host.os_major.clear();
        assert!(matches!(host.build_triple(), Err(Error::UnsupportedHost(_))));

        let mut host = mac(CpuArch::Intel, true);
        host.macos_version = None;
        assert!(matches!(host.build_triple(), Err(Error::UnsupportedHost(_))));
    }

    #[test]
    fn test_macos_comparisons_on_linux() {
        let host = HostProfile {
            os_family: OsFamily::Linux,
            cpu_arch: CpuArch::Intel,
            prefers_64bit: true,
            os_major: "6.1.0".to_string(),
            macos_version: None,
            has_command_line_tools: false,
            sdk_path: None,
        };
        assert!(!host.macos_older_than(MacOsVersion::Leopard));
        assert!(!host.macos_newer_than(MacOsVersion::Tiger));
    }
}
