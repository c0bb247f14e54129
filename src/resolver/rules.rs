//! Policy rules for configure arguments
//!
//! Rules run in table order and each returns the flags it contributes, or
//! `None` when it does not apply to this build.

use super::ResolveContext;
use crate::host::MacOsVersion;
use crate::options::BuildOption;
use crate::{Error, Result};

/// A single policy rule
pub type Rule = fn(&ResolveContext<'_>) -> Result<Option<Vec<String>>>;

/// Target triple of the bundled binutils
const BINUTILS_TRIPLE: &str = "x86_64-unknown-linux-gnu";

/// Rules in precedence order
pub const RULES: &[(&str, Rule)] = &[
    ("build-triple", build_triple),
    ("install-dirs", install_dirs),
    ("languages", languages),
    ("program-suffix", program_suffix),
    ("math-libraries", math_libraries),
    ("fixed", fixed),
    ("version-info", version_info),
    ("glibc", glibc),
    ("plugin", plugin),
    ("dwarf2", dwarf2),
    ("nls", nls),
    ("ecj-jar", ecj_jar),
    ("multilib", multilib),
    ("sysroot", sysroot),
];

/// Math libraries passed by prefix, as (dependency, configure name)
const MATH_LIBRARIES: &[(&str, &str)] = &[
    ("gmp", "gmp"),
    ("mpfr", "mpfr"),
    ("libmpc", "mpc"),
    ("cloog", "cloog"),
    ("isl", "isl"),
];

fn build_triple(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    if !ctx.host.is_macos() {
        return Ok(None);
    }
    Ok(Some(vec![format!("--build={}", ctx.host.build_triple()?)]))
}

fn install_dirs(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    let mut flags = vec![format!("--prefix={}", ctx.prefix().display())];
    if ctx.host.is_macos() {
        flags.push(format!(
            "--libdir={}/gcc/{}",
            ctx.layout.lib().display(),
            ctx.version_suffix
        ));
    }
    Ok(Some(flags))
}

fn languages(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    Ok(Some(vec![format!(
        "--enable-languages={}",
        ctx.languages.joined()
    )]))
}

// Versioned executables keep this GCC from clashing with other installs
fn program_suffix(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    Ok(Some(vec![format!("--program-suffix=-{}", ctx.version_suffix)]))
}

fn math_libraries(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    MATH_LIBRARIES
        .iter()
        .map(|(dep, flag)| -> Result<String> {
            let prefix = ctx.deps.require(dep)?;
            Ok(format!("--with-{}={}", flag, prefix.display()))
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn fixed(_ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    Ok(Some(
        [
            "--with-system-zlib",
            "--enable-libstdcxx-time=yes",
            "--enable-stage1-checking",
            "--enable-checking=release",
            "--enable-lto",
            // Warnings are errors on the development branch
            "--disable-werror",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    ))
}

fn version_info(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    let pkgversion = format!(
        "--with-pkgversion=Homebrew {} {} {}",
        ctx.formula.name,
        ctx.formula.version,
        ctx.options.used_options().join(" ")
    );
    Ok(Some(vec![
        pkgversion.trim().to_string(),
        format!("--with-bugurl={}", ctx.formula.bug_url),
    ]))
}

fn glibc(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    if !ctx.options.is_enabled(BuildOption::WithGlibc) {
        return Ok(None);
    }

    let binutils = ctx.deps.require("binutils")?;
    let boot_ldflags = format!("-static-libstdc++ -static-libgcc {}", ctx.layout.ldflags);

    Ok(Some(vec![
        format!(
            "--with-native-system-header-dir={}",
            ctx.layout.brew_prefix.join("include").display()
        ),
        format!(
            "--with-build-time-tools={}",
            binutils.join(BINUTILS_TRIPLE).join("bin").display()
        ),
        format!("--with-boot-ldflags={}", boot_ldflags.trim_end()),
    ]))
}

// Plugins need -fPIC, -shared, -ldl and -rdynamic, which Tiger lacks
fn plugin(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    if !ctx.host.is_macos() || ctx.host.macos_newer_than(MacOsVersion::Tiger) {
        Ok(Some(vec!["--enable-plugin".to_string()]))
    } else {
        Ok(None)
    }
}

// Stage 3 comparison fails without it (GCC bug 45248)
fn dwarf2(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    if ctx.host.is_macos() || ctx.host.macos_older_than(MacOsVersion::Leopard) {
        Ok(Some(vec!["--with-dwarf2".to_string()]))
    } else {
        Ok(None)
    }
}

fn nls(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    if ctx.options.is_enabled(BuildOption::EnableNls) {
        Ok(None)
    } else {
        Ok(Some(vec!["--disable-nls".to_string()]))
    }
}

fn ecj_jar(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    if !ctx.options.java_enabled() {
        return Ok(None);
    }

    let ecj = ctx.deps.require("ecj")?;
    Ok(Some(vec![format!(
        "--with-ecj-jar={}",
        ecj.join("share/java/ecj.jar").display()
    )]))
}

fn multilib(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    Ok(Some(vec![ctx.multilib.flag().to_string()]))
}

// Xcode-only systems need the SDK as sysroot
fn sysroot(ctx: &ResolveContext<'_>) -> Result<Option<Vec<String>>> {
    if !ctx.host.is_macos() || ctx.host.has_command_line_tools {
        return Ok(None);
    }

    let sdk = ctx.host.sdk_path.as_ref().ok_or_else(|| {
        Error::UnsupportedHost("command line tools missing and no SDK path found".to_string())
    })?;

    Ok(Some(vec![
        "--with-native-system-header-dir=/usr/include".to_string(),
        format!("--with-sysroot={}", sdk.display()),
    ]))
}
