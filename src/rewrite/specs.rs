//! GCC specs override
//!
//! On Linux the installed compiler gets a specs file that points the link
//! step at the package manager's `lib` directory and, when the glibc formula
//! is installed, at its dynamic linker. See
//! <https://gcc.gnu.org/onlinedocs/gcc/Spec-Files.html>.
//!
//! The old `specs` and `specs.orig` are deleted before the new ones are
//! written, so a crash in between leaves the compiler without a specs file.

use crate::runner::{CommandRunner, CommandSpec};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Dynamic linker shipped by glibc, relative to its `lib`
const DYNAMIC_LINKER: &str = "ld-linux-x86-64.so.2";

/// Inputs to the specs override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecsPolicy {
    /// Package manager prefix whose `lib` is searched and used as rpath
    pub brew_prefix: PathBuf,
    /// GCC runtime directory to search instead of the system one, set when
    /// building against the alternate libc
    pub runtime_lib_dir: Option<PathBuf>,
    /// `lib` directory of the installed alternate libc
    pub libc_lib_dir: Option<PathBuf>,
}

impl SpecsPolicy {
    pub fn new(brew_prefix: impl Into<PathBuf>) -> Self {
        Self {
            brew_prefix: brew_prefix.into(),
            runtime_lib_dir: None,
            libc_lib_dir: None,
        }
    }

    /// Directives appended to the compiler's default specs
    pub fn render(&self) -> String {
        let brew_lib = self.brew_prefix.join("lib");
        let mut s = String::new();

        match self.runtime_lib_dir {
            Some(ref runtime) => s.push_str(&format!(
                "*link_libgcc:\n-nostdlib -L{} -L{}\n\n",
                runtime.display(),
                brew_lib.display()
            )),
            None => s.push_str(&format!("*link_libgcc:\n+ -L{}\n\n", brew_lib.display())),
        }

        s.push_str(&format!("*link:\n+ -rpath {}", brew_lib.display()));
        if let Some(ref libc) = self.libc_lib_dir {
            s.push_str(&format!(
                " --dynamic-linker {}",
                libc.join(DYNAMIC_LINKER).display()
            ));
        }
        s.push_str("\n\n");

        s
    }

    /// Default specs followed by the override
    pub fn apply(&self, default_specs: &str) -> String {
        format!("{}{}", default_specs, self.render())
    }
}

/// Writes the specs file of an installed compiler
pub struct SpecsWriter<'a> {
    runner: &'a dyn CommandRunner,
    compiler: &'a Path,
}

impl<'a> SpecsWriter<'a> {
    pub fn new(runner: &'a dyn CommandRunner, compiler: &'a Path) -> Self {
        Self { runner, compiler }
    }

    /// Location of the specs file, next to libgcc
    pub async fn locate(&self) -> Result<PathBuf> {
        let cmd = CommandSpec::new(self.compiler).arg("-print-libgcc-file-name");
        let output = self.runner.capture(&cmd).await?.check(&cmd)?;

        let libgcc = PathBuf::from(output.stdout.trim());
        match libgcc.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.join("specs")),
            _ => Err(Error::Other(format!(
                "{} did not report a libgcc path: {:?}",
                cmd.display(),
                output.stdout.trim()
            ))),
        }
    }

    /// Back up the default specs and write the override; returns the specs path
    pub async fn write(&self, policy: &SpecsPolicy) -> Result<PathBuf> {
        let specs = self.locate().await?;
        info!("Creating the GCC specs file: {}", specs.display());

        let specs_orig = PathBuf::from(format!("{}.orig", specs.display()));
        remove_if_exists(&specs_orig)?;
        remove_if_exists(&specs)?;

        let cmd = CommandSpec::new(self.compiler).arg("-dumpspecs");
        let output = self.runner.capture(&cmd).await?.check(&cmd)?;
        std::fs::write(&specs_orig, &output.stdout)?;

        std::fs::write(&specs, policy.apply(&output.stdout))?;
        Ok(specs)
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
