//! Tests for post-install rewriting of an installed keg

use assert_matches::assert_matches;
use async_trait::async_trait;
use gcc48_formula::resolver::{Layout, Resolution};
use gcc48_formula::rewrite::{add_suffix, suffixed_path, SpecsPolicy, SpecsWriter, Transformation};
use gcc48_formula::runner::{CommandSpec, ProcessOutput};
use gcc48_formula::{
    ArgumentList, CommandRunner, Error, Language, LanguageSet, MultilibPolicy, RewriteOutcome,
    RewritePlan,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DEFAULT_SPECS: &str = "*asm:\n\n\n*link:\n%{!static:--eh-frame-hdr}\n\n";

/// Answers the two compiler queries the specs writer makes
struct FakeCompiler {
    libgcc: PathBuf,
    query_status: i32,
}

#[async_trait]
impl CommandRunner for FakeCompiler {
    async fn run(&self, _command: &CommandSpec) -> gcc48_formula::Result<ProcessOutput> {
        Ok(ProcessOutput {
            status: Some(0),
            ..Default::default()
        })
    }

    async fn capture(&self, command: &CommandSpec) -> gcc48_formula::Result<ProcessOutput> {
        let stdout = match command.args.first().map(String::as_str) {
            Some("-print-libgcc-file-name") => format!("{}\n", self.libgcc.display()),
            Some("-dumpspecs") => DEFAULT_SPECS.to_string(),
            _ => String::new(),
        };
        Ok(ProcessOutput {
            status: Some(self.query_status),
            stdout,
            stderr: String::new(),
        })
    }
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"content").unwrap();
}

fn resolution(java: bool) -> Resolution {
    let mut languages = LanguageSet::base();
    if java {
        languages.insert(Language::Java);
    }
    Resolution {
        languages,
        multilib: MultilibPolicy::Disabled,
        version_suffix: "4.8".to_string(),
        args: ArgumentList::new(),
    }
}

/// A keg as `make install` leaves it
fn installed_keg() -> (TempDir, Layout) {
    let dir = TempDir::new().unwrap();
    let layout = Layout::new(dir.path().join("keg"), dir.path().join("brew"));

    touch(&layout.lib().join("libiberty.a"));
    touch(&layout.lib().join("x86_64/libiberty.a"));
    touch(&layout.man7().join("fsf-funding.7"));
    touch(&layout.man7().join("gfdl.7"));
    touch(&layout.info().join("gcc.info"));
    touch(&layout.lib().join("logging.properties"));
    touch(&layout.lib().join("security/classpath.security"));

    (dir, layout)
}

mod rename_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_suffix_before_extension() {
        assert_eq!(
            suffixed_path(Path::new("/x/libiberty.a"), "4.8"),
            PathBuf::from("/x/libiberty-4.8.a")
        );
    }

    #[test]
    fn test_rename_is_pure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("libiberty.a");
        fs::write(&path, b"archive bytes").unwrap();

        let outcome = add_suffix(&path, "4.8").unwrap();
        let target = dir.path().join("libiberty-4.8.a");
        assert_eq!(
            outcome,
            RewriteOutcome::Renamed {
                from: path.clone(),
                to: target.clone()
            }
        );
        assert!(!path.exists());
        assert_eq!(fs::read(&target).unwrap(), b"archive bytes");
    }

    #[test]
    fn test_missing_source_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("libiberty.a");
        assert_matches!(add_suffix(&path, "4.8"), Ok(RewriteOutcome::Skipped(_)));
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}

mod plan_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_finds_conflicting_files() {
        let (_dir, layout) = installed_keg();
        let plan = RewritePlan::scan(&layout, &resolution(false), None).unwrap();

        let renamed: Vec<_> = plan
            .steps()
            .iter()
            .filter(|s| matches!(s.transformation, Transformation::RenameWithSuffix(_)))
            .map(|s| s.path.strip_prefix(&layout.prefix).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            renamed,
            vec![
                PathBuf::from("lib/libiberty.a"),
                PathBuf::from("lib/x86_64/libiberty.a"),
                PathBuf::from("share/man/man7/fsf-funding.7"),
                PathBuf::from("share/man/man7/gfdl.7"),
            ]
        );
        assert!(plan
            .steps()
            .iter()
            .any(|s| s.path == layout.info() && s.transformation == Transformation::DeleteDirectory));
    }

    #[test]
    fn test_java_properties_only_with_java() {
        let (_dir, layout) = installed_keg();
        let without = RewritePlan::scan(&layout, &resolution(false), None).unwrap();
        let with = RewritePlan::scan(&layout, &resolution(true), None).unwrap();

        let properties = layout.lib().join("logging.properties");
        assert!(!without.steps().iter().any(|s| s.path == properties));
        assert!(with.steps().iter().any(|s| s.path == properties));
    }

    #[tokio::test]
    async fn test_apply_and_rerun() {
        let (dir, layout) = installed_keg();
        let runner = FakeCompiler {
            libgcc: dir.path().join("unused"),
            query_status: 0,
        };

        let plan = RewritePlan::scan(&layout, &resolution(true), None).unwrap();
        plan.apply(&runner).await.unwrap();

        assert!(layout.lib().join("libiberty-4.8.a").exists());
        assert!(layout.lib().join("x86_64/libiberty-4.8.a").exists());
        assert!(layout.man7().join("gfdl-4.8.7").exists());
        assert!(layout.lib().join("logging-4.8.properties").exists());
        assert!(layout.lib().join("security/classpath-4.8.security").exists());
        assert!(!layout.info().exists());

        // A second pass finds nothing new to rename and skips the rest
        let again = RewritePlan::scan(&layout, &resolution(true), None).unwrap();
        let outcomes = again.apply(&runner).await.unwrap();
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, RewriteOutcome::Skipped(_))));
        assert!(layout.lib().join("libiberty-4.8.a").exists());
    }

    #[test]
    fn test_scan_empty_keg() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path().join("missing"), dir.path());
        let plan = RewritePlan::scan(&layout, &resolution(false), None).unwrap();
        assert_eq!(plan.len(), 1);
    }
}

mod specs_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn libgcc_dir(dir: &TempDir) -> PathBuf {
        let lib = dir
            .path()
            .join("keg/lib/gcc/x86_64-unknown-linux-gnu/4.8.4");
        fs::create_dir_all(&lib).unwrap();
        lib
    }

    #[test]
    fn test_alternate_runtime_without_libc() {
        let policy = SpecsPolicy {
            brew_prefix: PathBuf::from("/brew"),
            runtime_lib_dir: Some(PathBuf::from("/keg/lib/gcc/x86_64-unknown-linux-gnu/4.8.4")),
            libc_lib_dir: None,
        };
        let out = policy.render();

        assert_eq!(out.matches("*link_libgcc:").count(), 1);
        assert!(out.contains(
            "-nostdlib -L/keg/lib/gcc/x86_64-unknown-linux-gnu/4.8.4 -L/brew/lib"
        ));
        assert!(!out.contains("--dynamic-linker"));
    }

    #[test]
    fn test_installed_libc_sets_dynamic_linker() {
        let policy = SpecsPolicy {
            libc_lib_dir: Some(PathBuf::from("/brew/opt/glibc/lib")),
            ..SpecsPolicy::new("/brew")
        };
        assert!(policy
            .render()
            .contains("--dynamic-linker /brew/opt/glibc/lib/ld-linux-x86-64.so.2"));
    }

    #[tokio::test]
    async fn test_writer_backs_up_and_appends() {
        let dir = TempDir::new().unwrap();
        let lib = libgcc_dir(&dir);
        let runner = FakeCompiler {
            libgcc: lib.join("libgcc.a"),
            query_status: 0,
        };
        let compiler = dir.path().join("keg/bin/gcc-4.8");
        let policy = SpecsPolicy::new("/brew");

        let specs = SpecsWriter::new(&runner, &compiler)
            .write(&policy)
            .await
            .unwrap();

        assert_eq!(specs, lib.join("specs"));
        assert_eq!(fs::read_to_string(lib.join("specs.orig")).unwrap(), DEFAULT_SPECS);
        assert_eq!(fs::read_to_string(&specs).unwrap(), policy.apply(DEFAULT_SPECS));
    }

    #[tokio::test]
    async fn test_writer_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let lib = libgcc_dir(&dir);
        fs::write(lib.join("specs"), "stale override").unwrap();
        fs::write(lib.join("specs.orig"), "stale backup").unwrap();

        let runner = FakeCompiler {
            libgcc: lib.join("libgcc.a"),
            query_status: 0,
        };
        let compiler = dir.path().join("keg/bin/gcc-4.8");
        let policy = SpecsPolicy::new("/brew");
        let writer = SpecsWriter::new(&runner, &compiler);

        writer.write(&policy).await.unwrap();
        let first = fs::read_to_string(lib.join("specs")).unwrap();
        writer.write(&policy).await.unwrap();
        let second = fs::read_to_string(lib.join("specs")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.matches("*link_libgcc:").count(), 1);
        assert_eq!(fs::read_to_string(lib.join("specs.orig")).unwrap(), DEFAULT_SPECS);
    }

    #[tokio::test]
    async fn test_empty_libgcc_path_aborts() {
        let dir = TempDir::new().unwrap();
        let runner = FakeCompiler {
            libgcc: PathBuf::new(),
            query_status: 0,
        };
        let compiler = dir.path().join("keg/bin/gcc-4.8");

        let result = SpecsWriter::new(&runner, &compiler)
            .write(&SpecsPolicy::new("/brew"))
            .await;
        assert_matches!(result, Err(Error::Other(_)));
        assert!(!Path::new("specs").exists());
        assert!(!Path::new("specs.orig").exists());
    }

    #[tokio::test]
    async fn test_bare_libgcc_name_aborts() {
        let dir = TempDir::new().unwrap();
        let runner = FakeCompiler {
            libgcc: PathBuf::from("libgcc.a"),
            query_status: 0,
        };
        let compiler = dir.path().join("keg/bin/gcc-4.8");

        let result = SpecsWriter::new(&runner, &compiler).locate().await;
        assert_matches!(result, Err(Error::Other(_)));
    }

    #[tokio::test]
    async fn test_failed_query_aborts() {
        let dir = TempDir::new().unwrap();
        let lib = libgcc_dir(&dir);
        let runner = FakeCompiler {
            libgcc: lib.join("libgcc.a"),
            query_status: 1,
        };
        let compiler = dir.path().join("keg/bin/gcc-4.8");

        let result = SpecsWriter::new(&runner, &compiler)
            .write(&SpecsPolicy::new("/brew"))
            .await;
        assert_matches!(result, Err(Error::ExternalProcessFailure { status: 1, .. }));
        assert!(!lib.join("specs").exists());
    }
}
