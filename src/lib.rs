//! GCC 4.8 Formula
//!
//! Configures, builds and installs GCC 4.8 on behalf of a package manager
//! runtime that has already fetched and unpacked the sources.
//!
//! # Architecture
//!
//! - **Host**: probes the build machine (OS, CPU, kernel release, SDK)
//! - **Options**: the fixed set of user-selectable build options
//! - **Resolver**: ordered policy rules that derive the configure arguments
//! - **Pipeline**: configure, bootstrap and install in a scratch build directory
//! - **Rewrite**: post-install renames, cleanup and the Linux specs override
//!
//! ```rust,no_run
//! use gcc48_formula::{resolver, BuildOptions, Config, Formula, HostProbe};
//!
//! let config = Config::load().unwrap();
//! let formula = Formula::gcc48();
//! let host = config.probe().probe().unwrap();
//! let options = BuildOptions::new();
//! let deps = config.resolve_dependencies(&formula, &host, &options);
//! let resolution =
//!     resolver::resolve(&formula, &host, &options, &deps, &config.layout(&formula)).unwrap();
//! for arg in resolution.args.iter() {
//!     println!("{}", arg);
//! }
//! ```

pub mod config;
pub mod error;
pub mod formula;
pub mod host;
pub mod options;
pub mod pipeline;
pub mod resolver;
pub mod rewrite;
pub mod runner;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use formula::Formula;
pub use host::{HostProbe, HostProfile};
pub use options::{BuildOption, BuildOptions};
pub use pipeline::{InstallReport, Installer};
pub use resolver::{Layout, Resolution};
pub use rewrite::{RewriteOutcome, RewritePlan};
pub use runner::{CommandRunner, SystemRunner};
pub use types::*;
