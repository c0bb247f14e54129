//! gcc48-formula CLI
//!
//! Command-line front end for resolving the GCC 4.8 configure arguments and
//! driving the build from an unpacked source tree.

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use gcc48_formula::rewrite::Transformation;
use gcc48_formula::{
    runner, BuildOption, BuildOptions, CommandRunner, Config, Dependencies, Formula, HostProfile,
    Installer, Layout, RewriteOutcome, SystemRunner,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gcc48-formula",
    about = "GCC 4.8 formula - resolve configure arguments and build the toolchain",
    version,
    author
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pretend mode (show what would run without running it)
    #[arg(short, long, global = true)]
    pretend: bool,

    /// Enable a build option (e.g. enable-fortran); may be repeated
    #[arg(short = 'o', long = "option", global = true)]
    options: Vec<String>,

    /// Keg prefix to install into
    #[arg(long, global = true, env = "GCC48_PREFIX")]
    prefix: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show formula information
    Info,

    /// Print the detected host profile as JSON
    Probe,

    /// List build options offered on this host
    Options,

    /// Print the resolved configure arguments
    Args,

    /// Print the post-install rewrite plan
    Plan,

    /// Configure, build and install from an unpacked source tree
    Install {
        /// Unpacked GCC source directory
        source: PathBuf,
    },

    /// Write the compiler specs override for an installed keg
    PostInstall,
}

/// Inputs shared by the commands that resolve a build
struct Session {
    formula: Formula,
    config: Config,
    host: HostProfile,
    options: BuildOptions,
    deps: Dependencies,
    layout: Layout,
}

impl Session {
    fn new(config: Config, extra_options: &[String]) -> anyhow::Result<Self> {
        let formula = Formula::gcc48();
        let host = config.probe().probe().context("Failed to probe host")?;

        let mut options = config.build_options()?;
        options.extend(&BuildOptions::parse_names(extra_options)?);

        let deps = config.resolve_dependencies(&formula, &host, &options);
        let layout = config.layout(&formula);

        Ok(Self {
            formula,
            config,
            host,
            options,
            deps,
            layout,
        })
    }

    fn installer<'a>(&'a self, runner: &'a dyn CommandRunner) -> Installer<'a> {
        Installer::new(
            &self.formula,
            &self.host,
            &self.options,
            &self.deps,
            &self.layout,
            runner,
        )
        .with_host_compiler(self.config.host_compiler())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    if let Some(prefix) = cli.prefix {
        config.prefix = Some(prefix);
    }

    match cli.command {
        Commands::Info => cmd_info(&Formula::gcc48()),
        Commands::Probe => cmd_probe(&config),
        Commands::Options => cmd_options(&Session::new(config, &cli.options)?),
        Commands::Args => cmd_args(&Session::new(config, &cli.options)?),
        Commands::Plan => cmd_plan(&Session::new(config, &cli.options)?),
        Commands::Install { source } => {
            cmd_install(&Session::new(config, &cli.options)?, source, cli.pretend).await
        }
        Commands::PostInstall => {
            cmd_post_install(&Session::new(config, &cli.options)?, cli.pretend).await
        }
    }
}

fn cmd_info(formula: &Formula) -> anyhow::Result<()> {
    println!(
        "{} {}",
        style(formula.name).green().bold(),
        style(formula.version).cyan()
    );
    println!("Homepage: {}", formula.homepage);
    println!("Source:   {}", formula.url);
    println!("Mirror:   {}", formula.mirror);
    println!("SHA1:     {}", formula.sha1);
    println!("HEAD:     {}", formula.head);
    println!();

    println!("{}", style("Dependencies:").bold());
    for dep in &formula.dependencies {
        let mut tags = Vec::new();
        if dep.optional {
            tags.push("optional");
        }
        if dep.build_only {
            tags.push("build");
        }
        if tags.is_empty() {
            println!("  {}", dep.name);
        } else {
            println!("  {} ({})", dep.name, tags.join(", "));
        }
    }
    println!();

    println!("{}", style("Options:").bold());
    for option in BuildOption::all() {
        println!("  --{:<24} {}", option.name(), option.description());
    }
    println!();

    println!("Fails with: {}", formula.fails_with.join(", "));
    Ok(())
}

fn cmd_probe(config: &Config) -> anyhow::Result<()> {
    let host = config.probe().probe()?;
    println!("{}", serde_json::to_string_pretty(&host)?);
    Ok(())
}

fn cmd_options(session: &Session) -> anyhow::Result<()> {
    for option in BuildOption::all() {
        if !option.offered_on(&session.host) {
            continue;
        }
        let marker = if session.options.is_enabled(option) {
            style("*").green().bold()
        } else {
            style(" ")
        };
        println!("{} --{:<24} {}", marker, option.name(), option.description());
    }
    Ok(())
}

fn cmd_args(session: &Session) -> anyhow::Result<()> {
    let runner = SystemRunner;
    let resolution = session.installer(&runner).preflight()?;
    for arg in resolution.args.iter() {
        println!("{}", arg);
    }
    Ok(())
}

fn cmd_plan(session: &Session) -> anyhow::Result<()> {
    let runner = SystemRunner;
    let installer = session.installer(&runner);
    let resolution = installer.preflight()?;
    let plan = installer.rewrite_plan(&resolution)?;

    for step in plan.steps() {
        let action = match step.transformation {
            Transformation::RenameWithSuffix(ref suffix) => format!("rename (-{})", suffix),
            Transformation::DeleteDirectory => "delete".to_string(),
            Transformation::AppendSpecs(_) => "specs".to_string(),
        };
        println!("{:<14} {}", style(action).yellow(), step.path.display());
    }
    Ok(())
}

async fn cmd_install(session: &Session, source: PathBuf, pretend: bool) -> anyhow::Result<()> {
    let runner = SystemRunner;
    let make = match runner::find_make(session.config.make_path.as_deref()) {
        Ok(make) => make,
        Err(_) if pretend => PathBuf::from("make"),
        Err(e) => return Err(e.into()),
    };
    let installer = session.installer(&runner).with_make(make);

    if pretend {
        let resolution = installer.preflight()?;
        let env = installer.build_env()?;
        let build_dir = source.join("build");
        println!("{}", style(">>> Would run:").green().bold());
        for cmd in installer.build_commands(&resolution, &source, &build_dir, &env) {
            println!("  {}", cmd.display());
        }
        return Ok(());
    }

    let report = installer
        .install(&source)
        .await
        .with_context(|| format!("Failed to install from {}", source.display()))?;

    for outcome in &report.rewrites {
        match outcome {
            RewriteOutcome::Renamed { from, to } => {
                println!("  renamed {} -> {}", from.display(), to.display())
            }
            RewriteOutcome::Removed(path) => println!("  removed {}", path.display()),
            RewriteOutcome::SpecsWritten(path) => println!("  wrote {}", path.display()),
            RewriteOutcome::Skipped(_) => {}
        }
    }

    println!(
        "\n{} {} {} installed to {}",
        style(">>>").green().bold(),
        session.formula.name,
        session.formula.version,
        session.layout.prefix.display()
    );
    Ok(())
}

async fn cmd_post_install(session: &Session, pretend: bool) -> anyhow::Result<()> {
    let runner = SystemRunner;
    let installer = session.installer(&runner);
    let suffix = session.formula.version_suffix()?;

    if pretend {
        match installer.specs_policy() {
            Some(policy) => print!("{}", policy.render()),
            None => println!("No specs override on this host"),
        }
        return Ok(());
    }

    match installer.post_install(&suffix).await? {
        Some(specs) => println!("{} wrote {}", style(">>>").green().bold(), specs.display()),
        None => println!("No specs override on this host"),
    }
    Ok(())
}
