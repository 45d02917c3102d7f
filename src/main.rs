use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pkg_release::cli::{run_release_workflow, ReleaseWorkflowArgs};
use pkg_release::config;
use pkg_release::domain::ReleaseFlags;
use pkg_release::interrupt;
use pkg_release::ui::{self, BatchPrompter, Prompter, TerminalPrompter};

#[derive(clap::Parser)]
#[command(
    name = "pkg-release",
    version,
    about = "Check out, build, tag and install a package release"
)]
struct Args {
    #[arg(short, long, help = "Package to release, e.g. modules/asyn")]
    package: Option<String>,

    #[arg(short, long, help = "Release version, e.g. R1.2.3-0.1.0")]
    release: Option<String>,

    #[arg(short, long, help = "Branch to release from")]
    branch: Option<String>,

    #[arg(short, long, help = "Release message")]
    message: Option<String>,

    #[arg(short, long, help = "Install into this directory instead of the site default")]
    install_dir: Option<PathBuf>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[arg(long, help = "Do not create a release tag")]
    no_tag: bool,

    #[arg(long, help = "Skip the test build in a temporary workspace")]
    no_test_build: bool,

    #[arg(long, help = "Never prompt; assume yes")]
    batch: bool,

    #[arg(short, long, conflicts_with = "verbose", help = "Only print errors")]
    quiet: bool,

    #[arg(short, long, help = "Echo every command and log debug output")]
    verbose: bool,

    #[arg(long, help = "Keep the temporary workspace")]
    keep_temp: bool,

    #[arg(long, help = "Do not ask for a release message")]
    no_msg: bool,

    #[arg(long, help = "Remove an installed release")]
    rm_build: bool,

    #[arg(long, help = "Remove a release tag")]
    rm_tag: bool,

    #[arg(long, help = "Remove both the installed release and its tag")]
    nuke_release: bool,
}

impl Args {
    fn workflow(&self) -> ReleaseWorkflowArgs {
        ReleaseWorkflowArgs {
            package: self.package.clone(),
            release: self.release.clone(),
            branch: self.branch.clone(),
            message: self.message.clone(),
            install_dir: self.install_dir.clone(),
            flags: ReleaseFlags {
                dry_run: self.dry_run,
                no_tag: self.no_tag,
                no_test_build: self.no_test_build,
                batch: self.batch,
                quiet: self.quiet,
                verbose: self.verbose,
                keep_temp: self.keep_temp,
                no_msg: self.no_msg,
                rm_build: self.rm_build,
                rm_tag: self.rm_tag,
                nuke_release: self.nuke_release,
            },
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    // Load configuration
    let site = match config::load_config(args.config.as_deref()) {
        Ok(site) => site,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(e.outcome().exit_code());
        }
    };

    if let Err(e) = interrupt::install_handler() {
        log::warn!("interrupts will not clean up the workspace: {}", e);
    }

    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    let prompter: Box<dyn Prompter> = if args.batch {
        Box::new(BatchPrompter)
    } else {
        Box::new(TerminalPrompter)
    };

    let report = run_release_workflow(&args.workflow(), &site, &cwd, prompter.as_ref());
    if !args.quiet || !report.outcome.is_success() {
        ui::display_report(&report);
    }
    std::process::exit(report.exit_code());
}
