use std::os::unix::ffi::OsStringExt;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use hoard_gc::{run_gc, GcConfig, GcReport, Threshold};
use hoard_repo::{LocalRepo, LockKind};
use hoard_rm::{run_rm, RmConfig, RmReport};

use crate::cli::*;

/// Run the parsed command. Returns the number of errors that were tallied
/// without stopping the command.
pub fn run_command(cli: Cli) -> anyhow::Result<usize> {
    match cli.command {
        Command::Gc(args) => cmd_gc(&cli.repo, cli.verbose, args),
        Command::Rm(args) => cmd_rm(&cli.repo, cli.verbose, args),
    }
}

/// The level to log at: the `-v` count or the subcommand's configured
/// `verbosity`, whichever is higher. A config file that fails to load
/// counts as zero here; the command itself reports the error.
pub fn configured_verbosity(cli: &Cli) -> u8 {
    let configured = match &cli.command {
        Command::Gc(_) => GcConfig::load(&cli.repo).map(|c| c.verbosity),
        Command::Rm(_) => RmConfig::load(&cli.repo).map(|c| c.verbosity),
    };
    configured.unwrap_or(0).max(cli.verbose)
}

fn gc_config(repo: &Path, verbose: u8, args: &GcArgs) -> anyhow::Result<GcConfig> {
    let mut config = GcConfig::load(repo)?;
    if let Some(threshold) = args.threshold {
        config.threshold = Threshold::new(threshold)?;
    }
    if let Some(level) = args.compress {
        config.compression = level;
    }
    config.verbosity = config.verbosity.max(verbose);
    config.acknowledge_unsafe = args.acknowledge_unsafe;
    config.validate()?;
    Ok(config)
}

fn cmd_gc(repo: &Path, verbose: u8, args: GcArgs) -> anyhow::Result<usize> {
    let config = gc_config(repo, verbose, &args)?;
    let report = run_gc(repo, &config)
        .with_context(|| format!("garbage collection in {} failed", repo.display()))?;
    print_gc_report(&report);
    Ok(report.tally.count())
}

fn print_gc_report(report: &GcReport) {
    let mark = if report.tally.is_clean() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!(
        "{mark} gc: {} of {} packs selected, {} rewritten, {} emptied, {} unchanged",
        report.worklist.len(),
        report.packs_examined,
        report.rewritten,
        report.emptied,
        report.unchanged,
    );
    println!(
        "  {} objects dropped, {} bytes freed, {} live objects",
        report.objects_dropped.to_string().bold(),
        report.bytes_freed.to_string().bold(),
        report.live_objects,
    );
    if report.skipped > 0 {
        println!("  {} packs skipped for broken references", report.skipped.to_string().yellow());
    }
    for anomaly in &report.anomalies {
        println!("  {} {anomaly}", "warning:".yellow());
    }
    for message in report.tally.messages() {
        println!("  {} {message}", "error:".red());
    }
}

fn rm_config(repo: &Path, verbose: u8, args: &RmArgs, names: &[Vec<u8>]) -> anyhow::Result<RmConfig> {
    let mut config = RmConfig::load(repo)?;
    if let Some(level) = args.compress {
        config.compression = level;
    }
    config.verbosity = config.verbosity.max(verbose);
    config.acknowledge_unsafe = args.acknowledge_unsafe;
    config.validate(names)?;
    Ok(config)
}

fn cmd_rm(repo_dir: &Path, verbose: u8, args: RmArgs) -> anyhow::Result<usize> {
    let names: Vec<Vec<u8>> = args.names.iter().cloned().map(OsStringExt::into_vec).collect();
    let config = rm_config(repo_dir, verbose, &args, &names)?;

    let mut repo = LocalRepo::open(repo_dir)
        .with_context(|| format!("cannot open repository {}", repo_dir.display()))?;
    let _lock = repo.lock(LockKind::Exclusive)?;
    // packs listed before the lock may since have been rewritten
    repo.reload_packs()?;
    let report = run_rm(&mut repo, &names, &config)?;
    print_rm_report(&report);
    Ok(report.tally.count())
}

fn print_rm_report(report: &RmReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(_) => println!("{} removed {}", "✓".green(), outcome.name.bold()),
            Err(e) => println!("{} {}: {e}", "✗".red(), outcome.name.bold()),
        }
    }
    if report.snapshots_written > 0 {
        println!("  {} later saves re-parented", report.snapshots_written);
    }
}
