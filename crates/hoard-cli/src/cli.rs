use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "hoard",
    about = "Hoard backup repository maintenance",
    version
)]
pub struct Cli {
    /// Repository directory
    #[arg(short = 'd', long = "dir", env = "HOARD_DIR", default_value = ".", global = true)]
    pub repo: PathBuf,

    /// More output; repeat for more detail
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reclaim space held by objects no branch or tag reaches
    Gc(GcArgs),
    /// Remove branches, tags or individual saves
    Rm(RmArgs),
}

#[derive(Args, Debug)]
pub struct GcArgs {
    /// Rewrite packs with at least this percentage of garbage
    #[arg(long)]
    pub threshold: Option<i64>,

    /// zstd level for rewritten packs (0-9)
    #[arg(short = '#', long = "compress")]
    pub compress: Option<i32>,

    /// Acknowledge that collection permanently deletes data
    #[arg(long = "unsafe")]
    pub acknowledge_unsafe: bool,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// zstd level for re-written saves (0-9)
    #[arg(short = '#', long = "compress")]
    pub compress: Option<i32>,

    /// Acknowledge that removal makes data collectable
    #[arg(long = "unsafe")]
    pub acknowledge_unsafe: bool,

    /// `<branch>`, `<branch>/<save>` or `.tag/<tag>`
    #[arg(value_name = "NAME", value_parser = clap::value_parser!(OsString))]
    pub names: Vec<OsString>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn gc_flags() {
        let cli = Cli::try_parse_from([
            "hoard", "-d", "/srv/backup", "gc", "--threshold", "25", "-#", "3", "-vv", "--unsafe",
        ])
        .unwrap();
        assert_eq!(cli.repo, PathBuf::from("/srv/backup"));
        assert_eq!(cli.verbose, 2);
        let Command::Gc(args) = cli.command else {
            panic!("expected gc");
        };
        assert_eq!(args.threshold, Some(25));
        assert_eq!(args.compress, Some(3));
        assert!(args.acknowledge_unsafe);
    }

    #[test]
    fn gc_defaults_leave_config_alone() {
        let cli = Cli::try_parse_from(["hoard", "gc"]).unwrap();
        let Command::Gc(args) = cli.command else {
            panic!("expected gc");
        };
        assert_eq!(args.threshold, None);
        assert_eq!(args.compress, None);
        assert!(!args.acknowledge_unsafe);
    }

    #[test]
    fn rm_names() {
        let cli = Cli::try_parse_from([
            "hoard", "rm", "--compress", "9", "--unsafe", "home", "home/latest", ".tag/v1",
        ])
        .unwrap();
        let Command::Rm(args) = cli.command else {
            panic!("expected rm");
        };
        assert_eq!(args.compress, Some(9));
        assert_eq!(args.names, vec!["home", "home/latest", ".tag/v1"]);
    }

    #[test]
    fn non_numeric_threshold_is_rejected() {
        assert!(Cli::try_parse_from(["hoard", "gc", "--threshold", "lots"]).is_err());
    }
}
