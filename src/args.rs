use clap::{Parser, Subcommand, ValueEnum};
use serp_harvest::Target;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "serp-harvest")]
#[command(about = "Harvest result links and contact emails from search results pages")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Render pages in a WebDriver browser instead of a plain HTTP request
    #[arg(long)]
    pub browser: bool,

    /// Override the snapshot directory
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search, open the top result and print the email addresses found there
    Emails(TargetArgs),

    /// Fetch the results page and save it as a snapshot
    Capture(TargetArgs),

    /// Print the links of a previously captured results page
    Links {
        #[command(flatten)]
        target: TargetArgs,

        /// Collapse duplicate URLs
        #[arg(long)]
        dedup: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct TargetArgs {
    /// Search query, or a URL when --kind url
    pub target: String,

    /// How to interpret the target
    #[arg(short, long, value_enum, default_value_t = TargetKind::Query)]
    pub kind: TargetKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TargetKind {
    Query,
    Url,
}

impl TargetArgs {
    /// Convert from CLI arguments to a fetch target
    pub fn to_target(&self) -> Target {
        match self.kind {
            TargetKind::Query => Target::Query(self.target.clone()),
            TargetKind::Url => Target::Url(self.target.clone()),
        }
    }
}
