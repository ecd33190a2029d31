use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use keyhunt::StageKind;

#[derive(Parser)]
#[command(name = "keyhunt")]
#[command(version)]
#[command(about = "Staged concurrent candidate search against a pass/fail oracle", long_about = None)]
pub struct Args {
    /// Upper bound on workers per stage (default: from config, 100)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// JSON configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand)]
pub enum Mode {
    /// List checksum PINs, or check a single one
    ///
    /// Example: keyhunt pins --verify 12342
    Pins {
        /// PIN to validate instead of listing
        #[arg(long, value_name = "PIN")]
        verify: Option<String>,
    },

    /// Print the candidates of one stage
    ///
    /// Example: keyhunt candidates identity --target MyHome_5G --hw aa:bb:cc:dd:ee:ff
    Candidates {
        #[arg(value_enum)]
        stage: StageKind,

        /// Target name used for derived candidates
        #[arg(long, default_value = "")]
        target: String,

        /// Hardware address used for derived candidates
        #[arg(long, value_name = "ADDR")]
        hw: Option<String>,

        /// Print at most N candidates (generative stages default to 20)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run a search session
    ///
    /// Either an external oracle program (exit status 0 accepts the
    /// candidate) or a fixed set of accepted candidates must be given.
    ///
    /// Example: keyhunt run --target MyHome_5G --oracle ./check.sh --arg {target} --arg {candidate}
    #[command(group(ArgGroup::new("oracle_kind").required(true).args(["oracle", "accept"])))]
    Run {
        /// Target name
        #[arg(long)]
        target: String,

        /// Hardware address of the target
        #[arg(long, value_name = "ADDR")]
        hw: Option<String>,

        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Wordlist for the dictionary stage
        #[arg(long, value_name = "PATH")]
        dictionary: Option<PathBuf>,

        /// Stages to run, in order (default: all)
        #[arg(long, value_enum, value_delimiter = ',')]
        stages: Vec<StageKind>,

        /// Oracle program run once per candidate
        #[arg(long, value_name = "PROGRAM")]
        oracle: Option<String>,

        /// Argument for the oracle program; {target} and {candidate} are substituted
        #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
        oracle_args: Vec<String>,

        /// Seconds before an oracle run is killed and counted as a failure
        #[arg(long, value_name = "SECS", default_value = "30")]
        oracle_timeout: u64,

        /// Accept exactly these candidates (dry runs and demos)
        #[arg(long, value_name = "CANDIDATE", num_args = 1..)]
        accept: Vec<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}
