use std::path::PathBuf;

use clap::Parser;

use crate::io::format::qsnap_output;

const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Logs a nicely formatted QSnap heading to the `qsnap-output` logger.
pub fn log_heading() {
    let version = if let Some(ver) = VERSION {
        format!("v{ver}")
    } else {
        "v unknown".to_string()
    };
    qsnap_output!("╭─────────────────────────────────────────────────────────────────╮");
    qsnap_output!("│     ____      _____                                             │");
    qsnap_output!("│    / __ \\    / ___/ ____   ____ _ ____                          │");
    qsnap_output!("│   / / / /    \\__ \\ / __ \\ / __ `// __ \\                         │");
    qsnap_output!("│  / /_/ /    ___/ // / / // /_/ // /_/ /                         │");
    qsnap_output!("│  \\___\\_\\   /____//_/ /_/ \\__,_// .___/                          │");
    qsnap_output!("│                               /_/                               │");
    qsnap_output!("│                                                                 │");
    qsnap_output!("│  Spectral Neighbour Analysis Potential force evaluation         │");
    qsnap_output!("│                                                   {version:>13} │");
    qsnap_output!("╰─────────────────────────────────────────────────────────────────╯");
    qsnap_output!("");
}

/// Command-line arguments of the `qsnap` binary.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML configuration file. Without one, a synthetic BCC tungsten dataset is
    /// evaluated with default parameters.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to a file receiving the `qsnap-output` log in addition to the console.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of force evaluation steps, overriding the configuration file.
    #[arg(short, long)]
    pub nsteps: Option<usize>,

    /// Increases the verbosity of diagnostic logging. May be given twice.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
