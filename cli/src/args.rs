use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sieve_store::ScriptName;
use tracing::Level;

/// Manages a directory of Sieve scripts, and which of them is active.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The repository directory, or a `sievedir:///path` URL.
    #[arg(long, short = 'r', env = "SIEVEDIR_REPOSITORY", default_value = ".")]
    pub repository: String,

    /// A global log level to use when printing logs.
    /// It's also possible to set `RUST_LOG` according to
    /// `tracing_subscriber::filter::EnvFilter`, which will always have
    /// priority.
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,

    /// Whether to log in JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Lists all scripts, marking the active one.
    List,

    /// Prints the source of a script.
    Get { name: ScriptName },

    /// Compiles and stores a script, read from FILE or stdin.
    Put {
        name: ScriptName,

        #[clap(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Deletes a script.
    Delete { name: ScriptName },

    /// Renames a script, keeping it active if it was.
    Rename { old: ScriptName, new: ScriptName },

    /// Makes an existing script the active one.
    Activate { name: ScriptName },

    /// Leaves no script active.
    Deactivate,

    /// Prints the name of the active script, if any.
    Active,

    /// Prints the number of scripts.
    Count {
        /// Don't count this script.
        #[arg(long)]
        exclude: Option<ScriptName>,
    },

    /// Compiles a script without storing it.
    Check {
        #[clap(value_name = "FILE")]
        file: PathBuf,

        /// Print the generated bytecode.
        #[arg(long)]
        dump_bytecode: bool,
    },
}
