use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod display;
mod executor;

use display::OutputMode;

/// dynaql: encode values, build keys, and compile filters for a DynamoDB-style store.
#[derive(Parser, Debug)]
#[command(name = "dynaql", version)]
struct Cli {
    /// Pretty-print JSON output.
    #[arg(short, long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a filter object into a PartiQL statement request.
    Compile {
        /// Describe-table JSON for the target table.
        #[arg(short, long)]
        schema: PathBuf,
        /// Filter JSON (`-` or omitted reads stdin).
        filter: Option<String>,
    },
    /// Build the wire form of a key, an item, or an array of items.
    Key {
        /// Describe-table JSON for the target table.
        #[arg(short, long)]
        schema: PathBuf,
        /// Item JSON (`-` or omitted reads stdin).
        data: Option<String>,
    },
    /// Encode a JSON value into its tagged wire form.
    Encode {
        /// Value JSON (`-` or omitted reads stdin).
        value: Option<String>,
    },
    /// Decode a tagged wire value (or a response fragment) into plain JSON.
    Decode {
        /// Wire JSON (`-` or omitted reads stdin).
        value: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = if cli.pretty {
        OutputMode::Pretty
    } else {
        OutputMode::Compact
    };

    match executor::execute(&cli.command) {
        Ok(output) => display::render(&output, &mode),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
