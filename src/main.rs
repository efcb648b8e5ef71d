use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

mod commands;

/// UnrealPack - package an Unreal Engine plugin for every supported engine version
#[derive(Parser)]
#[command(name = "unrealpack")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Arguments for packing when no subcommand is given
    #[command(flatten)]
    pack: PackArgs,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one archive per target engine version (default)
    Pack(PackArgs),

    /// Write a default unrealpack.toml into a plugin directory
    Init {
        /// Path to plugin directory (defaults to current directory)
        path: Option<String>,

        /// Overwrite an existing unrealpack.toml
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PackArgs {
    /// Path to plugin directory (defaults to current directory)
    path: Option<String>,

    /// Config file (defaults to <path>/unrealpack.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Target engine version; repeat to package several (overrides config)
    #[arg(short, long = "engine-version")]
    engine_versions: Vec<String>,

    /// Product name used for the archive folder and file names
    #[arg(long)]
    product: Option<String>,

    /// Directory to write archives to (defaults to the plugin's parent)
    #[arg(short, long)]
    output: Option<String>,

    /// Skip license stamping
    #[arg(long)]
    no_stamp: bool,

    /// Leave the staging directory on disk after packaging
    #[arg(long)]
    keep_staging: bool,

    /// Show what would be produced without writing anything
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,unrealpack=debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        None => commands::pack::run(cli.pack),
        Some(Commands::Pack(args)) => commands::pack::run(args),
        Some(Commands::Init { path, force }) => commands::init::run(path, force),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "unrealpack", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
