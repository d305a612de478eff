use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ua_comparator::corpus::ChainCorpus;
use ua_comparator::runner::{
    adapters_from_settings, run_compare, run_live, run_parse, CancellationToken, LineWriter,
    Pipeline,
};
use ua_comparator::snapshot::SnapshotStore;
use ua_comparator::{Result, Settings};

#[derive(Parser)]
#[command(name = "ua-comparator")]
#[command(author, version, about = "Cross-validate user-agent detection engines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (engines, reference, column width, ...)
    #[arg(short, long, global = true, default_value = "ua-comparator.yml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every engine over the corpus and store raw snapshots
    Parse {
        /// Snapshot directory
        #[arg(short, long)]
        out: PathBuf,

        /// Corpus files: .yml/.yaml fixtures or plain text, one agent per line
        #[arg(required = true)]
        corpus: Vec<PathBuf>,
    },

    /// Compare stored snapshots and print the report
    Compare {
        /// Snapshot directory written by `parse`
        #[arg(short, long)]
        snapshots: PathBuf,

        /// Only print disagreement tables, no progress markers
        #[arg(long)]
        quiet: bool,
    },

    /// Detect and compare without storing snapshots
    Live {
        #[arg(required = true)]
        corpus: Vec<PathBuf>,

        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("ua_comparator=debug")
        } else {
            EnvFilter::new("ua_comparator=info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)?;
    let cancel = CancellationToken::new();
    on_interrupt(&cancel);

    match cli.command {
        Commands::Parse { out, corpus } => {
            let adapters = adapters_from_settings(&settings)?;
            let corpus = ChainCorpus::from_paths(&corpus);
            let store = SnapshotStore::new(out);
            let summary = run_parse(&settings, &adapters, &corpus, &store, &cancel)?;
            println!(
                "{} agents parsed, {} adapter failures, {} write failures",
                summary.agents, summary.adapter_failures, summary.write_failures
            );
        }
        Commands::Compare { snapshots, quiet } => {
            let pipeline = Pipeline::from_settings(&settings)?;
            let reporter = settings.reporter()?;
            let writer = line_writer(quiet);
            run_compare(
                &settings,
                &pipeline,
                &SnapshotStore::new(snapshots),
                &reporter,
                &writer,
                &cancel,
            )?;
            print!("{}", reporter.render());
        }
        Commands::Live { corpus, quiet } => {
            let pipeline = Pipeline::from_settings(&settings)?;
            let adapters = adapters_from_settings(&settings)?;
            let reporter = settings.reporter()?;
            let writer = line_writer(quiet);
            run_live(
                &settings,
                &pipeline,
                &adapters,
                &ChainCorpus::from_paths(&corpus),
                &reporter,
                &writer,
                &cancel,
            )?;
            print!("{}", reporter.render());
        }
    }
    if cancel.is_cancelled() {
        tracing::warn!("run was interrupted, results are partial");
    }
    Ok(())
}

/// First Ctrl-C stops dispatching new agents and lets the ones in flight
/// finish writing; a second one exits at once.
fn on_interrupt(cancel: &CancellationToken) {
    let cancel = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            std::process::exit(130);
        }
        tracing::warn!("interrupted, finishing agents in flight (Ctrl-C again to abort)");
        cancel.cancel();
    });
    if let Err(e) = installed {
        tracing::warn!(error = %e, "could not install interrupt handler");
    }
}

fn line_writer(quiet: bool) -> LineWriter<io::Stdout> {
    let writer = LineWriter::new(io::stdout());
    if quiet {
        writer.tables_only()
    } else {
        writer
    }
}
