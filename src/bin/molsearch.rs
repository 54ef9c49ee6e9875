use std::io::Write;
use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::{Diagnostic, IntoDiagnostic};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use molecule_search::config::ConfigLoader;
use molecule_search::domain::{Query, SessionState};
use molecule_search::error::{ErrorKind, SearchError};
use molecule_search::output::{JsonOutput, OutputMode, SearchReport, TextOutput};
use molecule_search::request::RequestTemplates;
use molecule_search::session::{
    SearchOutcome, SearchSession, SessionOptions, StateEvent, StateSink,
};
use molecule_search::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "molsearch")]
#[command(about = "Search a remote macromolecular structure repository by keyword")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Find entries matching a query and list them with their titles")]
    Search(SearchArgs),
    #[command(about = "Show the resolved configuration")]
    Config,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(required = true)]
    query: Vec<String>,

    #[arg(long)]
    json: bool,

    #[arg(long)]
    quiet: bool,

    #[arg(long)]
    max_results: Option<NonZeroUsize>,

    /// Cancel the search if it has not finished after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Error, Diagnostic)]
#[error("search did not finish within {0}s and was cancelled")]
struct TimedOut(u64);

struct StderrProgress;

impl StateSink for StderrProgress {
    fn transition(&self, event: StateEvent) {
        let label = match event.to {
            SessionState::FetchingIdentifiers => "searching repository",
            SessionState::FetchingTitles => "resolving titles",
            _ => return,
        };
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "phase={}; {label}", event.to);
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if report.downcast_ref::<TimedOut>().is_some() {
            return ExitCode::from(4);
        }
        if let Some(error) = report.downcast_ref::<SearchError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SearchError) -> u8 {
    match error.kind() {
        ErrorKind::Usage | ErrorKind::Config => 2,
        ErrorKind::Transport | ErrorKind::Parse => 3,
        ErrorKind::Internal => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            JsonOutput::print_config(&config).into_diagnostic()?;
            Ok(())
        }
        Commands::Search(args) => {
            let query: Query = args.query.join(" ").parse()?;
            let output_mode = if args.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            };

            let transport = HttpTransport::new(&config)?;
            let mut templates = RequestTemplates::from_config(&config);
            if let Some(max_results) = args.max_results {
                templates = templates.with_max_results(max_results);
            }
            let mut options = SessionOptions::default().with_title_failure(config.title_failure);
            if !args.quiet && matches!(output_mode, OutputMode::Text) {
                options = options.with_sink(Arc::new(StderrProgress));
            }

            let session = SearchSession::new(Arc::new(transport), templates, options);
            let ticket = session.start(query.clone())?;
            let outcome = match args.timeout_secs {
                Some(secs) => match ticket.wait_timeout(Duration::from_secs(secs)) {
                    Some(outcome) => outcome,
                    None => {
                        session.cancel();
                        let outcome = ticket.wait();
                        session.join();
                        match outcome {
                            Some(SearchOutcome::Cancelled) | None => {
                                return Err(TimedOut(secs).into());
                            }
                            Some(outcome) => outcome,
                        }
                    }
                },
                None => ticket.wait().ok_or(SearchError::WorkerLost)?,
            };
            session.join();

            let results = match outcome {
                SearchOutcome::Completed(results) => results,
                SearchOutcome::Failed(error) => return Err(error.into()),
                SearchOutcome::Cancelled => return Err(miette::Report::msg("search was cancelled")),
            };
            let report = SearchReport::new(query.as_str(), results);
            match output_mode {
                OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
                OutputMode::Text => TextOutput::print_report(&report).into_diagnostic()?,
            }
            Ok(())
        }
    }
}
