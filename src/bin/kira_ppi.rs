use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use kira_ppi::app::{App, PopulateOptions, ProgressSink};
use kira_ppi::config::{ConfigLoader, ResolvedConfig};
use kira_ppi::db::RedbStore;
use kira_ppi::domain::Namespace;
use kira_ppi::error::KiraError;
use kira_ppi::output::{GraphFormat, JsonOutput, LogProgress, write_graph};
use kira_ppi::source::{HttpSourceClient, SourceLoader};
use kira_ppi::store::Store;

#[derive(Parser)]
#[command(name = "kira-ppi")]
#[command(about = "Load HIPPIE protein-protein interactions and export them as BEL")]
#[command(version, author)]
struct Cli {
    /// Path to a kira-ppi.json config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Database file (defaults to the cache directory)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Print JSON only, without progress messages
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download, enrich and store HIPPIE")]
    Populate(PopulateArgs),
    #[command(about = "Count stored proteins and interactions")]
    Summarize,
    #[command(about = "Export stored interactions as a BEL graph")]
    Export(ExportArgs),
    #[command(about = "Drop all stored proteins and interactions")]
    Reset,
}

#[derive(Args)]
struct PopulateArgs {
    /// HIPPIE file URL or local path
    #[arg(long)]
    url: Option<String>,

    /// UniProt mapping URL or local path
    #[arg(long)]
    uniprot_url: Option<String>,

    /// HGNC complete set URL or local path
    #[arg(long)]
    hgnc_url: Option<String>,

    /// Reset the database before populating
    #[arg(long)]
    reset: bool,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long, value_enum, default_value_t = Namespace::Uniprot)]
    namespace: Namespace,

    #[arg(long, value_enum, default_value_t = GraphFormat::Json)]
    format: GraphFormat,

    /// Output file (stdout when omitted)
    #[arg(long)]
    output: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::PreconditionNotMet { .. }
        | KiraError::AlreadyPopulated
        | KiraError::MissingConfig(_) => 2,
        KiraError::Http(_) | KiraError::HttpStatus { .. } => 3,
        KiraError::UnresolvedEndpoint { .. }
        | KiraError::DedupConflict { .. }
        | KiraError::DuplicateEntrez(_)
        | KiraError::MalformedRow { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.non_interactive { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = Store::new()?;
    let database = cli
        .database
        .clone()
        .map(Utf8PathBuf::from)
        .or_else(|| config.database.clone())
        .unwrap_or_else(|| store.database_path());
    let sink: &dyn ProgressSink = if cli.non_interactive {
        &JsonOutput
    } else {
        &LogProgress
    };

    let mut app = App::new(RedbStore::open(database.as_std_path())?);
    match cli.command {
        Commands::Populate(args) => run_populate(&mut app, args, &config, store, sink),
        Commands::Summarize => {
            JsonOutput::print_summary(&app.summarize()?).into_diagnostic()
        }
        Commands::Export(args) => run_export(&app, args),
        Commands::Reset => JsonOutput::print_reset(&app.reset(sink)?).into_diagnostic(),
    }
}

fn run_populate(
    app: &mut App<RedbStore>,
    args: PopulateArgs,
    config: &ResolvedConfig,
    store: Store,
    sink: &dyn ProgressSink,
) -> miette::Result<()> {
    let loader = SourceLoader::new(store, HttpSourceClient::new()?);
    let hgnc_url = args.hgnc_url.or_else(|| config.hgnc_url.clone());
    let hgnc = loader.load_hgnc(hgnc_url.as_deref())?;
    let options = PopulateOptions {
        url: args.url.or_else(|| config.hippie_url.clone()),
        uniprot_url: args.uniprot_url.or_else(|| config.uniprot_url.clone()),
        reset: args.reset,
    };
    let result = app.populate_from(&loader, &hgnc, &options, sink)?;
    JsonOutput::print_populate(&result).into_diagnostic()
}

fn run_export(app: &App<RedbStore>, args: ExportArgs) -> miette::Result<()> {
    let result = app.export(args.namespace)?;
    if result.skipped > 0 {
        warn!(
            skipped = result.skipped,
            namespace = %args.namespace,
            "skipped interactions without identifiers in the requested namespace"
        );
    }
    match args.output {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            write_graph(&mut writer, &result.graph, args.format).into_diagnostic()?;
            writer.flush().into_diagnostic()
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_graph(&mut writer, &result.graph, args.format).into_diagnostic()
        }
    }
}
