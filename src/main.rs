use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medprompt::{
    run_worker, settings_from_env, AnalysisError, AnalysisResult, AnalyzerSettings, DecodeOptions,
    DicomEngine, Envelope, ExecutionBoundary, InProcessWorker, Isolation, ProcessWorker,
    StatusClass, Worker,
};

#[derive(Parser)]
#[command(
    name = "medprompt",
    version,
    about = "Extracts clinical metadata and a grayscale PNG preview from a DICOM file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file and print the result envelope as JSON.
    Analyze(AnalyzeArgs),

    /// Analyze one staged file and print a worker reply. Used by the process worker.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    file: Utf8PathBuf,

    /// Run the pipeline on a thread instead of a child process.
    #[arg(long)]
    in_process: bool,

    /// Deadline, e.g. "10s" or "1m 30s".
    #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Reject files which do not follow the standard to the letter.
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct WorkerArgs {
    file: Utf8PathBuf,

    #[arg(long)]
    strict: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // stdout carries the JSON output
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .finish(),
    )
    .unwrap_or_else(|e| eprintln!("Could not set up global logger: {e}"));

    let outcome = match cli.command {
        Commands::Analyze(args) => tokio::runtime::Runtime::new()
            .map_err(anyhow::Error::from)
            .and_then(|runtime| runtime.block_on(analyze_file(args))),
        Commands::Worker(args) => worker(args),
    };
    // failures outside of the analysis are the service's own fault
    outcome.unwrap_or_else(|e| {
        tracing::error!(event = "exit", error = ?e);
        ExitCode::from(2)
    })
}

fn worker(args: WorkerArgs) -> anyhow::Result<ExitCode> {
    let reply = run_worker(&args.file, DecodeOptions { strict: args.strict });
    serde_json::to_writer(std::io::stdout().lock(), &reply)?;
    Ok(ExitCode::SUCCESS)
}

async fn analyze_file(args: AnalyzeArgs) -> anyhow::Result<ExitCode> {
    let mut settings = settings_from_env()?;
    if args.in_process {
        settings.isolation = Isolation::InProcess;
    }
    if let Some(timeout) = args.timeout {
        settings.timeout = timeout;
    }
    settings.strict |= args.strict;

    let name = args.file.file_name().unwrap_or("upload");
    let outcome = match fs_err::tokio::read(&args.file).await {
        Err(e) => {
            tracing::error!(event = "read", error = %e);
            Err(AnalysisError::Io(e))
        }
        Ok(bytes) => analyze_bytes(&settings, name, &bytes).await,
    };

    let envelope = Envelope::from_outcome(&outcome);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(match envelope.status() {
        StatusClass::Success => ExitCode::SUCCESS,
        StatusClass::ClientError => ExitCode::from(1),
        StatusClass::ServerError => ExitCode::from(2),
    })
}

async fn analyze_bytes(
    settings: &AnalyzerSettings,
    name: &str,
    bytes: &[u8],
) -> Result<AnalysisResult, AnalysisError> {
    match settings.isolation {
        Isolation::Process => {
            let mut worker = ProcessWorker::current_exe(settings.max_reply_bytes)
                .map_err(|e| AnalysisError::Execution(format!("no worker executable: {e}")))?
                .with_options(settings.decode_options());
            if settings.memory_limit > 0 {
                worker = worker.with_memory_limit(settings.memory_limit);
            }
            run(worker, settings, name, bytes).await
        }
        Isolation::InProcess => {
            let worker = InProcessWorker::new(DicomEngine::new(settings.decode_options()));
            run(worker, settings, name, bytes).await
        }
    }
}

async fn run<W: Worker>(
    worker: W,
    settings: &AnalyzerSettings,
    name: &str,
    bytes: &[u8],
) -> Result<AnalysisResult, AnalysisError> {
    ExecutionBoundary::new(
        worker,
        settings.workers,
        settings.timeout,
        &settings.staging_dir,
    )
    .run_bytes(name, bytes)
    .await
}
