//! Binary entry point for the `stratus` CLI.

use std::io::{self, BufRead, Write};
use std::process;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;
use tracing::error;

use stratus::actions;
use stratus::speech::{self, SpeechError};
use stratus::{
    ClientError, Clients, ConfigError, GcpConfig, LoadBalancerRequest, SheetsError,
    TranslateError, Workflow, WorkflowPlan, logging,
};

mod cli;

use cli::{
    BucketCommand, Cli, DemoArgs, InstanceCommand, LoadBalancerCommand, SheetCommand,
    TranscribeArgs, TranslateArgs,
};

const TEXT_PROMPT: &str = "Enter the text to translate: ";
const TARGET_PROMPT: &str =
    "Enter the target language code (e.g., 'es' for Spanish, 'fr' for French): ";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("client initialisation failed: {0}")]
    Clients(#[from] ClientError),
    #[error("{0} failed; see the log for details")]
    Task(&'static str),
    #[error("speech recognition failed: {0}")]
    Speech(#[from] SpeechError),
    #[error("sheets request failed: {0}")]
    Sheets(#[from] SheetsError),
    #[error("translation failed: {0}")]
    Translate(#[from] TranslateError),
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
    #[error("invalid row {row}: {message}")]
    InvalidRow { row: String, message: String },
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = GcpConfig::load_without_cli_args()?;
    match cli {
        Cli::Instance(command) => instance(&config, command).await,
        Cli::Bucket(command) => bucket(&config, command).await,
        Cli::LoadBalancer(LoadBalancerCommand::Create(args)) => {
            let clients = initialize_clients(&config);
            let request = LoadBalancerRequest::new(args.bucket, args.backend_bucket, args.domain);
            let ip = actions::create_load_balancer(
                clients.as_ref().map(|c| &c.load_balancer),
                &request,
            )
            .await
            .ok_or(CliError::Task("load balancer creation"))?;
            writeln!(io::stdout(), "http://{ip}")?;
            Ok(())
        }
        Cli::Demo(args) => demo(&config, args).await,
        Cli::Transcribe(args) => transcribe(&config, args).await,
        Cli::Sheet(command) => sheet(&config, command).await,
        Cli::Translate(args) => translate(&config, args).await,
    }
}

// Task commands carry on with no clients when initialisation fails, so the
// failure surfaces through the task's sentinel.
fn initialize_clients(config: &GcpConfig) -> Option<Clients> {
    match Clients::initialize(config) {
        Ok(clients) => Some(clients),
        Err(err) => {
            error!(error = %err, "failed to initialise clients");
            None
        }
    }
}

fn print_lines(lines: &[String]) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}

async fn instance(config: &GcpConfig, command: InstanceCommand) -> Result<(), CliError> {
    let clients = initialize_clients(config);
    let compute = clients.as_ref().map(|c| &c.compute);
    match command {
        InstanceCommand::Create { name } => {
            let request = config.as_instance_request(name.as_deref())?;
            let created = actions::create_instance(compute, &request)
                .await
                .ok_or(CliError::Task("instance creation"))?;
            writeln!(io::stdout(), "{created}")?;
        }
        InstanceCommand::List => {
            print_lines(&actions::list_instances(compute, &config.zone).await)?;
        }
        InstanceCommand::Delete { name } => {
            let target = name.unwrap_or_else(|| config.instance_name.clone());
            if !actions::terminate_instance(compute, &config.zone, &target).await {
                return Err(CliError::Task("instance deletion"));
            }
        }
    }
    Ok(())
}

async fn bucket(config: &GcpConfig, command: BucketCommand) -> Result<(), CliError> {
    let clients = initialize_clients(config);
    let storage = clients.as_ref().map(|c| &c.storage);
    match command {
        BucketCommand::Create { name } => {
            let created = actions::create_bucket(storage, &config.as_bucket_request(&name))
                .await
                .ok_or(CliError::Task("bucket creation"))?;
            writeln!(io::stdout(), "{created}")?;
        }
        BucketCommand::List => print_lines(&actions::list_buckets(storage).await)?,
        BucketCommand::Upload {
            bucket,
            file,
            destination,
        } => {
            let source = Utf8PathBuf::from(file);
            if !actions::upload_file(storage, &bucket, &source, destination.as_deref()).await {
                return Err(CliError::Task("upload"));
            }
        }
        BucketCommand::Delete { name } => {
            if !actions::delete_bucket(storage, &name).await {
                return Err(CliError::Task("bucket deletion"));
            }
        }
    }
    Ok(())
}

async fn demo(config: &GcpConfig, args: DemoArgs) -> Result<(), CliError> {
    let plan = WorkflowPlan {
        instance: config.as_instance_request(args.instance.as_deref())?,
        bucket: config.as_bucket_request(&args.bucket),
        upload: args.upload.map(Utf8PathBuf::from),
        load_balancer: args
            .backend_bucket
            .map(|backend| LoadBalancerRequest::new(args.bucket.clone(), backend, args.domain)),
        cleanup_delay: args
            .cleanup_delay
            .map_or_else(|| config.cleanup_delay(), std::time::Duration::from_secs),
    };
    let clients = initialize_clients(config);
    let workflow = Workflow::new(
        clients.as_ref().map(|c| &c.compute),
        clients.as_ref().map(|c| &c.storage),
        clients.as_ref().map(|c| &c.load_balancer),
    );
    let report = workflow.execute(&plan).await;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "instance: {}", report.instance.as_deref().unwrap_or("-"))?;
    writeln!(stdout, "running: {}", report.running_instances.join(", "))?;
    writeln!(stdout, "bucket: {}", report.bucket.as_deref().unwrap_or("-"))?;
    writeln!(stdout, "buckets: {}", report.buckets.join(", "))?;
    writeln!(stdout, "uploaded: {}", report.uploaded)?;
    if let Some(ip) = &report.load_balancer_ip {
        writeln!(stdout, "load balancer: http://{ip}")?;
    }
    writeln!(stdout, "instance terminated: {}", report.instance_terminated)?;
    writeln!(stdout, "bucket deleted: {}", report.bucket_deleted)?;
    Ok(())
}

fn default_mono_path(input: &Utf8Path) -> Utf8PathBuf {
    let stem = input.file_stem().unwrap_or("audio");
    input.with_file_name(format!("{stem}.mono.wav"))
}

async fn transcribe(config: &GcpConfig, args: TranscribeArgs) -> Result<(), CliError> {
    let input = Utf8PathBuf::from(args.input);
    let audio = if args.no_convert {
        input
    } else {
        let output = args
            .mono_output
            .map_or_else(|| default_mono_path(&input), Utf8PathBuf::from);
        speech::convert_to_mono(&input, &output).map_err(SpeechError::from)?;
        output
    };
    let clients = Clients::initialize_unscoped(config)?;
    let transcripts = clients.speech.transcribe_file(&audio).await?;
    let lines = transcripts
        .iter()
        .map(|transcript| format!("Transcript: {transcript}"))
        .collect::<Vec<_>>();
    print_lines(&lines)
}

// A row starting with `[` is a JSON array of cell strings, so cells may
// contain commas. Anything else is split on commas.
fn parse_row(row: &str) -> Result<Vec<String>, CliError> {
    let trimmed = row.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|err| CliError::InvalidRow {
            row: row.to_owned(),
            message: err.to_string(),
        });
    }
    Ok(row.split(',').map(|cell| cell.trim().to_owned()).collect())
}

async fn sheet(config: &GcpConfig, command: SheetCommand) -> Result<(), CliError> {
    let spreadsheet_id = config.require_spreadsheet_id()?;
    let clients = Clients::initialize_unscoped(config)?;
    let sheets = clients.sheets(spreadsheet_id);
    let mut stdout = io::stdout().lock();
    match command {
        SheetCommand::Read { range } => {
            let rows = sheets.read_range(&range).await?;
            if rows.is_empty() {
                writeln!(stdout, "No data found.")?;
            }
            for row in rows {
                writeln!(stdout, "{}", row.join("\t"))?;
            }
        }
        SheetCommand::Write { range, rows } => {
            let values = rows
                .iter()
                .map(|row| parse_row(row))
                .collect::<Result<Vec<_>, _>>()?;
            let updated = sheets.write_range(&range, &values).await?;
            writeln!(stdout, "{updated} cells updated.")?;
        }
    }
    Ok(())
}

fn prompt(
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
    field: &'static str,
) -> Result<String, CliError> {
    write!(output, "{label}")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let value = line.trim();
    if value.is_empty() {
        return Err(CliError::EmptyInput(field));
    }
    Ok(value.to_owned())
}

fn resolve_or_prompt(
    given: Option<String>,
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
    field: &'static str,
) -> Result<String, CliError> {
    match given.map(|value| value.trim().to_owned()) {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(CliError::EmptyInput(field)),
        None => prompt(input, output, label, field),
    }
}

async fn translate(config: &GcpConfig, args: TranslateArgs) -> Result<(), CliError> {
    let (text, target) = {
        let mut stdin = io::stdin().lock();
        let mut stdout = io::stdout().lock();
        let text = resolve_or_prompt(args.text, &mut stdin, &mut stdout, TEXT_PROMPT, "text")?;
        let target = resolve_or_prompt(
            args.target,
            &mut stdin,
            &mut stdout,
            TARGET_PROMPT,
            "target language",
        )?;
        (text, target)
    };
    let clients = Clients::initialize_unscoped(config)?;
    let translation = clients
        .translate
        .translate(&text, &target, args.source.as_deref())
        .await?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "Translation Successful!")?;
    writeln!(stdout, "Original Text: {text}")?;
    writeln!(stdout, "Translated Text: {}", translation.translated_text)?;
    if let Some(language) = &translation.detected_source_language {
        writeln!(stdout, "Detected Language: {language}")?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
