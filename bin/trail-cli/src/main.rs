mod config;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use cloudtrail_runinstances::{
    decode_document_with, BatchPolicy, DecodeError, Document, Event, Records, RecordFailure,
    TagSpecificationSet,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{load_file_config, CliConfig};

#[derive(Clone, Debug, Parser)]
#[command(name = "trail-cli")]
#[command(about = "Decode CloudTrail RunInstances audit records")]
struct Cli {
    #[arg(long = "config", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long, value_enum, global = true)]
    policy: Option<PolicyArg>,
    #[arg(long, global = true)]
    compact: bool,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Clone, Debug, Subcommand)]
enum CliCommand {
    /// Print the decoded record(s) as JSON.
    Decode { input: PathBuf },
    /// Print one summary line per record.
    Summary { input: PathBuf },
    /// Decode without printing records; fails on any fatal error.
    Check { input: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    FailFast,
    SkipAndReport,
}

impl From<PolicyArg> for BatchPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::FailFast => BatchPolicy::FailFast,
            PolicyArg::SkipAndReport => BatchPolicy::SkipAndReport,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordSummary<'a> {
    event_id: &'a str,
    event_time: &'a str,
    event_name: &'a str,
    aws_region: &'a str,
    instance_type: &'a str,
    image_ids: Vec<&'a str>,
    tag_state: &'static str,
    tag_groups: usize,
    reservation_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'a str>,
}

impl<'a> RecordSummary<'a> {
    fn from_event(event: &'a Event) -> Self {
        let params = &event.request_parameters;
        let tag_state = match &params.tag_specification_set {
            None => "absent",
            Some(TagSpecificationSet::Hidden) => "hidden",
            Some(TagSpecificationSet::Tags(_)) => "tagged",
        };
        Self {
            event_id: &event.event_id,
            event_time: &event.event_time,
            event_name: &event.event_name,
            aws_region: &event.aws_region,
            instance_type: &params.instance_type,
            image_ids: params
                .instances_set
                .iter()
                .map(|item| item.image_id.as_str())
                .collect(),
            tag_state,
            tag_groups: params.tag_groups().len(),
            reservation_id: &event.response_elements.reservation_id,
            error_code: event.error_code.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SkippedRecord {
    index: usize,
    kind: &'static str,
    path: Option<String>,
    error: String,
}

impl From<&RecordFailure> for SkippedRecord {
    fn from(failure: &RecordFailure) -> Self {
        Self {
            index: failure.index,
            kind: failure.error.kind().as_str(),
            path: failure.error.path().map(str::to_string),
            error: failure.error.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryReport<'a> {
    records: Vec<RecordSummary<'a>>,
    skipped: Vec<SkippedRecord>,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A subscriber may already be installed (tests); keep it.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(filter)
        .try_init()
        .ok();
}

fn read_input(input: &Path) -> anyhow::Result<Vec<u8>> {
    if input == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read records from stdin")?;
        return Ok(buf);
    }
    fs::read(input).with_context(|| format!("failed to read input file {}", input.display()))
}

fn decode_input(
    input: &Path,
    policy: BatchPolicy,
) -> anyhow::Result<(Document, Vec<RecordFailure>)> {
    let bytes = read_input(input)?;
    debug!(bytes = bytes.len(), ?policy, "decoding input");
    decode_document_with(&bytes, policy).map_err(|err| decode_failure(input, &err))
}

fn decode_failure(input: &Path, err: &DecodeError) -> anyhow::Error {
    anyhow!(
        "decode failed for {} kind={}: {err}",
        input.display(),
        err.kind().as_str()
    )
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("failed to format output")?;
    println!("{rendered}");
    Ok(())
}

fn report_skipped(failures: &[RecordFailure]) {
    for failure in failures {
        eprintln!(
            "skipped record {} kind={}: {}",
            failure.index,
            failure.error.kind().as_str(),
            failure.error
        );
    }
}

fn handle_command(command: CliCommand, cfg: &CliConfig) -> anyhow::Result<()> {
    match command {
        CliCommand::Decode { input } => {
            let (document, failures) = decode_input(&input, cfg.batch_policy)?;
            match document {
                Document::Single(event) => print_json(&event, cfg.pretty)?,
                Document::Envelope(records) => print_json(&Records { records }, cfg.pretty)?,
            }
            report_skipped(&failures);
            Ok(())
        }
        CliCommand::Summary { input } => {
            let (document, failures) = decode_input(&input, cfg.batch_policy)?;
            let report = SummaryReport {
                records: document
                    .events()
                    .iter()
                    .map(RecordSummary::from_event)
                    .collect(),
                skipped: failures.iter().map(SkippedRecord::from).collect(),
            };
            print_json(&report, cfg.pretty)
        }
        CliCommand::Check { input } => {
            let (document, failures) = decode_input(&input, cfg.batch_policy)?;
            report_skipped(&failures);
            println!(
                "ok records={} skipped={}",
                document.events().len(),
                failures.len()
            );
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = cli
        .config_path
        .as_deref()
        .map(load_file_config)
        .transpose()?;
    let cfg = CliConfig::layered(file_config, cli.policy.map(BatchPolicy::from), cli.compact);

    init_tracing(&cfg.log_filter);
    debug!(?cfg, "configuration resolved");

    handle_command(cli.command, &cfg)
}
