//! dov-cli
//!
//! Searches one DOV record type and writes the result table.
//!
//! Exit codes: 0 success, 2 invalid parameters, unknown field or malformed
//! query, 3 transport or detail document failure, 4 type conversion failure,
//! 1 anything else.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use helios_dov::{
    BoundingBox, ContentType, DovClient, DovConfig, DovError, FieldRegistry, RegistryError,
    SearchRequest, init_logging,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "dov-cli", version)]
#[command(about = "Search the DOV web feature service and write a flat table")]
struct Args {
    /// Record type to search (see --list-types).
    #[arg(long = "type", short = 't', value_name = "RECORD_TYPE")]
    record_type: Option<String>,

    /// Query expression, e.g. "gemeente = Gent, diepte_boring_tot > 20".
    #[arg(long, short)]
    query: Option<String>,

    /// Bounding box as xmin,ymin,xmax,ymax in the configured SRS.
    #[arg(long, value_name = "XMIN,YMIN,XMAX,YMAX", allow_hyphen_values = true)]
    bbox: Option<String>,

    /// Comma-separated return fields; all fields when omitted.
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,

    /// Output format: csv, csv_with_header, json, ndjson or parquet.
    #[arg(long, default_value = "csv_with_header")]
    format: String,

    /// Output file; standard output when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Maximum number of records for this search.
    #[arg(long)]
    limit: Option<u32>,

    /// Print the fields of the record type as JSON and exit.
    #[arg(long)]
    list_fields: bool,

    /// Print the known record types and exit.
    #[arg(long)]
    list_types: bool,

    #[command(flatten)]
    config: DovConfig,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.config.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DovError>() {
        Some(e) if e.is_caller_error() => 2,
        Some(DovError::Registry(RegistryError::UnknownRecordType { .. })) => 2,
        Some(DovError::Transport(_)) | Some(DovError::DetailFetch { .. }) => 3,
        Some(DovError::TypeCoercion(_)) => 4,
        _ => 1,
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let registry = FieldRegistry::builtin().map_err(DovError::from)?;

    if args.list_types {
        let mut out = io::stdout().lock();
        for name in registry.names() {
            let bound = registry.get(name).map_err(DovError::from)?;
            writeln!(out, "{}\t{}", name, bound.record_type().layer())?;
        }
        return Ok(());
    }

    let record_type = args
        .record_type
        .as_deref()
        .ok_or_else(|| DovError::invalid_search("--type is required"))?;

    let mut client = DovClient::from_config(&args.config)?;
    if args.list_fields {
        let fields = client.search_for(record_type)?.fields();
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &fields)?;
        writeln!(out)?;
        return Ok(());
    }

    let content_type = ContentType::from_string(&args.format).map_err(DovError::from)?;
    let location = args
        .bbox
        .as_deref()
        .map(str::parse::<BoundingBox>)
        .transpose()?;
    let request = SearchRequest {
        query: args.query,
        location,
        return_fields: args
            .fields
            .map(|fields| fields.iter().map(|f| f.trim().to_string()).collect()),
        max_features: args.limit,
    };

    let table = client.search(record_type, &request)?;
    info!(
        record_type,
        rows = table.len(),
        format = %content_type,
        "Writing results"
    );

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            table.write(content_type, &mut out)?;
            out.flush()?;
        }
        None => {
            let mut out = BufWriter::new(io::stdout());
            table.write(content_type, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}
