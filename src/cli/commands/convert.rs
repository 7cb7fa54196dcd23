use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::convert::{EntityKind, VersionedEntityConverter};
use crate::types::ApiVersion;

#[derive(Args)]
pub struct ConvertArgs {
    #[arg(help = "Entity kind: role, server, dsr, parameter or tenant")]
    pub kind: EntityKind,

    #[arg(long, help = "API version the input is written for")]
    pub from: ApiVersion,

    #[arg(long, help = "API version to produce (defaults to API_DEFAULT_VERSION)")]
    pub to: Option<ApiVersion>,

    #[arg(long, help = "Input file (JSON or YAML); reads stdin when omitted")]
    pub file: Option<PathBuf>,
}

pub async fn handle(args: ConvertArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let to = args.to.unwrap_or(config().api.default_version);
    let input = read_document(args.file.as_deref())?;
    let converter = VersionedEntityConverter::new();

    // A top-level array converts element-wise
    let output = match input {
        Value::Array(items) => {
            let count = items.len();
            let converted = converter.convert_many(args.kind, args.from, to, items)?;
            info!("Converted {} {} bodies from {} to {}", count, args.kind, args.from, to);
            Value::Array(converted)
        }
        body => converter.convert(args.kind, args.from, to, body)?,
    };

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => println!("{}", serde_json::to_string(&output)?),
    }
    Ok(())
}
