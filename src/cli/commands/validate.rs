use clap::{Args, ValueEnum};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::entity::{fetch_by_id, Entity, ValidationErrors};
use crate::models::{ParameterNullable, Role, TenantNullable};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ValidateKind {
    Role,
    Parameter,
    Tenant,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[arg(value_enum, help = "Entity kind")]
    pub kind: ValidateKind,

    #[arg(long, help = "Input file (JSON or YAML); reads stdin when omitted")]
    pub file: Option<PathBuf>,

    #[arg(long, conflicts_with = "file", help = "Validate the stored row with this id instead")]
    pub id: Option<i64>,

    #[arg(long, help = "Privilege level of the acting user (roles only)")]
    pub priv_level: Option<i32>,
}

pub async fn handle(args: ValidateArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let outcome = match args.kind {
        ValidateKind::Role => {
            let role: Role = load(args.id, args.file.as_deref()).await?;
            if let Some(level) = args.priv_level {
                if let Err(err) = role.check_priv_level(level) {
                    return output_error(&output_format, &err.to_string(), Some("FORBIDDEN"));
                }
            }
            check(&role)
        }
        ValidateKind::Parameter => {
            check(&load::<ParameterNullable>(args.id, args.file.as_deref()).await?)
        }
        ValidateKind::Tenant => check(&load::<TenantNullable>(args.id, args.file.as_deref()).await?),
    };

    match outcome {
        Ok(name) => output_success(
            &output_format,
            &format!("{} is valid", name),
            Some(json!({ "valid": true })),
        ),
        Err(errs) => {
            if let OutputFormat::Json = output_format {
                let fields: serde_json::Map<String, Value> = errs
                    .fields()
                    .iter()
                    .map(|(field, msg)| (field.to_string(), json!(msg)))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "success": false,
                        "valid": false,
                        "field_errors": fields
                    }))?
                );
                return Ok(());
            }
            output_error(&output_format, &errs.to_string(), Some("VALIDATION_ERROR"))
        }
    }
}

/// Read the entity from the database when an id is given, otherwise from a document
async fn load<E: Entity + DeserializeOwned>(id: Option<i64>, file: Option<&Path>) -> anyhow::Result<E> {
    match id {
        Some(id) => {
            let pool = DatabaseManager::pool().await?;
            fetch_by_id::<E>(&pool, id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("{} {} not found", E::TYPE_NAME, id))
        }
        None => Ok(serde_json::from_value(read_document(file)?)?),
    }
}

fn check<E: Entity>(entity: &E) -> Result<String, ValidationErrors> {
    entity.validate()?;
    Ok(format!("{} '{}'", E::TYPE_NAME, entity.audit_name()))
}
