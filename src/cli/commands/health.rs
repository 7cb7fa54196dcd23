use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    match DatabaseManager::health_check().await {
        Ok(()) => {
            output_success(&output_format, "Traffic Ops database is reachable", Some(json!({ "database": "ok" })))?;
            DatabaseManager::close().await;
            Ok(())
        }
        Err(err) => {
            output_error(&output_format, &format!("Database check failed: {}", err), Some("SERVICE_UNAVAILABLE"))?;
            Err(err.into())
        }
    }
}
