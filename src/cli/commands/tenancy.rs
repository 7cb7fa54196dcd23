use anyhow::Context;
use clap::{Args, Subcommand};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::convert::Upgrade;
use crate::database::DatabaseManager;
use crate::error::{ApiError, ErrorKind};
use crate::models::{DeliveryServiceNullable, TenantNullable};
use crate::tenancy::{
    InMemoryResources, InMemoryTenantStore, PgResourceTenants, PgTenantStore, ResourceTenants,
    TenancyError, TenantAuthorizer, TenantStore,
};
use crate::types::TenantId;

#[derive(Args)]
pub struct TenancyArgs {
    #[arg(
        long,
        global = true,
        help = "Read tenants and delivery services from a JSON/YAML file instead of the database"
    )]
    pub fixture: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: TenancyCommands,
}

#[derive(Subcommand)]
pub enum TenancyCommands {
    #[command(about = "Check whether a user's tenant may access a resource's tenant")]
    Authorized {
        #[arg(long, help = "Tenant id of the acting user")]
        user: TenantId,
        #[arg(long, help = "Tenant id owning the resource")]
        resource: TenantId,
    },

    #[command(about = "List tenant ids a user may access")]
    Accessible {
        #[arg(long, help = "Tenant id of the acting user")]
        user: TenantId,
    },

    #[command(about = "Show a user's tenant and its ancestors, with activation")]
    Ancestors {
        #[arg(long, help = "Tenant id of the acting user")]
        user: TenantId,
    },

    #[command(about = "List a user's tenant and every descendant, active or not")]
    Subtree {
        #[arg(long, help = "Tenant id of the acting user")]
        user: TenantId,
    },

    #[command(about = "Check access to a delivery service")]
    CheckDs {
        #[arg(long, help = "Tenant id of the acting user")]
        user: TenantId,
        #[arg(long, conflicts_with = "id", required_unless_present = "id", help = "Delivery service XML id")]
        xml_id: Option<String>,
        #[arg(long, help = "Delivery service id")]
        id: Option<i64>,
    },
}

/// Offline tenant tree for `--fixture`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenancyFixture {
    tenants: Vec<TenantNullable>,
    #[serde(default)]
    delivery_services: Vec<DeliveryServiceNullable>,
}

impl TenancyFixture {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let doc = read_document(Some(path))?;
        serde_json::from_value(doc).with_context(|| format!("Invalid fixture {}", path.display()))
    }

    fn into_stores(self) -> anyhow::Result<(InMemoryTenantStore, InMemoryResources)> {
        let mut tenants = Vec::with_capacity(self.tenants.len());
        for tenant in &self.tenants {
            if tenant.id.is_none() {
                anyhow::bail!("Fixture tenant {:?} has no id", tenant.name);
            }
            tenants.push(tenant.upgrade()?);
        }

        let mut resources = InMemoryResources::new();
        for ds in &self.delivery_services {
            let (Some(id), Some(xml_id)) = (ds.id, ds.xml_id.as_deref()) else {
                anyhow::bail!("Fixture delivery services need both id and xmlId");
            };
            resources = resources.with_delivery_service(id, xml_id, ds.tenant_id);
        }

        Ok((InMemoryTenantStore::from_tenants(tenants), resources))
    }
}

pub async fn handle(args: TenancyArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    match args.fixture {
        Some(path) => {
            let (store, resources) = TenancyFixture::load(&path)?.into_stores()?;
            execute(args.cmd, &TenantAuthorizer::new(store), &resources, &output_format).await
        }
        None => {
            let pool = DatabaseManager::pool().await?;
            let authorizer = TenantAuthorizer::new(PgTenantStore::new(pool.clone()));
            execute(args.cmd, &authorizer, &PgResourceTenants::new(pool), &output_format).await
        }
    }
}

async fn execute<S: TenantStore, R: ResourceTenants>(
    cmd: TenancyCommands,
    authorizer: &TenantAuthorizer<S>,
    resources: &R,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        TenancyCommands::Authorized { user, resource } => {
            let authorized = authorizer.is_authorized(user, resource).await?;
            match output_format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "user_tenant_id": user,
                        "resource_tenant_id": resource,
                        "authorized": authorized
                    }))?
                ),
                OutputFormat::Text => {
                    let verdict = if authorized { "may" } else { "may not" };
                    println!("Tenant {} {} access tenant {}", user, verdict, resource);
                }
            }
            Ok(())
        }
        TenancyCommands::Accessible { user } => {
            let ids = authorizer.resolve_accessible_tenant_ids(user).await?;
            if ids.is_empty() {
                return output_empty_collection(
                    output_format,
                    "tenant_ids",
                    "No accessible tenants (inactive tenant on the user's chain)",
                );
            }
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "tenant_ids": ids }))?)
                }
                OutputFormat::Text => {
                    let list: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                    println!("{}", list.join(" "));
                }
            }
            Ok(())
        }
        TenancyCommands::Ancestors { user } => {
            let chain = authorizer.resolve_all_ancestors(user).await?;
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "ancestors": chain }))?)
                }
                OutputFormat::Text => {
                    println!("{:<8} {:<8} {}", "ID", "ACTIVE", "NAME");
                    println!("{}", "-".repeat(40));
                    for tenant in &chain {
                        println!("{:<8} {:<8} {}", tenant.id, tenant.active, tenant.name);
                    }
                }
            }
            Ok(())
        }
        TenancyCommands::Subtree { user } => {
            let tenants = authorizer.resolve_subtree(user).await?;
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "tenants": tenants }))?)
                }
                OutputFormat::Text => {
                    println!("{:<8} {:<8} {:<8} {}", "ID", "PARENT", "ACTIVE", "NAME");
                    println!("{}", "-".repeat(48));
                    for tenant in &tenants {
                        let parent = tenant.parent_id.map_or("-".to_string(), |p| p.to_string());
                        println!("{:<8} {:<8} {:<8} {}", tenant.id, parent, tenant.active, tenant.name);
                    }
                }
            }
            Ok(())
        }
        TenancyCommands::CheckDs { user, xml_id, id } => {
            let (target, outcome) = match (xml_id, id) {
                (Some(xml_id), _) => {
                    let outcome = authorizer.check_delivery_service(resources, user, &xml_id).await;
                    (xml_id, outcome)
                }
                (None, Some(id)) => (
                    id.to_string(),
                    authorizer.check_delivery_service_id(resources, user, id).await,
                ),
                (None, None) => anyhow::bail!("Either --xml-id or --id is required"),
            };
            report_check(output_format, &target, outcome)
        }
    }
}

/// Denials are reported as results; system failures abort the command
fn report_check(
    output_format: &OutputFormat,
    target: &str,
    outcome: Result<(), TenancyError>,
) -> anyhow::Result<()> {
    match outcome {
        Ok(()) => output_success(
            output_format,
            &format!("Access to delivery service '{}' is authorized", target),
            Some(json!({ "authorized": true })),
        ),
        Err(err) if err.kind() == ErrorKind::User => {
            let message = err.to_string();
            let api_error = ApiError::from(err);
            output_error(output_format, &message, Some(api_error.error_code()))
        }
        Err(err) => Err(err.into()),
    }
}
