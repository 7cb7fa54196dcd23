pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "toctl")]
#[command(about = "toctl - Traffic Ops tenancy checks and API version conversion")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Tenant hierarchy authorization queries")]
    Tenancy(commands::tenancy::TenancyArgs),

    #[command(about = "Convert an entity body between API versions")]
    Convert(commands::convert::ConvertArgs),

    #[command(about = "Validate an entity body")]
    Validate(commands::validate::ValidateArgs),

    #[command(about = "Check Traffic Ops database connectivity")]
    Health,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Tenancy(args) => commands::tenancy::handle(args, output_format).await,
        Commands::Convert(args) => commands::convert::handle(args, output_format).await,
        Commands::Validate(args) => commands::validate::handle(args, output_format).await,
        Commands::Health => commands::health::handle(output_format).await,
    }
}
