pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "dashctl")]
#[command(about = "dashctl - operator tooling for the dashboard API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Generate a random base64 sealing key (32 bytes)")]
    GenerateKey,

    #[command(about = "Seal a secret with SEALING_KEY")]
    Seal { text: String },

    #[command(about = "Open a sealed value with SEALING_KEY")]
    Open {
        sealed: String,
        #[arg(long, help = "Return the input unchanged when it cannot be opened")]
        lenient: bool,
    },

    #[command(about = "Mint a development JWT")]
    Token {
        uid: String,
        company: String,
        role: String,
        #[arg(long, help = "Lifetime in hours (defaults to the configured expiry)")]
        hours: Option<u64>,
    },

    #[command(about = "Show the mirror document key for a display name")]
    Sanitize { name: String },
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

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::GenerateKey => commands::keys::generate_key(&output_format),
        Commands::Seal { text } => commands::keys::seal(&text, &output_format),
        Commands::Open { sealed, lenient } => commands::keys::open(&sealed, lenient, &output_format),
        Commands::Token { uid, company, role, hours } => {
            commands::token::mint(&uid, &company, &role, hours, &output_format)
        }
        Commands::Sanitize { name } => commands::sanitize::show(&name, &output_format),
    }
}
