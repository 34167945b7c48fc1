use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use wba_resolver::{
    generate_user_id, validate, ApiResult, AuthClient, ClientConfig, LogFormat, Resolver,
    TestEndpoint,
};

#[derive(Parser)]
#[command(name = "wba", about = "DID:WBA document publishing and authentication", version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a DID Document for a user id after validating it
    Upload {
        user_id: String,
        /// File containing the DID Document JSON
        file: PathBuf,
    },
    /// Resolve a did:wba identifier
    Retrieve { did: String },
    /// Fetch a user's DID Document from the hosting service
    RetrieveBasic { user_id: String },
    /// Check a DID Document file without uploading it
    Validate { file: PathBuf },
    /// Call a test endpoint, optionally presenting a bearer token
    Probe {
        /// `test` or `test401`
        endpoint: TestEndpoint,
        #[arg(long)]
        token: Option<String>,
    },
    /// Exchange a DID Document and private key for an access token
    Exchange {
        did_document: PathBuf,
        private_key: PathBuf,
    },
    /// Ask the demo endpoint for a new DID Document and key
    Generate,
    /// Print a random user id
    NewId {
        #[arg(long, default_value_t = 16)]
        length: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::load(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    match run(cli.command, config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Runs a command and returns whether it succeeded
async fn run(command: Command, config: ClientConfig) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Command::Upload { user_id, file } => {
            let raw = std::fs::read_to_string(file)?;
            let resolver = Resolver::new(config)?;
            print_result(&resolver.publish(&user_id, &raw).await)
        }
        Command::Retrieve { did } => {
            let resolver = Resolver::new(config)?;
            print_result(&resolver.retrieve(&did).await)
        }
        Command::RetrieveBasic { user_id } => {
            let resolver = Resolver::new(config)?;
            print_result(&resolver.retrieve_basic(&user_id).await)
        }
        Command::Validate { file } => {
            let raw = std::fs::read_to_string(file)?;
            match validate(&raw) {
                Ok(doc) => {
                    println!("Valid DID Document: {}", doc.id);
                    Ok(true)
                }
                Err(e) => {
                    eprintln!("Invalid DID Document: {e}");
                    Ok(false)
                }
            }
        }
        Command::Probe { endpoint, token } => {
            let client = AuthClient::new(config)?;
            let result = client.probe(endpoint, token.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(result.ok)
        }
        Command::Exchange {
            did_document,
            private_key,
        } => {
            let did_document = std::fs::read_to_string(did_document)?;
            let private_key = std::fs::read_to_string(private_key)?;
            let client = AuthClient::new(config)?;
            print_result(&client.exchange(&did_document, &private_key).await)
        }
        Command::Generate => {
            let resolver = Resolver::new(config)?;
            print_result(&resolver.generate().await)
        }
        Command::NewId { length } => {
            println!("{}", generate_user_id(length));
            Ok(true)
        }
    }
}

fn print_result<T: Serialize>(result: &ApiResult<T>) -> Result<bool, Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(result.ok)
}

fn init_tracing(config: &ClientConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.log.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}
