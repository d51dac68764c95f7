mod client;
mod token_store;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::ApiClient;
use serde_json::{Value, json};
use std::path::PathBuf;
use token_store::TokenStore;

#[derive(Parser)]
#[command(name = "telecom", version, about = "Telecom accounts CLI")]
struct Cli {
    /// Server URL
    #[arg(long, env = "TELECOM_URL", default_value = "http://localhost:8000")]
    server: String,

    /// Where the session token is kept (default: <config dir>/telecom/token)
    #[arg(long, env = "TELECOM_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TELECOM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and save the token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TELECOM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the logged-in user with contracts and services
    Me,
    /// Revoke the saved token
    Logout,
    /// Exchange the saved token for a fresh one
    Refresh,
    /// Manage contracts
    Contracts {
        #[command(subcommand)]
        action: ContractCommands,
    },
    /// Manage services
    Services {
        #[command(subcommand)]
        action: ServiceCommands,
    },
}

#[derive(Subcommand)]
enum ContractCommands {
    /// List all contracts
    List,
    /// Create a contract owned by the logged-in user
    Create {
        /// Contract number, e.g. CTR-1
        #[arg(long)]
        number: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,
        /// active, suspended or cancelled
        #[arg(long)]
        status: Option<String>,
    },
    /// Delete a contract and its services
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// List all services
    List,
    /// Add a service to a contract
    Create {
        #[arg(long)]
        contract_id: i64,
        /// internet or tv
        #[arg(long = "type")]
        service_type: String,
        #[arg(long)]
        plan: String,
        /// Monthly price, e.g. 29.99
        #[arg(long)]
        price: String,
    },
    /// Delete a service
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let token_path = match cli.token_file {
        Some(path) => path,
        None => TokenStore::default_path()?,
    };
    let api = ApiClient::new(&cli.server, TokenStore::new(token_path));

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
        } => {
            let body = api
                .post(
                    "/register",
                    &json!({"name": name, "email": email, "password": password}),
                )
                .await?;
            save_token(&api, &body)?;
            println!("Registered and logged in as {}", str_field(&body["user"], "email"));
        }
        Commands::Login { email, password } => {
            let body = api
                .post("/login", &json!({"email": email, "password": password}))
                .await?;
            save_token(&api, &body)?;
            println!("Logged in as {}", str_field(&body["user"], "name"));
        }
        Commands::Me => cmd_me(&api).await?,
        Commands::Logout => {
            api.post_authed("/logout", &json!({})).await?;
            api.store().clear()?;
            println!("Logged out");
        }
        Commands::Refresh => {
            let body = api.post_authed("/refresh", &json!({})).await?;
            save_token(&api, &body)?;
            println!("Token refreshed");
        }
        Commands::Contracts { action } => cmd_contracts(&api, action).await?,
        Commands::Services { action } => cmd_services(&api, action).await?,
    }

    Ok(())
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or("-")
}

fn save_token(api: &ApiClient, body: &Value) -> Result<()> {
    let token = body
        .get("access_token")
        .and_then(|v| v.as_str())
        .context("Response did not contain an access token")?;
    api.store().save(token)
}

fn print_services(services: &[Value], indent: &str) {
    for service in services {
        println!(
            "{}#{:<5} {:10} {:25} {}",
            indent,
            service.get("id").and_then(|v| v.as_i64()).unwrap_or_default(),
            str_field(service, "type"),
            str_field(service, "plan_name"),
            service.get("price").map(|p| p.to_string()).unwrap_or_default(),
        );
    }
}

fn print_contract(contract: &Value) {
    println!(
        "#{:<5} {:15} {:12} since {}",
        contract.get("id").and_then(|v| v.as_i64()).unwrap_or_default(),
        str_field(contract, "contract_number"),
        str_field(contract, "status"),
        str_field(contract, "start_date"),
    );
    if let Some(services) = contract.get("services").and_then(|v| v.as_array()) {
        print_services(services, "    ");
    }
}

async fn cmd_me(api: &ApiClient) -> Result<()> {
    let body = api.get_authed("/me").await?;
    let user = &body["user"];
    println!("Name:  {}", str_field(user, "name"));
    println!("Email: {}", str_field(user, "email"));
    println!("Role:  {}", str_field(user, "role"));

    let contracts = user
        .get("contracts")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    if contracts.is_empty() {
        println!("\nNo contracts.");
    } else {
        println!("\nContracts:");
        for contract in contracts {
            print_contract(contract);
        }
    }
    Ok(())
}

async fn cmd_contracts(api: &ApiClient, action: ContractCommands) -> Result<()> {
    match action {
        ContractCommands::List => {
            let body = api.get("/contracts").await?;
            let contracts = body["data"].as_array().context("Expected array response")?;
            if contracts.is_empty() {
                println!("No contracts found.");
            }
            for contract in contracts {
                print_contract(contract);
            }
        }
        ContractCommands::Create {
            number,
            start_date,
            status,
        } => {
            let mut payload = json!({"contract_number": number, "start_date": start_date});
            if let Some(status) = status {
                payload["status"] = json!(status);
            }
            let body = api.post_authed("/contract/create", &payload).await?;
            println!(
                "Contract created: {}",
                body["contract"]["id"].as_i64().unwrap_or_default()
            );
        }
        ContractCommands::Delete { id } => {
            api.delete_authed(&format!("/contract/{}", id)).await?;
            println!("Contract {} deleted", id);
        }
    }
    Ok(())
}

async fn cmd_services(api: &ApiClient, action: ServiceCommands) -> Result<()> {
    match action {
        ServiceCommands::List => {
            let body = api.get("/services").await?;
            let services = body["data"].as_array().context("Expected array response")?;
            if services.is_empty() {
                println!("No services found.");
            }
            print_services(services, "");
        }
        ServiceCommands::Create {
            contract_id,
            service_type,
            plan,
            price,
        } => {
            // Sent as a string so the amount is not rounded on the way
            let payload = json!({
                "contract_id": contract_id,
                "type": service_type,
                "plan_name": plan,
                "price": price,
            });
            let body = api.post_authed("/service/create", &payload).await?;
            println!(
                "Service created: {}",
                body["service"]["id"].as_i64().unwrap_or_default()
            );
        }
        ServiceCommands::Delete { id } => {
            api.delete_authed(&format!("/service/{}", id)).await?;
            println!("Service {} deleted", id);
        }
    }
    Ok(())
}
