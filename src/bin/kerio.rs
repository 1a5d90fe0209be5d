use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kerio_api::{Config, KerioApiClient};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kerio")]
#[command(about = "Kerio Connect / Operator / Control JSON-RPC CLI", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Ask the server for its API version
    kerio api-version

    # Call any method with JSON params
    kerio call Domains.get --params '{\"query\":{\"fields\":[\"id\",\"name\"]}}'

    # Ten largest mailboxes per domain, as CSV
    kerio mailbox-usage --limit 10 --scripted")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a JSON-RPC method and print its result
    Call {
        /// Method name, e.g. Users.get
        method: String,
        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },
    /// Upload a file (e.g. a user photo)
    Upload {
        file: PathBuf,
    },
    /// Print the server API version
    ApiVersion,
    /// Print the server's named constants
    Constants,
    /// Report mailbox usage per domain
    MailboxUsage {
        /// Users listed per domain
        #[arg(short, long, default_value = "10")]
        limit: u32,
        /// Print `user@domain,bytes` lines only
        #[arg(short, long)]
        scripted: bool,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tokio::runtime::Runtime::new()?.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_path(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    if config.kerio.password.is_empty() {
        if let Ok(password) = std::env::var("KERIO_PASSWORD") {
            config.kerio.password = password;
        }
    }

    let mut client = KerioApiClient::new(config)?;
    info!("Using {}", client.uri()?);
    let outcome = execute(&mut client, cli.command).await;

    let logout = if client.is_authenticated() {
        Some(client.logout().await)
    } else {
        None
    };
    settle(outcome, logout)
}

/// Combine the command's outcome with the closing logout. A command failure
/// wins; a logout failure only fails an otherwise successful run.
fn settle(outcome: Result<()>, logout: Option<kerio_api::Result<Value>>) -> Result<()> {
    match (outcome, logout) {
        (Err(err), Some(Err(logout_err))) => {
            warn!("Logout failed: {}", logout_err);
            Err(err)
        }
        (Ok(()), Some(Err(logout_err))) => Err(logout_err.into()),
        (outcome, _) => outcome,
    }
}

async fn execute(client: &mut KerioApiClient, command: Commands) -> Result<()> {
    match command {
        Commands::Call { method, params } => {
            let params: Value =
                serde_json::from_str(&params).context("--params must be valid JSON")?;
            let result = client.invoke(&method, params).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Upload { file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let result = client.upload(data, &file.to_string_lossy()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::ApiVersion => {
            println!("{}", client.get_api_version().await?);
        }
        Commands::Constants => {
            let mut constants: Vec<_> = client.get_constants().await?.into_iter().collect();
            constants.sort_by(|a, b| a.0.cmp(&b.0));
            for (name, value) in constants {
                println!("{name} = {value}");
            }
        }
        Commands::MailboxUsage { limit, scripted } => {
            usage::run(client, limit, scripted).await?;
        }
    }
    Ok(())
}

// Mailbox usage report for Kerio Connect
mod usage {
    use anyhow::Result;
    use kerio_api::KerioApiClient;
    use serde::Deserialize;
    use serde_json::json;
    use tracing::info;

    #[derive(Debug, Deserialize)]
    struct Domain {
        id: String,
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct DomainList {
        #[serde(default)]
        list: Vec<Domain>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ConsumedSize {
        value: f64,
        units: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct User {
        login_name: String,
        #[serde(default)]
        full_name: String,
        consumed_size: ConsumedSize,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct UserList {
        #[serde(default)]
        list: Vec<User>,
        #[serde(default)]
        total_items: u64,
    }

    fn unit_bytes(units: &str) -> f64 {
        match units {
            "KiloBytes" => 1024.0,
            "MegaBytes" => 1024.0 * 1024.0,
            "GigaBytes" => 1024.0 * 1024.0 * 1024.0,
            _ => 1.0,
        }
    }

    pub async fn run(client: &mut KerioApiClient, limit: u32, scripted: bool) -> Result<()> {
        let domains: DomainList = client
            .call("Domains.get", &json!({"query": {"fields": ["id", "name"]}}))
            .await?;
        info!("Found {} domain(s)", domains.list.len());

        for domain in domains.list {
            if !scripted {
                println!(" - Domain {}", domain.name);
            }

            let users: UserList = client
                .call(
                    "Users.get",
                    &json!({
                        "query": {
                            "fields": ["loginName", "fullName", "consumedSize"],
                            "orderBy": [{"columnName": "consumedSize", "direction": "Desc"}],
                            "start": 0,
                            "limit": limit
                        },
                        "domainId": domain.id
                    }),
                )
                .await?;

            if users.total_items == 0 {
                if !scripted {
                    println!("   ! No users in this domain.\n");
                }
                continue;
            }

            for user in users.list {
                let address = format!("{}@{}", user.login_name, domain.name);
                let size = &user.consumed_size;
                if scripted {
                    let bytes = size.value * unit_bytes(&size.units);
                    println!("{},{}", address, bytes as u64);
                } else {
                    println!(
                        "   * {} ({}) consumes {} {}.",
                        address, user.full_name, size.value, size.units
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerio_api::KerioError;

    #[test]
    fn test_command_error_survives_failed_logout() {
        let outcome = Err(anyhow::anyhow!("Users.get failed"));
        let logout = Some(Err(KerioError::Authentication("session expired".to_string())));
        let err = settle(outcome, logout).unwrap_err();
        assert_eq!(err.to_string(), "Users.get failed");
    }

    #[test]
    fn test_failed_logout_fails_successful_command() {
        let logout = Some(Err(KerioError::protocol("Session gone", Some("Session.logout"))));
        let err = settle(Ok(()), logout).unwrap_err();
        assert_eq!(err.to_string(), "While running Session.logout: Session gone");

        assert!(settle(Ok(()), Some(Ok(Value::Null))).is_ok());
        assert!(settle(Ok(()), None).is_ok());
    }

    #[test]
    fn test_cli_parses_call_with_params() {
        let cli = Cli::parse_from(["kerio", "call", "Users.get", "--params", "{\"domainId\":\"1\"}"]);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        match cli.command {
            Commands::Call { method, params } => {
                assert_eq!(method, "Users.get");
                assert_eq!(params, "{\"domainId\":\"1\"}");
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_cli_mailbox_usage_defaults() {
        let cli = Cli::parse_from(["kerio", "-c", "/etc/kerio.toml", "mailbox-usage"]);
        assert_eq!(cli.config, PathBuf::from("/etc/kerio.toml"));
        assert!(matches!(
            cli.command,
            Commands::MailboxUsage { limit: 10, scripted: false }
        ));
    }
}
