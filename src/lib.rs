//! # kerio-api
//!
//! An async Rust client for the JSON-RPC administration API shared by Kerio
//! Connect, Kerio Operator and Kerio Control.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kerio_api::{Config, KerioApiClient};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Load configuration from config.toml
//! let config = Config::new()?;
//!
//! // The first call logs in and keeps the session token
//! let mut client = KerioApiClient::new(config)?;
//! let domains = client
//!     .invoke("Domains.get", json!({"query": {"fields": ["id", "name"]}}))
//!     .await?;
//! println!("{domains}");
//!
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Products
//!
//! | Product  | Admin port | Client API path          |
//! |----------|-----------:|--------------------------|
//! | Connect  | 4040       | `/webmail/api/jsonrpc/`  |
//! | Operator | 4021       | `/myphone/api/jsonrpc/`  |
//! | Control  | 4081       | none                     |
//!
//! The administration API lives at `/admin/api/jsonrpc/`. The client API is
//! served on 443, or on 80 with `no_tls`.
//!
//! ## Configuration
//!
//! ```toml
//! [kerio]
//! hostname = "mail.example.com"
//! username = "admin"
//! password = "secret"
//! product = "connect"
//! client_mode = false
//! no_tls = false
//! verify_ssl = true
//! ```
//!
//! ## Errors
//!
//! Every call returns [`Result`], whose error is [`KerioError`]. Server side
//! `error` and `errors` payloads become [`KerioError::Protocol`] carrying the
//! method that failed.

pub mod api_client;
pub mod config;
pub mod dto;
pub mod error;
pub mod product;
pub mod session;

// Re-export commonly used types at the crate root
pub use api_client::KerioApiClient;
pub use config::{Config, Credentials, KerioConfig};
pub use error::{KerioError, Result};
pub use product::{Component, Endpoint, ProductVariant, Scheme};
pub use session::{AuthState, SessionState};
