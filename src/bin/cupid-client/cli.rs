//! CLI definition for cupid-client.

use clap::{Parser, Subcommand, ValueEnum};
use cupid_client::config::ClientConfig;
use std::path::PathBuf;

/// Resolve, pay and request payment by CUPID identifier.
#[derive(Parser, Debug)]
#[command(name = "cupid-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short, env = "CUPID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the payment request store.
    #[arg(long, env = "CUPID_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON-RPC endpoint.
    #[arg(long, env = "CUPID_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Hex private key of the signing account.
    #[arg(long, env = "CUPID_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Identity registry address.
    #[arg(long, env = "CUPID_REGISTRY")]
    pub registry: Option<String>,

    /// Payment relay address.
    #[arg(long, env = "CUPID_PAYMENT")]
    pub payment: Option<String>,

    /// Give up waiting for a confirmation after this many seconds.
    #[arg(long, env = "CUPID_CONFIRMATION_TIMEOUT")]
    pub confirmation_timeout_secs: Option<u64>,

    /// Run against an in-process simulated chain instead of an endpoint.
    #[arg(long)]
    pub devnet: bool,

    /// Log level.
    #[arg(long, value_enum, env = "CUPID_LOG_LEVEL")]
    pub log_level: Option<CliLogLevel>,

    /// Command to run.
    #[command(subcommand)]
    pub command: ClientCommand,
}

/// Client commands.
#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// List registered identifiers, newest first.
    Ids,
    /// List identifiers held by the signing account.
    Mine,
    /// Resolve an identifier through the registry.
    Resolve {
        /// Identifier, e.g. @alice@cupid.
        id: String,
    },
    /// Pay an identifier.
    Send {
        /// Destination identifier.
        id: String,
        /// Amount in the native currency, e.g. 1.5.
        amount: String,
    },
    /// Ask another identifier to pay one of yours.
    Request {
        /// Identifier expected to pay.
        #[arg(long)]
        from: String,
        /// Your identifier to be paid.
        #[arg(long)]
        to: String,
        /// Amount in the native currency.
        amount: String,
    },
    /// List pending requests addressed to an identifier.
    Requests {
        /// Payer identifier.
        id: String,
    },
    /// Pay a pending request.
    PayRequest {
        /// Payer identifier the request is addressed to.
        id: String,
        /// Request timestamp (milliseconds), as listed by `requests`.
        timestamp: u64,
    },
    /// Register a new identifier.
    Register {
        /// Identifier, e.g. @alice@cupid.
        id: String,
        /// Primary (Ethereum) address.
        primary: String,
        /// Secondary (Polygon) address.
        secondary: String,
    },
    /// Point an identifier you hold at new addresses.
    Update {
        /// Identifier.
        id: String,
        /// Primary (Ethereum) address.
        primary: String,
        /// Secondary (Polygon) address.
        secondary: String,
    },
}

/// Log level CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliLogLevel {
    /// Error messages only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages.
    Info,
    /// Debug messages.
    Debug,
    /// Trace messages (verbose).
    Trace,
}

impl Cli {
    /// Build the client configuration: file (or defaults), then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<ClientConfig> {
        let mut config = if let Some(ref path) = self.config {
            ClientConfig::from_file(path)?
        } else {
            ClientConfig::default()
        };

        if let Some(ref data_dir) = self.data_dir {
            config.data_dir.clone_from(data_dir);
        }
        if let Some(ref rpc_url) = self.rpc_url {
            config.network.rpc_url.clone_from(rpc_url);
        }
        if let Some(ref registry) = self.registry {
            config.contracts.registry.clone_from(registry);
        }
        if let Some(ref payment) = self.payment {
            config.contracts.payment.clone_from(payment);
        }
        if self.confirmation_timeout_secs.is_some() {
            config.payment.confirmation_timeout_secs = self.confirmation_timeout_secs;
        }
        if let Some(level) = self.log_level {
            config.log_level = level.into();
        }

        Ok(config)
    }
}

impl From<CliLogLevel> for String {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => "error".to_string(),
            CliLogLevel::Warn => "warn".to_string(),
            CliLogLevel::Info => "info".to_string(),
            CliLogLevel::Debug => "debug".to_string(),
            CliLogLevel::Trace => "trace".to_string(),
        }
    }
}
