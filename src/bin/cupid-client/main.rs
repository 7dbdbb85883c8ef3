//! cupid-client CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, ClientCommand};
use cupid_client::config::ClientConfig;
use cupid_client::devnet::{Devnet, DevnetConfig, DEVNET_SIGNER};
use cupid_client::evm::EvmChain;
use cupid_client::identity::{Identifier, ScanStatus};
use cupid_client::payment::PaymentIntent;
use cupid_client::requests::JsonFileStore;
use cupid_client::{CupidClient, Registration, TransferReceipt};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Identities present on a fresh `--devnet` chain: `(id, primary, secondary)`.
const DEVNET_IDENTITIES: &[(&str, &str, &str)] = &[
    (
        "@alice@cupid",
        "0x00000000000000000000000000000000000a11ce",
        "0x00000000000000000000000000000000000a11cf",
    ),
    ("@me@cupid", DEVNET_SIGNER, DEVNET_SIGNER),
];

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = cli.to_config()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("cupid-client v{}", env!("CARGO_PKG_VERSION"));

    let client = build_client(&cli, config).await?;
    client.connect().await?;

    match cli.command {
        ClientCommand::Ids => {
            let registrations = client.registered_identifiers().await;
            if let Some(ScanStatus::Failed { reason }) = client.index_status() {
                return Err(color_eyre::eyre::eyre!("Failed to load identifiers: {reason}"));
            }
            print_registrations(&registrations);
        }
        ClientCommand::Mine => {
            let registrations = client.my_identifiers().await?;
            if registrations.is_empty() {
                println!("No identifiers registered to this account");
            }
            print_registrations(&registrations);
        }
        ClientCommand::Resolve { id } => {
            let address = client.resolve(&Identifier::from(id.trim())).await?;
            println!("{address}");
        }
        ClientCommand::Send { id, amount } => {
            let receipt = client
                .send(&PaymentIntent::manual(&id, &amount))
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.user_message()))?;
            print_receipt(&client, &receipt);
        }
        ClientCommand::Request { from, to, amount } => {
            let to = Identifier::parse(&to)?;
            let request = client.request_payment(&from, &to, &amount).await?;
            println!(
                "Requested {} {} from {} to {} ({})",
                request.amount,
                client.config().network.currency_symbol,
                request.from_id,
                request.to_id,
                request.timestamp
            );
        }
        ClientCommand::Requests { id } => {
            let pending = client.pending_requests_for(&Identifier::from(id.trim())).await?;
            if pending.is_empty() {
                println!("No pending requests");
            }
            for request in pending {
                println!(
                    "{}\t{} -> {}\t{} {}",
                    request.timestamp,
                    request.from_id,
                    request.to_id,
                    request.amount,
                    client.config().network.currency_symbol
                );
            }
        }
        ClientCommand::PayRequest { id, timestamp } => {
            let request = client
                .pending_requests_for(&Identifier::from(id.trim()))
                .await?
                .into_iter()
                .find(|r| r.timestamp == timestamp)
                .ok_or_else(|| {
                    color_eyre::eyre::eyre!("No pending request for {id} at {timestamp}")
                })?;
            let receipt = client
                .pay_request(request)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.user_message()))?;
            print_receipt(&client, &receipt);
        }
        ClientCommand::Register {
            id,
            primary,
            secondary,
        } => {
            let receipt = client
                .register_identifier(&id, &primary, &secondary)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.user_message()))?;
            println!("Registered {id}");
            print_receipt(&client, &receipt);
        }
        ClientCommand::Update {
            id,
            primary,
            secondary,
        } => {
            let id = Identifier::parse(&id)?;
            let receipt = client
                .update_addresses(&id, &primary, &secondary)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.user_message()))?;
            println!("Updated {id}");
            print_receipt(&client, &receipt);
        }
    }

    Ok(())
}

async fn build_client(cli: &Cli, config: ClientConfig) -> color_eyre::Result<CupidClient> {
    let store = Arc::new(JsonFileStore::new(config.requests_path()));

    if cli.devnet {
        let devnet = Devnet::new(DevnetConfig::for_client(&config))?;
        for (id, primary, secondary) in DEVNET_IDENTITIES {
            devnet.seed_registration(id, primary, secondary);
        }
        info!("Using in-process devnet");
        return Ok(CupidClient::new(
            config,
            devnet.provider(),
            devnet.registry(),
            devnet.relay(),
            store,
        )?);
    }

    let private_key = cli.private_key.as_deref().ok_or_else(|| {
        color_eyre::eyre::eyre!("No signing key. Use --private-key, CUPID_PRIVATE_KEY or --devnet.")
    })?;
    let chain = EvmChain::connect(&config.network.rpc_url, private_key, &config).await?;
    Ok(CupidClient::new(
        config,
        chain.provider(),
        chain.registry(),
        chain.relay(),
        store,
    )?)
}

fn print_registrations(registrations: &[Registration]) {
    for registration in registrations {
        println!(
            "{}\tethereum {}\tpolygon {}\tblock {}",
            registration.id,
            registration.primary_address,
            registration.secondary_address,
            registration.block_number
        );
    }
}

fn print_receipt(client: &CupidClient, receipt: &TransferReceipt) {
    println!("Transaction: {}", receipt.transaction_hash);
    if let Some(block) = receipt.block_number {
        println!("Block: {block}");
    }
    println!(
        "Explorer: {}",
        client.config().network.tx_url(&receipt.transaction_hash)
    );
}
