use std::sync::Arc;

use inbox_relay::config::RelayConfig;
use inbox_relay::cycle::NotificationCycle;
use inbox_relay::delivery::DeliveryPolicy;
use inbox_relay::mail::GmailSource;
use inbox_relay::mail::auth::TokenStore;
use inbox_relay::notify::TwilioNotifier;
use inbox_relay::scheduler::spawn_scheduler;
use inbox_relay::store::ProcessedStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  required: TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN,");
        eprintln!("            TWILIO_WHATSAPP_NUMBER, TO_WHATSAPP_NUMBER");
        std::process::exit(1);
    });

    eprintln!("📬 inbox-relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Token file: {}", config.token_path.display());
    eprintln!("   Processed log: {}", config.processed_log_path.display());
    eprintln!(
        "   Polling every {}s, batch {}, {} retries\n",
        config.poll_interval.as_secs(),
        config.batch_size,
        config.max_retries,
    );

    // The service cannot run without a mail session: verify the credential
    // file up front so a missing token fails the startup, not the first
    // cycle.
    let tokens = TokenStore::new(config.token_path.clone(), reqwest::Client::new());
    if let Err(e) = tokens.load().await {
        eprintln!("Error: {e}");
        eprintln!("  Run the interactive authorization flow once to create the token file.");
        std::process::exit(1);
    }

    let source = Arc::new(GmailSource::new(tokens));
    let notifier = Arc::new(TwilioNotifier::new(&config));
    let cycle = Arc::new(NotificationCycle::new(
        source,
        ProcessedStore::new(config.processed_log_path.clone()),
        DeliveryPolicy::new(notifier, config.max_retries),
        config.batch_size,
    ));

    let (handle, stop) = spawn_scheduler(cycle, config.poll_interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received, shutting down");

    let _ = stop.send(true);
    handle.await?;

    Ok(())
}
