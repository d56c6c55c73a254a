//! Development server for portal UI work
//!
//! Runs the mock portal backend with a seeded dataset so a frontend (or the
//! client crates) can be developed without the real backend.
//!
//! Usage: cargo run -p dev-server
//!
//! Reads `.env` if present. `IP_ADDRESS` and `PORT` choose the bind address
//! (default 127.0.0.1:5000, matching the client's default base url).

use anyhow::Result;
use test_helpers::backend::Config;
use test_helpers::mock::DevDataset;
use test_helpers::telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = telemetry::get_subscriber("info");
    telemetry::init_subscriber(subscriber);

    info!("🚀 Starting portal development server");
    let config = Config::from_env()?;
    let app = test_helpers::spawn_app_with(config).await;
    info!("✅ Mock API running at {}", app.client.address);

    info!("📊 Setting up development data...");
    let dataset = match DevDataset::create(&app).await {
        Ok(dataset) => dataset,
        Err(e) => {
            telemetry::log_error(e);
            anyhow::bail!("failed to seed development data");
        }
    };
    // The seeding session is not meant to be reused by the UI.
    app.client.session.sign_out();

    info!("🎯 Development server ready!");
    info!("   PORTAL_API_URL={}", app.client.address);
    info!("");
    dataset.print_summary();
    info!("");
    info!("👋 Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("🛑 Shutting down development server");
    Ok(())
}
