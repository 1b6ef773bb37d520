/// Socios OPM - member registry and activity audit service
///
/// A Rust implementation of the Obra del Padre Mario member-management
/// backend: socio CRUD and bulk import, role-based access, activity
/// auditing, communications and report exports.

mod account;
mod api;
mod audit;
mod auth;
mod comunicaciones;
mod config;
mod context;
mod db;
mod error;
mod report;
mod roles;
mod server;
mod socios;
mod users;

use config::ServerConfig;
use context::AppContext;
use error::AppResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socios_opm=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   _____            _              ____  ____  __  ___
  / ___/____  _____(_)___  _____  / __ \/ __ \/  |/  /
  \__ \/ __ \/ ___/ / __ \/ ___/ / / / / /_/ / /|_/ /
 ___/ / /_/ / /__/ / /_/ (__  ) / /_/ / ____/ /  / /
/____/\____/\___/_/\____/____/  \____/_/   /_/  /_/

        Sistema de Gestión de Socios v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
