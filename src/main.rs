use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use inbox_relay::config::Config;
use inbox_relay::gmail_client::GmailConnector;
use inbox_relay::inbox::Inbox;
use inbox_relay::server::{router, AppState};

#[derive(Parser)]
#[command(name = "inbox-relay")]
#[command(about = "Serveur HTTP exposant la boîte de réception Gmail (lecture, marquage, corbeille)")]
#[command(version = "0.1.0")]
struct Args {
    /// Port d'écoute (remplace PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Code d'autorisation OAuth2 à usage unique (remplace AUTH_CODE)
    #[arg(long)]
    auth_code: Option<String>,

    /// Vérifier la configuration sans démarrer le serveur
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger le fichier .env s'il existe
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::init();

    let mut config = Config::new()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(code) = args.auth_code {
        config.gmail.auth_code = Some(code);
    }

    if args.check_config {
        println!("✅ Configuration valide !");
        println!("🌐 Port: {}", config.server.port);
        println!("🔑 Credentials: {}", config.gmail.credentials_path);
        println!("💾 Token: {}", config.gmail.token_path);
        println!("🏷️  Labels: {}", config.fetch.labels.join(", "));
        println!("📄 Format: {} (pages de {})", config.fetch.format.as_str(), config.fetch.page_size);
        println!("⚡ Requêtes simultanées: {}", config.fetch.concurrency);
        return Ok(());
    }

    let connector = Arc::new(GmailConnector::new(&config.gmail));
    let state = AppState {
        inbox: Arc::new(Inbox::new(connector, &config.fetch)),
        empty_inbox_not_found: config.server.empty_inbox_not_found,
    };

    let address = format!("0.0.0.0:{}", config.server.port);
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            error!("❌ Port {} is already in use", config.server.port);
            error!("   Stop the other process or set PORT in your .env file");
            return Err(e).context("Unable to bind listening port");
        }
        Err(e) => return Err(e).with_context(|| format!("Unable to bind {}", address)),
    };

    info!("🚀 Server running at http://localhost:{}", config.server.port);

    axum::serve(listener, router(state))
        .await
        .context("HTTP server stopped unexpectedly")?;

    Ok(())
}
