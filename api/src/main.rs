use dotenv::dotenv;
use forum_api::{
    App,
    config::{Env, ServerConfig},
    router,
};
use mimalloc::MiMalloc;
use tokio::{
    net::TcpListener,
    signal::{self, ctrl_c},
};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    let is_dev = !matches!(
        std::env::var("ENVIRONMENT").as_deref(),
        Ok("staging") | Ok("production")
    );
    init_tracing(is_dev);

    let config = ServerConfig::new_from_env();
    if config.env == Env::Production {
        tracing::info!("Running in production");
    }

    let listen_addr = config.listen_addr.clone();
    let app = App::from_config(config)?;

    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!("Listening on {listen_addr}");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

fn init_tracing(is_dev: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("forum_api=debug,tower_http=info"));

    let fmt = if is_dev {
        tracing_subscriber::fmt::layer().boxed()
    } else {
        tracing_subscriber::fmt::layer().json().boxed()
    };

    tracing_subscriber::registry().with(filter).with(fmt).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }

        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(?e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
