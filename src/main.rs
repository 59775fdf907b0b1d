use tokio::{net::TcpListener, signal};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crm_app::{
    build_app,
    config::{LogFormat, DEFAULT_SECRET_KEY},
    AppError, Environment, Settings,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // config errors surface here, before anything listens
    let settings = Settings::from_env()?;
    init_tracing(&settings);

    tracing::info!(?settings, "configuration loaded");
    if settings.environment() == Environment::Unknown {
        tracing::warn!(
            "unrecognised ENVIRONMENT {:?}, treating as unknown",
            settings.environment
        );
    }
    if settings.is_production() && settings.secret_key == DEFAULT_SECRET_KEY {
        tracing::warn!("SECRET_KEY is still the built-in default in production");
    }

    let addr = settings.bind_addr();
    let app = build_app(settings)?;

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// `RUST_LOG` wins over `LOG_LEVEL` when both are set.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{0},tower_http={0}", settings.log_level))
    });
    let registry = tracing_subscriber::registry().with(filter);

    match settings.log_format {
        LogFormat::Full => registry.with(fmt::layer()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
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

    tracing::info!("shutdown signal received");
}
