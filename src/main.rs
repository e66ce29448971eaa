use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use travel_audit::{
    api::create_router,
    application::retention::{PeriodicTaskRunner, TaskError},
    config::LogFormat,
    ApplicationBuilder, Config,
};

/// How often idle sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    init_tracing(config.log_format);

    info!("Starting travel admin activity service");

    config.validate()?;
    info!("Configuration loaded and validated");

    let builder = ApplicationBuilder::new(config.clone())
        .with_database()
        .await?
        .with_infrastructure()?;

    // Start retention in background
    let retention = builder.build_retention()?;
    tokio::spawn(Arc::clone(&retention).run());
    info!(
        "Retention scheduler started: keeping {} days, every {:?}",
        config.audit_retention_days,
        retention.config().interval
    );

    let state = builder.build()?;

    // Sweep idle sessions and their security state
    let sweeper = PeriodicTaskRunner::new(
        Arc::new(state.clone()),
        SESSION_SWEEP_INTERVAL,
        "session-sweep",
    );
    let max_idle = config.session_idle_timeout();
    tokio::spawn(async move {
        sweeper
            .run(move |state| async move {
                let evicted = state.sessions.evict_idle(max_idle);
                for session_id in &evicted {
                    state.security_events.forget_session(session_id);
                }
                if !evicted.is_empty() {
                    info!("Evicted {} idle sessions", evicted.len());
                }
                Ok::<(), TaskError>(())
            })
            .await
    });

    let app = create_router(state);

    info!("Listening on {}", config.listen_addr);
    let listener = TcpListener::bind(&config.listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down");
    })
    .await?;

    Ok(())
}
