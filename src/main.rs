use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{error_handling::HandleErrorLayer, http::StatusCode};
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use makerspace_watch::{
    create_router, AppState, AvailabilityMonitor, CalendarSync, Config, GoogleCalendarClient,
    HttpRenderClient, RelayNotifier, RunMode, StateStore,
};

// Error handler
async fn handle_error(error: BoxError) -> (StatusCode, String) {
    if error.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            "Request took too long".to_string(),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {}", error),
        )
    }
}

fn build_monitor(config: &Config) -> AvailabilityMonitor {
    let renderer = Arc::new(HttpRenderClient::new(&config.render_endpoint));
    let store = Arc::new(StateStore::new(&config.state_path));

    let mut monitor = AvailabilityMonitor::new(config.scan.clone(), renderer, store);

    if let Some(notifier_config) = &config.notifier {
        monitor = monitor.with_notifier(Arc::new(RelayNotifier::new(notifier_config.clone())));
    }

    if let Some(calendar_config) = &config.calendar {
        info!("Calendar sync enabled for {}", calendar_config.calendar_id);
        monitor = monitor.with_calendar(CalendarSync {
            api: Arc::new(GoogleCalendarClient::new(calendar_config)),
            calendar_id: calendar_config.calendar_id.clone(),
            title_prefix: calendar_config.title_prefix.clone(),
        });
    }

    if let Some(path) = &config.summary_path {
        monitor = monitor.with_summary_path(path.clone());
    }

    monitor
}

async fn serve(config: &Config, monitor: Arc<AvailabilityMonitor>) -> std::io::Result<()> {
    let app_state = Arc::new(AppState {
        monitor,
        trigger_auth_token: config.trigger_auth_token.clone(),
    });

    // A full multi-page scan with settle delays can take a while
    let request_timeout =
        config.scan.settle_delay * (config.scan.page_ceiling as u32 + 1) + Duration::from_secs(60);

    let app = create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .timeout(request_timeout)
            .layer(TraceLayer::new_for_http()),
    );

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid BIND_ADDR {}: {}", config.bind_addr, e),
        )
    })?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    // Set up signal handler for graceful shutdown
    let shutdown = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received interrupt signal, starting graceful shutdown");
            },
            _ = terminate => {
                info!("Received terminate signal, starting graceful shutdown");
            },
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server has been gracefully shut down");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    #[cfg(feature = "sentry-monitoring")]
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    info!(
        "Watching {} equipment items on {} ({})",
        config.scan.watch_list.len(),
        config.scan.calendar_url,
        config.scan.time_zone
    );

    let monitor = Arc::new(build_monitor(&config));

    match config.run_mode {
        RunMode::Once => match monitor.run_once().await {
            Ok(report) => info!(
                "Check complete: {} pages, {} available, {} new",
                report.pages_scanned,
                report.available,
                report.added.len()
            ),
            Err(e) => {
                error!("Availability check failed: {}", e);
                std::process::exit(1);
            }
        },
        RunMode::Serve => {
            if let Err(e) = serve(&config, monitor).await {
                error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
