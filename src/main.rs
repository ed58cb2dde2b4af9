use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use bizops_api as api;
use bizops_api::notifications::{
    HttpMailer, LogMailer, Mailer, NotificationDispatcher, NotificationWorker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("loading configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("connecting to database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Outbound email runs beside the request path
    let mailer: Arc<dyn Mailer> = match cfg.mail_relay_url.as_deref() {
        Some(url) => {
            info!(relay = %url, "Delivering email through HTTP relay");
            Arc::new(
                HttpMailer::new(url, cfg.mail_from.clone())?
                    .with_retry_policy(3, Duration::from_millis(250)),
            )
        }
        None => {
            warn!("mail_relay_url not configured; emails will only be logged");
            Arc::new(LogMailer::new(cfg.mail_from.clone()))
        }
    };
    let (dispatcher, notification_rx) =
        NotificationDispatcher::channel(cfg.notification_queue_capacity);
    let worker = NotificationWorker::new(mailer, db_arc.clone());
    let worker_handle = tokio::spawn(worker.run(notification_rx));

    // Build services
    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        dispatcher,
        Arc::new(api::services::order_number::RandomOrderNumbers),
    );
    let auth_service = Arc::new(api::auth::AuthService::new(api::auth::AuthConfig::from(
        &cfg,
    )));
    let app_state = api::AppState::new(db_arc, auth_service, services, cfg.environment.clone());

    let app = api::build_router(app_state, &cfg);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!("bizops-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and every dispatcher clone) is gone, so the worker drains and exits
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "Notification worker ended abnormally");
    }
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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
    info!("Shutdown signal received");
}
