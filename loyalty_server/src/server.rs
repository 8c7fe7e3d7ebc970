use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, App, HttpServer};
use log::*;
use loyalty_engine::{HttpAccrualClient, LoyaltyDatabase, SqliteDatabase};

use crate::{accrual_worker::start_reconciliation_worker, config::ServerConfig, errors::ServerError, routes::health};

/// Opens the database, starts the reconciliation agent and serves the health endpoint until the process is stopped.
/// The agent is then signalled and allowed to finish any tick in progress before the database is closed.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let mut db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let accrual_url = config.accrual_url.as_deref().ok_or_else(|| {
        ServerError::ConfigurationError("LOYALTY_ACCRUAL_URL must be set to the accrual service address".into())
    })?;
    let client = HttpAccrualClient::new(accrual_url, config.request_timeout)
        .map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    let (worker, shutdown) = start_reconciliation_worker(db.clone(), client, config.agent_config());

    let srv = create_server_instance(&config)?;
    let result = srv.await.map_err(ServerError::from);

    info!("🚀️ Server stopped. Waiting for the reconciliation agent to finish");
    // The agent may already have exited, in which case there is no-one to notify
    let _ = shutdown.send(true);
    if let Err(e) = worker.await {
        error!("🔄️ Reconciliation worker did not shut down cleanly. {e}");
    }
    db.close().await;
    result
}

pub fn create_server_instance(config: &ServerConfig) -> Result<Server, ServerError> {
    let srv = HttpServer::new(|| {
        App::new().wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("loyalty::access_log")).service(health)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

#[cfg(test)]
mod test {
    use super::*;

    #[actix_web::test]
    async fn refuses_to_start_without_accrual_service() {
        let config = ServerConfig {
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            accrual_url: None,
            auto_migrate: false,
            ..ServerConfig::new("127.0.0.1", 0)
        };
        let err = run_server(config).await.unwrap_err();
        assert!(matches!(err, ServerError::ConfigurationError(_)), "{err}");
    }

    #[actix_web::test]
    async fn rejects_invalid_accrual_url() {
        let config = ServerConfig {
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            accrual_url: Some("ftp://accrual.local".into()),
            auto_migrate: true,
            ..ServerConfig::new("127.0.0.1", 0)
        };
        let err = run_server(config).await.unwrap_err();
        assert!(matches!(err, ServerError::ConfigurationError(_)), "{err}");
    }
}
