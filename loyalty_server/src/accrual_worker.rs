use log::*;
use loyalty_engine::{AccrualClient, AgentConfig, ReconciliationAgent, SqliteDatabase};
use tokio::{sync::watch, task::JoinHandle};

/// Starts the reconciliation agent on its own task.
///
/// The agent runs until `true` is sent on the returned channel (or the sender is dropped). Await the returned
/// `JoinHandle` after signalling to let a tick in progress finish.
pub fn start_reconciliation_worker<C>(
    db: SqliteDatabase,
    client: C,
    config: AgentConfig,
) -> (JoinHandle<()>, watch::Sender<bool>)
where
    C: AccrualClient + Clone + Send + Sync + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    debug!(
        "🔄️ Starting reconciliation worker. Tick every {}s, deadline {}s",
        config.poll_interval.as_secs(),
        config.tick_deadline.as_secs()
    );
    let agent = ReconciliationAgent::new(db, client, config);
    let handle = tokio::spawn(agent.run(shutdown_rx));
    (handle, shutdown_tx)
}
