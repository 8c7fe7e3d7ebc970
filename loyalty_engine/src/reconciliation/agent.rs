use std::time::Duration;

use log::*;
use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior},
};

use super::{ReconciliationError, TickReport, WorkerPool};
use crate::{
    accrual::{AccrualClient, AccrualOutcome},
    traits::{AccrualUpdateResult, OrderManagement},
};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// How often a reconciliation tick is started
    pub poll_interval: Duration,
    /// How long a single tick may run before it is abandoned
    pub tick_deadline: Duration,
    /// The maximum number of concurrent requests to the accrual service
    pub workers: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(5), tick_deadline: Duration::from_secs(30), workers: 1 }
    }
}

/// Reconciles pending orders against the accrual service.
///
/// Ticks never overlap. [`run`](Self::run) executes each tick to completion (or to its deadline) before waiting for
/// the next one, and ticks that fall due in the meantime are skipped.
pub struct ReconciliationAgent<B, C> {
    db: B,
    pool: WorkerPool<C>,
    config: AgentConfig,
    backoff_until: Option<Instant>,
}

impl<B, C> std::fmt::Debug for ReconciliationAgent<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationAgent ({:?}, {} workers)", self.config.poll_interval, self.pool_size())
    }
}

impl<B, C> ReconciliationAgent<B, C> {
    fn pool_size(&self) -> usize {
        self.config.workers.max(1)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, C> ReconciliationAgent<B, C>
where
    B: OrderManagement,
    C: AccrualClient + Clone + Send + Sync + 'static,
{
    pub fn new(db: B, client: C, config: AgentConfig) -> Self {
        let pool = WorkerPool::new(client, config.workers);
        Self { db, pool, config, backoff_until: None }
    }

    /// Runs one reconciliation pass over every pending order, with no deadline.
    ///
    /// Results are applied as they arrive. A `RateLimited` or `Transient` outcome stops the workers from taking new
    /// orders, but results already in flight are still applied. The interruption is recorded in the report; it is not
    /// an error.
    pub async fn tick(&mut self) -> Result<TickReport, ReconciliationError> {
        let pending = self.db.fetch_pending_order_numbers().await?;
        if pending.is_empty() {
            return Err(ReconciliationError::NoPendingOrders);
        }
        let mut report = TickReport::new(pending.len());
        debug!("🔄️ Reconciling {} pending orders with {} workers", pending.len(), self.pool.size());
        let mut handle = self.pool.dispatch(pending);
        while let Some((number, outcome)) = handle.next_result().await {
            trace!("🔄️ Order {number}: {outcome}");
            match outcome {
                AccrualOutcome::RateLimited { retry_after } => {
                    handle.abort();
                    if let Some(delay) = retry_after {
                        let until = Instant::now() + delay;
                        self.backoff_until = Some(self.backoff_until.map_or(until, |b| b.max(until)));
                    }
                    report.interrupted_by.get_or_insert(ReconciliationError::RateLimited { retry_after });
                },
                AccrualOutcome::Transient(reason) => {
                    handle.abort();
                    warn!("🔄️ Accrual request for order {number} failed: {reason}");
                    report.interrupted_by.get_or_insert(ReconciliationError::Transient(reason));
                },
                AccrualOutcome::Unknown => report.unknown += 1,
                outcome => {
                    if let AccrualOutcome::Malformed(reason) = &outcome {
                        warn!("🔄️ Order {number} will be marked invalid. The accrual service sent a {reason}");
                    }
                    let Some(update) = outcome.into_update(number.clone()) else {
                        continue;
                    };
                    match self.db.apply_accrual_update(&update).await {
                        Ok(AccrualUpdateResult::Credited(order, op)) => {
                            info!("🔄️ Order {} processed. {} credited to {}", order.number, op.amount, order.owner);
                            report.credited += 1;
                        },
                        Ok(AccrualUpdateResult::StatusUpdated(order)) => {
                            debug!("🔄️ Order {} is now {}", order.number, order.status);
                            report.updated += 1;
                        },
                        Ok(AccrualUpdateResult::Skipped) => report.skipped += 1,
                        Err(e) => {
                            error!("🔄️ Could not apply {} to order {number}: {e}", update.status);
                            report.failed += 1;
                        },
                    }
                },
            }
        }
        Ok(report)
    }

    /// Runs a tick, subject to any rate-limit backoff and the configured deadline.
    ///
    /// If the deadline passes, the tick is dropped. Each order is written in its own transaction, so anything not yet
    /// committed is rolled back and the in-flight requests are cancelled.
    pub async fn run_tick(&mut self) -> Result<TickReport, ReconciliationError> {
        if let Some(until) = self.backoff_until {
            let now = Instant::now();
            if now < until {
                return Err(ReconciliationError::RateLimited { retry_after: Some(until - now) });
            }
            self.backoff_until = None;
        }
        let deadline = self.config.tick_deadline;
        match tokio::time::timeout(deadline, self.tick()).await {
            Ok(result) => result,
            Err(_) => Err(ReconciliationError::DeadlineExceeded(deadline)),
        }
    }

    /// Runs ticks on a fixed interval until `shutdown` is set to `true` or its sender is dropped. A tick in progress
    /// when shutdown is signalled runs to completion.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.config.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "🔄️ Reconciliation agent started. Polling every {:.1}s with {} workers",
            self.config.poll_interval.as_secs_f64(),
            self.pool.size()
        );
        loop {
            tokio::select! {
                _ = timer.tick() => {},
                _ = shutdown.changed() => {},
            }
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                break;
            }
            log_tick(self.run_tick().await);
        }
        info!("🔄️ Reconciliation agent stopped");
    }
}

fn log_tick(result: Result<TickReport, ReconciliationError>) {
    match result {
        Ok(report) if report.was_interrupted() => warn!("🔄️ Tick cut short. {report}"),
        Ok(report) => info!("🔄️ Tick complete. {report}"),
        Err(ReconciliationError::NoPendingOrders) => trace!("🔄️ No pending orders"),
        Err(e @ ReconciliationError::RateLimited { .. }) => warn!("🔄️ Tick skipped. {e}"),
        Err(e @ ReconciliationError::DeadlineExceeded(_)) => warn!("🔄️ {e}"),
        Err(e) => error!("🔄️ Tick failed. {e}"),
    }
}
