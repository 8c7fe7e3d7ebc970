use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use loyalty_engine::{
    accrual::{AccrualClient, AccrualOutcome},
    db_types::{OrderNumber, OrderStatusType, Points},
};

/// An in-process accrual service. Each order answers with its scripted outcome, or `Unknown` if it has none.
/// One-shot outcomes queued with [`respond_once`](Self::respond_once) take precedence.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAccrualClient {
    inner: Arc<Mutex<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    standing: HashMap<String, AccrualOutcome>,
    once: HashMap<String, VecDeque<AccrualOutcome>>,
    calls: HashMap<String, usize>,
    delay: Option<Duration>,
}

impl ScriptedAccrualClient {
    pub fn respond(&self, number: &str, outcome: AccrualOutcome) {
        self.inner.lock().unwrap().standing.insert(number.to_string(), outcome);
    }

    pub fn respond_once(&self, number: &str, outcome: AccrualOutcome) {
        self.inner.lock().unwrap().once.entry(number.to_string()).or_default().push_back(outcome);
    }

    pub fn processed(&self, number: &str, accrual: Option<Points>) {
        self.respond(number, AccrualOutcome::Resolved { status: OrderStatusType::Processed, accrual });
    }

    pub fn status(&self, number: &str, status: OrderStatusType) {
        self.respond(number, AccrualOutcome::Resolved { status, accrual: None });
    }

    /// Every response is delayed by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    pub fn calls(&self, number: &str) -> usize {
        self.inner.lock().unwrap().calls.get(number).copied().unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().unwrap().calls.values().sum()
    }

    fn next_outcome(&self, number: &OrderNumber) -> (AccrualOutcome, Option<Duration>) {
        let mut script = self.inner.lock().unwrap();
        *script.calls.entry(number.as_str().to_string()).or_default() += 1;
        let once = script.once.get_mut(number.as_str()).and_then(|q| q.pop_front());
        let outcome = once
            .or_else(|| script.standing.get(number.as_str()).cloned())
            .unwrap_or(AccrualOutcome::Unknown);
        (outcome, script.delay)
    }
}

impl AccrualClient for ScriptedAccrualClient {
    fn fetch(&self, number: &OrderNumber) -> impl Future<Output = AccrualOutcome> + Send {
        let (outcome, delay) = self.next_outcome(number);
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        }
    }
}
