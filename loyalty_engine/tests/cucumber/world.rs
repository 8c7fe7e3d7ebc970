use std::time::Duration;

use cucumber::World;
use log::*;
use loyalty_engine::{
    db_types::{ClaimResult, Withdrawal},
    reconciliation::ReconciliationError,
    traits::{LedgerError, OrderStoreError},
    AgentConfig,
    LedgerApi,
    OrderFlowApi,
    ReconciliationAgent,
    SqliteDatabase,
    TickReport,
};

use crate::support::{
    prepare_env::{prepare_test_env, random_db_path},
    scripted_client::ScriptedAccrualClient,
};

#[derive(Default, Debug, World)]
pub struct LoyaltyWorld {
    pub system: Option<LoyaltySystem>,
}

#[derive(Debug)]
pub struct LoyaltySystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub ledger: LedgerApi<SqliteDatabase>,
    pub accrual: ScriptedAccrualClient,
    pub agent: ReconciliationAgent<SqliteDatabase, ScriptedAccrualClient>,
    pub last_submission: Option<Result<ClaimResult, OrderStoreError>>,
    pub last_withdrawal: Option<Result<Withdrawal, LedgerError>>,
    pub last_tick: Option<Result<TickReport, ReconciliationError>>,
}

impl LoyaltyWorld {
    pub fn system(&mut self) -> &mut LoyaltySystem {
        self.system.as_mut().expect("Loyalty system not initialised")
    }
}

impl LoyaltySystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        prepare_test_env(&db_path).await;
        let db = SqliteDatabase::new_with_url(&db_path, 5).await.expect("Error creating connection to database");
        debug!("Created database: {db_path}");
        let accrual = ScriptedAccrualClient::default();
        let config =
            AgentConfig { poll_interval: Duration::from_millis(50), tick_deadline: Duration::from_secs(5), workers: 2 };
        let agent = ReconciliationAgent::new(db.clone(), accrual.clone(), config);
        Self {
            db_path,
            orders: OrderFlowApi::new(db.clone()),
            ledger: LedgerApi::new(db.clone()),
            db,
            accrual,
            agent,
            last_submission: None,
            last_withdrawal: None,
            last_tick: None,
        }
    }
}
