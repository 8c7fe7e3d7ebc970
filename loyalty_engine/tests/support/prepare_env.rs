use std::path::Path;

use log::*;
use loyalty_engine::SqliteDatabase;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("loyalty_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        trace!("Did not drop database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

/// Creates a fresh, migrated database at a random path and connects to it.
pub async fn new_test_db(max_connections: u32) -> (String, SqliteDatabase) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, max_connections).await.expect("Error creating connection to database");
    (url, db)
}

pub async fn drop_test_db(url: &str, mut db: SqliteDatabase) {
    use loyalty_engine::LoyaltyDatabase;
    db.close().await;
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Could not remove test database {url}: {e:?}");
    }
}
