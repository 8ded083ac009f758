//! Test context for service-level integration tests.

use super::db::TestDb;

pub struct TestContext {
    pub db: TestDb,
}

impl TestContext {
    pub async fn new() -> Self {
        Self {
            db: TestDb::new().await,
        }
    }
}
