//! Connections a plan can run on.

use crate::error::PlanResult;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Anything that can run a statement: a plain client or an open transaction.
pub trait GenericClient: Send + Sync {
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = PlanResult<Vec<Row>>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PlanResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PlanResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }
}
