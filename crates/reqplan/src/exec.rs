//! Running compiled plans against Postgres.

use crate::client::GenericClient;
use crate::error::{PlanError, PlanResult};
use crate::plan::QueryPlan;
use serde::Serialize;
use serde_json::Value;
use tokio_postgres::Row;

/// One page of an index result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub next_page: Option<u64>,
    pub prev_page: Option<u64>,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with one row of look-ahead.
    pub fn from_lookahead(mut rows: Vec<T>, page: u64, per_page: u64) -> Self {
        let limit = usize::try_from(per_page).unwrap_or(usize::MAX);
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        Self {
            data: rows,
            page,
            per_page,
            next_page: has_more.then(|| page + 1),
            prev_page: (page > 1).then(|| page - 1),
        }
    }
}

impl QueryPlan {
    /// Execute the plan and return every row as a JSON object.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> PlanResult<Vec<Value>> {
        let sql = self.to_sql()?;
        let text = sql.to_sql();
        tracing::debug!(target: "reqplan.sql", sql = %text, params = sql.param_count(), "executing plan");

        let rows = conn.query(&text, &sql.params_ref()).await?;
        rows.iter().map(decode_row).collect()
    }

    /// Execute a `show` plan: the matching row, if any.
    pub async fn fetch_one(&self, conn: &impl GenericClient) -> PlanResult<Option<Value>> {
        if !self.is_single() {
            return Err(PlanError::validation(format!(
                "plan for {} has no single-row lookup",
                self.resource_type
            )));
        }
        Ok(self.fetch_all(conn).await?.into_iter().next())
    }

    /// Execute an `index` plan and return the requested page.
    pub async fn fetch_page(&self, conn: &impl GenericClient) -> PlanResult<Page<Value>> {
        let Some(window) = self.window else {
            return Err(PlanError::validation(format!(
                "plan for {} has no page window",
                self.resource_type
            )));
        };
        let rows = self.fetch_all(conn).await?;
        Ok(Page::from_lookahead(rows, window.page, window.per_page))
    }
}

fn decode_row(row: &Row) -> PlanResult<Value> {
    row.try_get::<_, Value>(0)
        .map_err(|e| PlanError::decode("row_to_json", e.to_string()))
}
