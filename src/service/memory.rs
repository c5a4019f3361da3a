//! In-memory [`DataService`] with call counters and failure injection.
//!
//! Serves tests and offline demos. Every call settles immediately.

use std::{
    cmp::Ordering as CmpOrdering,
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use futures::{FutureExt, future::BoxFuture};
use serde_json::{Map, Value, json};

use super::{DataService, ID_COLUMN, Select};
use crate::errors::{ServiceError, ServiceResult};

#[derive(Default)]
struct MemoryInner {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    stats: Mutex<Option<Value>>,
    failure: Mutex<Option<ServiceError>>,
    ignore_filters: AtomicBool,
    next_id: AtomicU32,
    selects: AtomicU32,
    writes: AtomicU32,
    stats_calls: AtomicU32,
    last_select: Mutex<Option<(String, Select)>>,
}

#[derive(Clone, Default)]
pub struct MemoryService {
    inner: Arc<MemoryInner>,
}

fn poisoned() -> ServiceError {
    ServiceError::Server {
        status: 500,
        message: "memory store lock poisoned".to_string(),
    }
}

fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn compare_column(a: &Value, b: &Value, column: &str) -> CmpOrdering {
    match (a.get(column), b.get(column)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        _ => column_text(a, column).cmp(&column_text(b, column)),
    }
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `table` with rows, replacing its contents.
    pub fn with_table(self, table: &str, rows: Vec<Value>) -> Self {
        if let Ok(mut tables) = self.inner.tables.lock() {
            tables.insert(table.to_string(), rows);
        }
        self
    }

    /// Serve a fixed dashboard payload instead of computing one.
    pub fn with_dashboard_stats(self, stats: Value) -> Self {
        if let Ok(mut slot) = self.inner.stats.lock() {
            *slot = Some(stats);
        }
        self
    }

    /// Make every following call fail with `error`, or succeed again with `None`.
    pub fn fail_with(&self, error: Option<ServiceError>) {
        if let Ok(mut failure) = self.inner.failure.lock() {
            *failure = error;
        }
    }

    /// Return whole tables from `select`, as a backend without filter support would.
    pub fn ignore_filters(&self, ignore: bool) {
        self.inner.ignore_filters.store(ignore, Ordering::SeqCst);
    }

    pub fn select_count(&self) -> u32 {
        self.inner.selects.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> u32 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn stats_count(&self) -> u32 {
        self.inner.stats_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    pub fn call_count(&self) -> u32 {
        self.select_count() + self.write_count() + self.stats_count()
    }

    /// The most recent select, with its table.
    pub fn last_select(&self) -> Option<(String, Select)> {
        self.inner.last_select.lock().ok()?.clone()
    }

    /// Current contents of `table`.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.inner
            .tables
            .lock()
            .ok()
            .and_then(|tables| tables.get(table).cloned())
            .unwrap_or_default()
    }

    fn check_failure(&self) -> ServiceResult<()> {
        match self.inner.failure.lock().map_err(|_| poisoned())?.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn run_select(&self, table: &str, select: &Select) -> ServiceResult<Vec<Value>> {
        self.check_failure()?;
        let tables = self.inner.tables.lock().map_err(|_| poisoned())?;
        let rows = tables.get(table).cloned().unwrap_or_default();
        if self.inner.ignore_filters.load(Ordering::SeqCst) {
            return Ok(rows);
        }

        let mut rows: Vec<Value> = rows
            .into_iter()
            .filter(|row| {
                select
                    .filters
                    .iter()
                    .all(|(column, value)| column_text(row, column).as_deref() == Some(value))
            })
            .collect();
        if let Some(order) = select.order {
            rows.sort_by(|a, b| {
                let ordering = compare_column(a, b, order.column);
                if order.descending { ordering.reverse() } else { ordering }
            });
        }
        if let Some(limit) = select.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    fn run_insert(&self, table: &str, row: Value) -> ServiceResult<Vec<Value>> {
        self.check_failure()?;
        let Value::Object(mut fields) = row else {
            return Err(ServiceError::Rejected {
                status: 400,
                message: "row must be a JSON object".to_string(),
            });
        };
        if !fields.contains_key(ID_COLUMN) {
            let next = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            fields.insert(ID_COLUMN.to_string(), json!(format!("{table}-{next}")));
        }
        let stored = Value::Object(fields);
        let mut tables = self.inner.tables.lock().map_err(|_| poisoned())?;
        tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(vec![stored])
    }

    fn run_update(&self, table: &str, id: &str, changes: Value) -> ServiceResult<Vec<Value>> {
        self.check_failure()?;
        let Value::Object(changes) = changes else {
            return Err(ServiceError::Rejected {
                status: 400,
                message: "changes must be a JSON object".to_string(),
            });
        };
        let mut tables = self.inner.tables.lock().map_err(|_| poisoned())?;
        let mut updated = Vec::new();
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if column_text(row, ID_COLUMN).as_deref() != Some(id) {
                continue;
            }
            if let Value::Object(fields) = row {
                for (column, value) in &changes {
                    fields.insert(column.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    fn run_delete(&self, table: &str, id: &str) -> ServiceResult<()> {
        self.check_failure()?;
        let mut tables = self.inner.tables.lock().map_err(|_| poisoned())?;
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| column_text(row, ID_COLUMN).as_deref() != Some(id));
        }
        Ok(())
    }

    fn run_dashboard_stats(&self) -> ServiceResult<Value> {
        self.check_failure()?;
        if let Some(stats) = self.inner.stats.lock().map_err(|_| poisoned())?.clone() {
            return Ok(stats);
        }
        let tables = self.inner.tables.lock().map_err(|_| poisoned())?;
        let mut stats = Map::new();
        for (table, rows) in tables.iter() {
            stats.insert(format!("total_{table}"), json!(rows.len()));
        }
        let pending = tables
            .get("reports")
            .map(|rows| {
                rows.iter()
                    .filter(|row| column_text(row, "status").as_deref() == Some("pending"))
                    .count()
            })
            .unwrap_or(0);
        stats.insert("pending_reports".to_string(), json!(pending));
        Ok(Value::Object(stats))
    }
}

impl DataService for MemoryService {
    fn select(&self, table: &str, select: Select) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
        self.inner.selects.fetch_add(1, Ordering::SeqCst);
        let result = self.run_select(table, &select);
        if let Ok(mut last) = self.inner.last_select.lock() {
            *last = Some((table.to_string(), select));
        }
        futures::future::ready(result).boxed()
    }

    fn insert(&self, table: &str, row: Value) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(self.run_insert(table, row)).boxed()
    }

    fn update(
        &self,
        table: &str,
        id: &str,
        changes: Value,
    ) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(self.run_update(table, id, changes)).boxed()
    }

    fn delete(&self, table: &str, id: &str) -> BoxFuture<'static, ServiceResult<()>> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(self.run_delete(table, id)).boxed()
    }

    fn dashboard_stats(&self) -> BoxFuture<'static, ServiceResult<Value>> {
        self.inner.stats_calls.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(self.run_dashboard_stats()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Order;

    fn service() -> MemoryService {
        MemoryService::new().with_table(
            "reports",
            vec![
                json!({"id": "r1", "category": "safety", "created_at": "2026-01-01"}),
                json!({"id": "r2", "category": "finance", "created_at": "2026-03-01"}),
                json!({"id": "r3", "category": "safety", "created_at": "2026-02-01"}),
            ],
        )
    }

    #[tokio::test]
    async fn filters_orders_and_limits() {
        let service = service();
        let select = Select::new()
            .eq("category", "safety")
            .order(Some(Order::desc("created_at")))
            .limit(Some(1));
        let rows = service.select("reports", select).await.unwrap();
        assert_eq!(rows, vec![service.rows("reports")[2].clone()]);
        assert_eq!(service.select_count(), 1);
    }

    #[tokio::test]
    async fn insert_assigns_ids() {
        let service = MemoryService::new();
        let stored = service
            .insert("schools", json!({"name": "Lincoln"}))
            .await
            .unwrap();
        assert_eq!(stored[0]["id"], json!("schools-1"));
        assert_eq!(service.rows("schools").len(), 1);
    }

    #[tokio::test]
    async fn update_merges_fields_and_delete_removes() {
        let service = service();
        let updated = service
            .update("reports", "r2", json!({"category": "audit"}))
            .await
            .unwrap();
        assert_eq!(updated[0]["category"], json!("audit"));
        assert_eq!(updated[0]["created_at"], json!("2026-03-01"));

        service.delete("reports", "r2").await.unwrap();
        assert_eq!(service.rows("reports").len(), 2);
        assert_eq!(service.write_count(), 2);
    }

    #[tokio::test]
    async fn injected_failures_surface() {
        let service = service();
        service.fail_with(Some(ServiceError::Unauthorized));
        assert_eq!(
            service.select("reports", Select::new()).await,
            Err(ServiceError::Unauthorized)
        );
        service.fail_with(None);
        assert!(service.select("reports", Select::new()).await.is_ok());
    }

    #[tokio::test]
    async fn computes_dashboard_counts() {
        let service = service().with_table("schools", vec![json!({"id": "s1"})]);
        let stats = service.dashboard_stats().await.unwrap();
        assert_eq!(stats["total_reports"], json!(3));
        assert_eq!(stats["total_schools"], json!(1));
        assert_eq!(stats["pending_reports"], json!(0));
    }
}
