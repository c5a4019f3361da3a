//! The remote data service: the hosted backend this layer reads from and writes to.
//!
//! [`DataService`] is object-safe so a [`QueryClient`](crate::client::QueryClient) can
//! hold any backend behind an `Arc<dyn DataService>`. Rows travel as JSON values;
//! the typed view lives in [`Accessor`](crate::accessor::Accessor).

use futures::future::BoxFuture;
use serde_json::Value;

use crate::errors::ServiceResult;

mod memory;
#[cfg(feature = "postgrest")]
mod postgrest;

pub use memory::MemoryService;
#[cfg(feature = "postgrest")]
pub use postgrest::{KEY_ENV, PostgrestConfig, PostgrestService, URL_ENV};

/// Column every table is keyed by.
pub const ID_COLUMN: &str = "id";

/// Result ordering for a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

impl Order {
    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            descending: true,
        }
    }

    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            descending: false,
        }
    }
}

/// A row selection: equality filters, an optional cap, an optional order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    pub filters: Vec<(String, String)>,
    pub limit: Option<u32>,
    pub order: Option<Order>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows whose `column` equals `value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn order(mut self, order: Option<Order>) -> Self {
        self.order = order;
        self
    }
}

/// Accessor surface of the hosted database.
///
/// Every call returns a `'static` future so callers can share or spawn it
/// freely. Implementations must not retry: one call, one request.
pub trait DataService: Send + Sync + 'static {
    /// Rows of `table` matching `select`.
    fn select(&self, table: &str, select: Select) -> BoxFuture<'static, ServiceResult<Vec<Value>>>;

    /// Insert one row, returning the stored representation.
    fn insert(&self, table: &str, row: Value) -> BoxFuture<'static, ServiceResult<Vec<Value>>>;

    /// Apply `changes` to the row with `id`, returning the updated rows.
    fn update(
        &self,
        table: &str,
        id: &str,
        changes: Value,
    ) -> BoxFuture<'static, ServiceResult<Vec<Value>>>;

    /// Delete the row with `id`.
    fn delete(&self, table: &str, id: &str) -> BoxFuture<'static, ServiceResult<()>>;

    /// Aggregated numbers for the dashboard.
    fn dashboard_stats(&self) -> BoxFuture<'static, ServiceResult<Value>>;
}
