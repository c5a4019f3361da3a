//! [`DataService`] over the hosted database's PostgREST endpoint.

use std::{sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use reqwest::{Client, RequestBuilder, Response, header};
use serde_json::Value;

use super::{DataService, ID_COLUMN, Select};
use crate::errors::{ServiceError, ServiceResult};

/// Environment variable holding the project URL.
pub const URL_ENV: &str = "SCOUT_DATA_URL";

/// Environment variable holding the anon API key.
pub const KEY_ENV: &str = "SCOUT_DATA_KEY";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const DASHBOARD_STATS_RPC: &str = "get_dashboard_stats";

/// Connection settings for a [`PostgrestService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgrestConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl PostgrestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the URL and key from `SCOUT_DATA_URL` and `SCOUT_DATA_KEY`.
    pub fn from_env() -> ServiceResult<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ServiceError::Configuration(format!("{name} is not set")))
        };
        Ok(Self::new(read(URL_ENV)?, read(KEY_ENV)?))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }
}

/// Query-string pairs for a select.
pub(crate) fn select_params(select: &Select) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for (column, value) in &select.filters {
        params.push((column.clone(), format!("eq.{value}")));
    }
    if let Some(order) = select.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = select.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn id_param(id: &str) -> [(String, String); 1] {
    [(ID_COLUMN.to_string(), format!("eq.{id}"))]
}

/// PostgREST client. Clone is cheap: the reqwest client and config are shared.
#[derive(Clone)]
pub struct PostgrestService {
    client: Client,
    config: Arc<PostgrestConfig>,
}

impl PostgrestService {
    pub fn new(config: PostgrestConfig) -> ServiceResult<Self> {
        let builder = Client::builder();
        #[cfg(not(target_family = "wasm"))]
        let builder = builder.timeout(config.timeout);
        let client = builder
            .build()
            .map_err(|err| ServiceError::Configuration(err.to_string()))?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn from_env() -> ServiceResult<Self> {
        Self::new(PostgrestConfig::from_env()?)
    }

    pub fn config(&self) -> &PostgrestConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "application/json")
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> ServiceResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ServiceError::from_status(status, &body))
        }
    }

    async fn rows(request: RequestBuilder) -> ServiceResult<Vec<Value>> {
        let response = Self::check_response(request.send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }
}

impl DataService for PostgrestService {
    fn select(&self, table: &str, select: Select) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
        let request = self.authorized(
            self.client
                .get(self.config.table_url(table))
                .query(&select_params(&select)),
        );
        Self::rows(request).boxed()
    }

    fn insert(&self, table: &str, row: Value) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
        let request = self.authorized(
            self.client
                .post(self.config.table_url(table))
                .header("Prefer", "return=representation")
                .json(&row),
        );
        Self::rows(request).boxed()
    }

    fn update(
        &self,
        table: &str,
        id: &str,
        changes: Value,
    ) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
        let request = self.authorized(
            self.client
                .patch(self.config.table_url(table))
                .query(&id_param(id))
                .header("Prefer", "return=representation")
                .json(&changes),
        );
        Self::rows(request).boxed()
    }

    fn delete(&self, table: &str, id: &str) -> BoxFuture<'static, ServiceResult<()>> {
        let request = self.authorized(
            self.client
                .delete(self.config.table_url(table))
                .query(&id_param(id)),
        );
        async move {
            Self::check_response(request.send().await?).await?;
            Ok(())
        }
        .boxed()
    }

    fn dashboard_stats(&self) -> BoxFuture<'static, ServiceResult<Value>> {
        let request = self.authorized(
            self.client
                .post(self.config.rpc_url(DASHBOARD_STATS_RPC))
                .json(&serde_json::json!({})),
        );
        async move {
            let response = Self::check_response(request.send().await?).await?;
            Ok(response.json::<Value>().await?)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Order;

    #[test]
    fn shapes_select_parameters() {
        let select = Select::new()
            .eq("category", "safety")
            .order(Some(Order::desc("created_at")))
            .limit(Some(50));
        assert_eq!(
            select_params(&select),
            vec![
                ("select".to_string(), "*".to_string()),
                ("category".to_string(), "eq.safety".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn trims_trailing_slash() {
        let config = PostgrestConfig::new("https://db.example.test/", "anon");
        assert_eq!(
            config.table_url("schools"),
            "https://db.example.test/rest/v1/schools"
        );
        assert_eq!(
            config.rpc_url(DASHBOARD_STATS_RPC),
            "https://db.example.test/rest/v1/rpc/get_dashboard_stats"
        );
        assert_eq!(config.timeout, Duration::from_secs(REQUEST_TIMEOUT_SECS));
    }
}
