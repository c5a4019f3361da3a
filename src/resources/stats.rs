use futures::{FutureExt, future::BoxFuture};
use serde::{Deserialize, Serialize};

use crate::{
    client::QueryClient,
    errors::{QueryError, QueryResult, ServiceError},
    hooks::use_query,
    key::{CacheKey, Resource},
    query::Query,
    types::QuerySignal,
};

/// Aggregated numbers for the dashboard. Missing counters read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub total_schools: u64,
    pub total_units: u64,
    pub total_reports: u64,
    pub pending_reports: u64,
    pub total_audit_logs: u64,
}

/// Key `["stats"]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStatsQuery;

impl Query for DashboardStatsQuery {
    type Output = DashboardStats;

    fn key(&self) -> Option<CacheKey> {
        Some(CacheKey::new(Resource::Stats))
    }

    fn fetch(&self, client: &QueryClient) -> BoxFuture<'static, QueryResult<DashboardStats>> {
        let request = client.service().dashboard_stats();
        async move {
            let payload = request.await?;
            serde_json::from_value(payload).map_err(|err| QueryError::from(ServiceError::from(err)))
        }
        .boxed()
    }
}

pub fn use_dashboard_stats() -> QuerySignal<DashboardStats> {
    use_query(DashboardStatsQuery)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::service::MemoryService;

    #[tokio::test]
    async fn computes_counts_from_tables() {
        let service = MemoryService::new()
            .with_table("schools", vec![json!({"id": "s1"}), json!({"id": "s2"})])
            .with_table(
                "reports",
                vec![
                    json!({"id": "r1", "status": "pending"}),
                    json!({"id": "r2", "status": "closed"}),
                ],
            );
        let client = QueryClient::new(service.clone());
        let state = client.fetch(&DashboardStatsQuery).await;
        assert_eq!(
            state.data(),
            Some(&DashboardStats {
                total_schools: 2,
                total_reports: 2,
                pending_reports: 1,
                ..DashboardStats::default()
            })
        );

        client.fetch(&DashboardStatsQuery).await;
        assert_eq!(service.stats_count(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_an_upstream_error() {
        let service = MemoryService::new().with_dashboard_stats(json!({"total_schools": "many"}));
        let client = QueryClient::new(service);
        let state = client.fetch(&DashboardStatsQuery).await;
        assert!(matches!(
            state.error(),
            Some(QueryError::Upstream(ServiceError::InvalidResponse(_)))
        ));
    }
}
