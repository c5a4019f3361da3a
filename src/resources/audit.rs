//! Audit log: append-only, readable by owning user, category, or both absent.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    accessor::QueryIntent,
    client::QueryClient,
    errors::QueryResult,
    hooks::{use_mutation, use_query},
    key::{CacheKey, Resource},
    mutation::CreateRecord,
    query::Query,
    record::{Creatable, Record},
    service::Order,
    types::{MutationSignal, QuerySignal},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub action: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewAuditLogEntry {
    pub user_id: String,
    pub category: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Record for AuditLogEntry {
    const RESOURCE: Resource = Resource::Audit;
    const TABLE: &'static str = "audit_logs";
    const ORDER: Option<Order> = Some(Order::desc("created_at"));

    fn id(&self) -> &str {
        &self.id
    }
}

impl Creatable for AuditLogEntry {
    type Draft = NewAuditLogEntry;
}

/// Audit entries, key `["audit", user_id, category, limit]`.
///
/// The user id wins over the category when both are given. `limit` only caps
/// the number of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLogsQuery {
    pub user_id: Option<String>,
    pub category: Option<String>,
    pub limit: Option<u32>,
}

impl AuditLogsQuery {
    pub fn new(user_id: Option<&str>, category: Option<&str>, limit: Option<u32>) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            category: category.map(str::to_string),
            limit,
        }
    }

    pub fn intent(&self) -> QueryIntent {
        QueryIntent::resolve(None, self.user_id.as_deref(), self.category.as_deref())
    }
}

impl Query for AuditLogsQuery {
    type Output = Vec<AuditLogEntry>;

    fn key(&self) -> Option<CacheKey> {
        Some(
            CacheKey::new(Resource::Audit)
                .optional_id(self.user_id.as_deref())
                .filter(self.category.as_deref())
                .limit(self.limit),
        )
    }

    fn fetch(&self, client: &QueryClient) -> BoxFuture<'static, QueryResult<Vec<AuditLogEntry>>> {
        // The intent never looks at `limit`; it is forwarded as a row cap so the
        // newest `limit` entries come back.
        client
            .accessor::<AuditLogEntry>()
            .list(&self.intent(), self.limit)
    }
}

pub fn use_audit_logs(
    user_id: Option<&str>,
    category: Option<&str>,
    limit: Option<u32>,
) -> QuerySignal<Vec<AuditLogEntry>> {
    use_query(AuditLogsQuery::new(user_id, category, limit))
}

pub fn use_create_audit_log() -> (
    MutationSignal<AuditLogEntry>,
    impl Fn(NewAuditLogEntry) + Clone,
) {
    use_mutation(CreateRecord::<AuditLogEntry>::new())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::service::MemoryService;

    fn service() -> MemoryService {
        let rows = (1..=80)
            .map(|n| {
                let user_id = if n % 2 == 0 { "u1" } else { "u2" };
                let category = if n % 3 == 0 { "export" } else { "login" };
                json!({
                    "id": format!("a{n}"),
                    "user_id": user_id,
                    "category": category,
                    "action": "event",
                })
            })
            .collect();
        MemoryService::new().with_table("audit_logs", rows)
    }

    #[test]
    fn key_keeps_every_position() {
        let key = AuditLogsQuery::new(None, Some("login"), Some(50)).key().unwrap();
        assert_eq!(key.to_string(), r#"["audit",null,"login",50]"#);
        let key = AuditLogsQuery::new(Some("u1"), None, None).key().unwrap();
        assert_eq!(key.to_string(), r#"["audit","u1",null,null]"#);
    }

    #[test]
    fn limit_never_changes_the_intent() {
        assert_eq!(AuditLogsQuery::new(None, None, Some(50)).intent(), QueryIntent::All);
        assert_eq!(
            AuditLogsQuery::new(Some("u1"), Some("login"), Some(5)).intent(),
            QueryIntent::ByUser("u1".to_string())
        );
    }

    #[tokio::test]
    async fn unfiltered_read_uses_the_all_branch_capped_at_limit() {
        let service = service();
        let client = QueryClient::new(service.clone());
        let state = client
            .fetch(&AuditLogsQuery::new(None, None, Some(50)))
            .await;
        assert_eq!(state.data().map(Vec::len), Some(50));

        let (table, select) = service.last_select().unwrap();
        assert_eq!(table, "audit_logs");
        assert!(select.filters.is_empty());
        assert_eq!(select.limit, Some(50));
    }

    #[tokio::test]
    async fn category_read_filters_rows() {
        let client = QueryClient::new(service());
        let state = client
            .fetch(&AuditLogsQuery::new(None, Some("export"), None))
            .await;
        let entries = state.data().cloned().unwrap_or_default();
        assert_eq!(entries.len(), 26);
        assert!(entries.iter().all(|e| e.category.as_deref() == Some("export")));
    }

    #[tokio::test]
    async fn appended_entry_makes_audit_reads_stale() {
        let client = QueryClient::new(service());
        let query = AuditLogsQuery::new(Some("u1"), None, Some(10));
        client.fetch(&query).await;

        let entry = NewAuditLogEntry {
            user_id: "u1".to_string(),
            category: "login".to_string(),
            action: "sign-in".to_string(),
            ..NewAuditLogEntry::default()
        };
        let stored = client
            .mutate(&CreateRecord::<AuditLogEntry>::new(), entry)
            .await
            .unwrap();
        assert_eq!(stored.action, "sign-in");
        assert_eq!(client.cache().is_invalidated(&query.key().unwrap()), Some(true));
    }
}
