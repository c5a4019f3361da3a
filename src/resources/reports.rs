use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{
    accessor::QueryIntent,
    client::QueryClient,
    errors::QueryResult,
    hooks::{use_mutation, use_query},
    key::{CacheKey, Resource},
    mutation::{CreateRecord, DeleteRecord, UpdateRecord},
    query::{DetailQuery, Query},
    record::{Creatable, Editable, Record, RecordUpdate},
    service::Order,
    types::{MutationSignal, QuerySignal},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub school_id: Option<String>,
    #[serde(default)]
    pub unit_id: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewReport {
    pub title: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Record for Report {
    const RESOURCE: Resource = Resource::Reports;
    const TABLE: &'static str = "reports";
    const USER_COLUMN: &'static str = "author_id";
    const ORDER: Option<Order> = Some(Order::desc("created_at"));

    fn id(&self) -> &str {
        &self.id
    }
}

impl Creatable for Report {
    type Draft = NewReport;
}

impl Editable for Report {
    type Patch = ReportPatch;
}

/// Reports, optionally narrowed to one category. Key `["reports", category]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportsQuery {
    pub category: Option<String>,
}

impl ReportsQuery {
    pub fn new(category: Option<&str>) -> Self {
        Self {
            category: category.map(str::to_string),
        }
    }

    pub fn intent(&self) -> QueryIntent {
        QueryIntent::resolve(None, None, self.category.as_deref())
    }
}

impl Query for ReportsQuery {
    type Output = Vec<Report>;

    fn key(&self) -> Option<CacheKey> {
        Some(CacheKey::new(Resource::Reports).filter(self.category.as_deref()))
    }

    fn fetch(&self, client: &QueryClient) -> BoxFuture<'static, QueryResult<Vec<Report>>> {
        client.accessor::<Report>().list(&self.intent(), None)
    }
}

/// Reports in `category`, or every report when `category` is absent or empty.
pub fn use_reports(category: Option<&str>) -> QuerySignal<Vec<Report>> {
    use_query(ReportsQuery::new(category))
}

/// One report, key `["reports", id]`. Stays idle while `id` is empty.
pub fn use_report(id: impl Into<String>) -> QuerySignal<Report> {
    use_query(DetailQuery::<Report>::new(id))
}

pub fn use_create_report() -> (MutationSignal<Report>, impl Fn(NewReport) + Clone) {
    use_mutation(CreateRecord::<Report>::new())
}

pub fn use_update_report() -> (
    MutationSignal<Report>,
    impl Fn(RecordUpdate<ReportPatch>) + Clone,
) {
    use_mutation(UpdateRecord::<Report>::new())
}

pub fn use_delete_report() -> (MutationSignal<()>, impl Fn(String) + Clone) {
    use_mutation(DeleteRecord::<Report>::new())
}
