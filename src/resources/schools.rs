use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    hooks::{use_mutation, use_query},
    key::Resource,
    mutation::{CreateRecord, DeleteRecord, UpdateRecord},
    query::{AllQuery, DetailQuery},
    record::{Creatable, Editable, Record, RecordUpdate},
    service::Order,
    types::{MutationSignal, QuerySignal},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewSchool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchoolPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Record for School {
    const RESOURCE: Resource = Resource::Schools;
    const TABLE: &'static str = "schools";
    const ORDER: Option<Order> = Some(Order::asc("name"));

    fn id(&self) -> &str {
        &self.id
    }
}

impl Creatable for School {
    type Draft = NewSchool;
}

impl Editable for School {
    type Patch = SchoolPatch;
}

/// Every school, key `["schools"]`.
pub fn use_schools() -> QuerySignal<Vec<School>> {
    use_query(AllQuery::<School>::new())
}

/// One school, key `["schools", id]`. Stays idle while `id` is empty.
pub fn use_school(id: impl Into<String>) -> QuerySignal<School> {
    use_query(DetailQuery::<School>::new(id))
}

pub fn use_create_school() -> (MutationSignal<School>, impl Fn(NewSchool) + Clone) {
    use_mutation(CreateRecord::<School>::new())
}

pub fn use_update_school() -> (
    MutationSignal<School>,
    impl Fn(RecordUpdate<SchoolPatch>) + Clone,
) {
    use_mutation(UpdateRecord::<School>::new())
}

pub fn use_delete_school() -> (MutationSignal<()>, impl Fn(String) + Clone) {
    use_mutation(DeleteRecord::<School>::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_skips_unchanged_fields() {
        let patch = SchoolPatch {
            city: Some("Springfield".to_string()),
            ..SchoolPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"city": "Springfield"})
        );
    }

    #[test]
    fn decodes_hosted_rows() {
        let school: School = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "name": "Lincoln High",
            "district": "North",
            "created_at": "2026-02-03T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(school.id(), "s1");
        assert_eq!(school.city, None);
        assert!(school.created_at.is_some());
    }
}
