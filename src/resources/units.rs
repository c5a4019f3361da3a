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

/// A scouting unit (troop, pack, crew) chartered at a school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub school_id: Option<String>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewUnit {
    pub school_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
}

impl Record for Unit {
    const RESOURCE: Resource = Resource::Units;
    const TABLE: &'static str = "units";
    const ORDER: Option<Order> = Some(Order::asc("name"));

    fn id(&self) -> &str {
        &self.id
    }
}

impl Creatable for Unit {
    type Draft = NewUnit;
}

impl Editable for Unit {
    type Patch = UnitPatch;
}

/// Every unit, key `["units"]`.
pub fn use_units() -> QuerySignal<Vec<Unit>> {
    use_query(AllQuery::<Unit>::new())
}

/// One unit, key `["units", id]`. Stays idle while `id` is empty.
pub fn use_unit(id: impl Into<String>) -> QuerySignal<Unit> {
    use_query(DetailQuery::<Unit>::new(id))
}

pub fn use_create_unit() -> (MutationSignal<Unit>, impl Fn(NewUnit) + Clone) {
    use_mutation(CreateRecord::<Unit>::new())
}

pub fn use_update_unit() -> (MutationSignal<Unit>, impl Fn(RecordUpdate<UnitPatch>) + Clone) {
    use_mutation(UpdateRecord::<Unit>::new())
}

pub fn use_delete_unit() -> (MutationSignal<()>, impl Fn(String) + Clone) {
    use_mutation(DeleteRecord::<Unit>::new())
}
