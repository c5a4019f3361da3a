//! Record traits tying a serde type to its backend table.

use serde::{Serialize, de::DeserializeOwned};

use crate::{key::Resource, service::Order, types::QueryOutputBounds};

/// A row type stored in one backend table.
pub trait Record: DeserializeOwned + QueryOutputBounds {
    /// Resource name, first element of every cache key for this record.
    const RESOURCE: Resource;
    /// Backend table.
    const TABLE: &'static str;
    /// Column matched by category filters.
    const CATEGORY_COLUMN: &'static str = "category";
    /// Column matched by owning-user filters.
    const USER_COLUMN: &'static str = "user_id";
    /// Ordering applied to collection reads.
    const ORDER: Option<Order> = None;

    fn id(&self) -> &str;
}

/// Records that can be created from a draft payload.
pub trait Creatable: Record {
    type Draft: Serialize + Clone + PartialEq + Send + 'static;
}

/// Records that can be updated with a partial payload and deleted.
pub trait Editable: Record {
    type Patch: Serialize + Clone + PartialEq + Send + 'static;
}

/// Input of an update: the target id and the changed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate<P> {
    pub id: String,
    pub changes: P,
}

impl<P> RecordUpdate<P> {
    pub fn new(id: impl Into<String>, changes: P) -> Self {
        Self {
            id: id.into(),
            changes,
        }
    }
}
