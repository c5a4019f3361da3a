#![doc = include_str!("../README.md")]

// Core modules
pub mod accessor;
pub mod cache;
pub mod client;
pub mod errors;
pub mod hooks;
pub mod key;
mod log_utils;
pub mod mutation;
pub mod platform;
pub mod query;
pub mod record;
pub mod refresh;
pub mod resources;
pub mod service;
pub mod slides;
pub mod state;
pub mod types;

// Re-export commonly used items at crate root for convenience
pub use client::{QueryClient, QueryClientConfig};
pub use errors::{QueryError, ServiceError};
pub use state::State;

pub mod prelude {
    //! The prelude exports the types and hooks most components need.

    // Client, scoping and cache management
    pub use crate::client::{QueryClient, QueryClientConfig};
    pub use crate::hooks::{
        use_clear_query_cache, use_invalidate_resource, use_mutation, use_query,
        use_query_client, use_query_client_provider,
    };
    pub use crate::key::{CacheKey, Resource};

    // Query and mutation definitions
    pub use crate::accessor::QueryIntent;
    pub use crate::mutation::{CreateRecord, DeleteRecord, Mutation, UpdateRecord};
    pub use crate::query::{AllQuery, DetailQuery, Query};
    pub use crate::record::{Creatable, Editable, Record, RecordUpdate};

    // Per-resource records and hooks
    pub use crate::resources::*;

    // Backends
    pub use crate::service::{DataService, MemoryService};
    #[cfg(feature = "postgrest")]
    pub use crate::service::{PostgrestConfig, PostgrestService};

    // The async state enum, needed for matching
    pub use crate::state::State;
    pub use crate::types::{MutationSignal, QuerySignal};

    // Error types
    pub use crate::errors::{QueryError, QueryResult, ServiceError, ServiceResult};
}
