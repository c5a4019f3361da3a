//! Common types and aliases used throughout scout-data

use dioxus::prelude::Signal;

use crate::{errors::QueryError, state::State};

/// Common trait bounds for values produced by queries and mutations
///
/// Query results are shared between every reader of a cache key and handed
/// across the in-flight request table, so they must be cheap to clone and
/// thread-safe.
pub trait QueryOutputBounds: Clone + PartialEq + Send + Sync + 'static {}
impl<T> QueryOutputBounds for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Common trait bounds for mutation inputs
pub trait MutationInputBounds: Send + 'static {}
impl<T> MutationInputBounds for T where T: Send + 'static {}

/// The reactive state handed back by every read hook
pub type QuerySignal<T> = Signal<State<T, QueryError>>;

/// The reactive state handed back by every mutation hook
pub type MutationSignal<T> = Signal<State<T, QueryError>>;
