//! Query definitions.
//!
//! A [`Query`] is a plain value describing one read: the hooks compare it between
//! renders to decide whether to re-run, derive its [`CacheKey`], and only call
//! [`Query::fetch`] on a cache miss. Keeping the parameters in the value (rather
//! than in a captured closure) means a re-render with new parameters always
//! fetches with those parameters.

use std::{fmt, marker::PhantomData};

use futures::future::BoxFuture;

use crate::{
    client::QueryClient, errors::QueryResult, key::CacheKey, key::non_empty, record::Record,
    types::QueryOutputBounds,
};

/// A cacheable read against the data service.
pub trait Query: Clone + PartialEq + 'static {
    /// The type of data returned on success
    type Output: QueryOutputBounds;

    /// Cache key for this read, or `None` while a required input is absent.
    ///
    /// A query without a key is disabled: it never reaches the service and its
    /// state stays [`State::Idle`](crate::state::State::Idle).
    fn key(&self) -> Option<CacheKey>;

    /// Issue the read. Called at most once per cache miss.
    fn fetch(&self, client: &QueryClient) -> BoxFuture<'static, QueryResult<Self::Output>>;
}

/// Every record of `R`, e.g. key `["schools"]`.
pub struct AllQuery<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R> AllQuery<R> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R> Default for AllQuery<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for AllQuery<R> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<R> PartialEq for AllQuery<R> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<R> fmt::Debug for AllQuery<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllQuery").finish()
    }
}

impl<R: Record> Query for AllQuery<R> {
    type Output = Vec<R>;

    fn key(&self) -> Option<CacheKey> {
        Some(CacheKey::new(R::RESOURCE))
    }

    fn fetch(&self, client: &QueryClient) -> BoxFuture<'static, QueryResult<Vec<R>>> {
        client.accessor::<R>().get_all()
    }
}

/// One record of `R` by id, e.g. key `["schools", "s1"]`. Disabled while the id is empty.
pub struct DetailQuery<R> {
    id: String,
    _record: PhantomData<fn() -> R>,
}

impl<R> DetailQuery<R> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _record: PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<R> Clone for DetailQuery<R> {
    fn clone(&self) -> Self {
        Self::new(self.id.clone())
    }
}

impl<R> PartialEq for DetailQuery<R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R> fmt::Debug for DetailQuery<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetailQuery").field("id", &self.id).finish()
    }
}

impl<R: Record> Query for DetailQuery<R> {
    type Output = R;

    fn key(&self) -> Option<CacheKey> {
        non_empty(Some(&self.id)).map(|id| CacheKey::new(R::RESOURCE).id(id))
    }

    fn fetch(&self, client: &QueryClient) -> BoxFuture<'static, QueryResult<R>> {
        client.accessor::<R>().get_by_id(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{School, Unit};

    #[test]
    fn detail_key_is_absent_for_empty_id() {
        assert_eq!(DetailQuery::<School>::new("").key(), None);
        assert_eq!(
            DetailQuery::<School>::new("s1").key().map(|key| key.to_string()),
            Some(r#"["schools","s1"]"#.to_string())
        );
    }

    #[test]
    fn collection_keys_name_the_resource() {
        assert_eq!(
            AllQuery::<Unit>::new().key().map(|key| key.to_string()),
            Some(r#"["units"]"#.to_string())
        );
        assert_eq!(DetailQuery::<Unit>::new("u1"), DetailQuery::<Unit>::new("u1"));
        assert_ne!(DetailQuery::<Unit>::new("u1"), DetailQuery::<Unit>::new("u2"));
    }
}
