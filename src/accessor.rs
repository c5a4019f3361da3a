//! Typed accessors over a [`DataService`].
//!
//! [`Accessor<R>`] turns raw rows into records of type `R`. Every method returns a
//! `'static` future so the query client can share it across readers.

use std::{marker::PhantomData, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use serde_json::Value;

use crate::{
    errors::{QueryError, QueryResult, ServiceError},
    key::non_empty,
    record::{Creatable, Editable, Record},
    service::{DataService, ID_COLUMN, Select},
};

/// The narrowest filter supplied to a read, resolved once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIntent {
    All,
    ById(String),
    ByUser(String),
    ByCategory(String),
}

impl QueryIntent {
    /// Pick the intent for a set of optional filters.
    ///
    /// Precedence is id, then user, then category, then all. Empty strings count
    /// as absent.
    pub fn resolve(id: Option<&str>, user_id: Option<&str>, category: Option<&str>) -> Self {
        if let Some(id) = non_empty(id) {
            QueryIntent::ById(id.to_string())
        } else if let Some(user_id) = non_empty(user_id) {
            QueryIntent::ByUser(user_id.to_string())
        } else if let Some(category) = non_empty(category) {
            QueryIntent::ByCategory(category.to_string())
        } else {
            QueryIntent::All
        }
    }
}

fn decode<R: Record>(rows: Vec<Value>) -> QueryResult<Vec<R>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|err| QueryError::from(ServiceError::from(err)))
        })
        .collect()
}

fn failed<T: Send + 'static>(error: QueryError) -> BoxFuture<'static, QueryResult<T>> {
    futures::future::ready(Err(error)).boxed()
}

fn not_found<R: Record>(id: &str) -> QueryError {
    QueryError::NotFound {
        resource: R::RESOURCE,
        id: id.to_string(),
    }
}

pub struct Accessor<R> {
    service: Arc<dyn DataService>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Accessor<R> {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self {
            service,
            _record: PhantomData,
        }
    }

    fn select(&self, select: Select) -> BoxFuture<'static, QueryResult<Vec<R>>> {
        let request = self.service.select(R::TABLE, select.order(R::ORDER));
        async move { decode::<R>(request.await?) }.boxed()
    }

    pub fn get_all(&self) -> BoxFuture<'static, QueryResult<Vec<R>>> {
        self.select(Select::new())
    }

    pub fn get_by_category(&self, category: &str) -> BoxFuture<'static, QueryResult<Vec<R>>> {
        self.select(Select::new().eq(R::CATEGORY_COLUMN, category))
    }

    pub fn get_by_user(&self, user_id: &str) -> BoxFuture<'static, QueryResult<Vec<R>>> {
        self.select(Select::new().eq(R::USER_COLUMN, user_id))
    }

    /// Collection read for a resolved intent, capped at `limit` rows.
    ///
    /// A `ById` intent yields a one-element list or [`QueryError::NotFound`].
    pub fn list(
        &self,
        intent: &QueryIntent,
        limit: Option<u32>,
    ) -> BoxFuture<'static, QueryResult<Vec<R>>> {
        let select = match intent {
            QueryIntent::All => Select::new(),
            QueryIntent::ById(id) => {
                let lookup = self.get_by_id(id);
                return async move { lookup.await.map(|record| vec![record]) }.boxed();
            }
            QueryIntent::ByUser(user_id) => Select::new().eq(R::USER_COLUMN, user_id.as_str()),
            QueryIntent::ByCategory(category) => {
                Select::new().eq(R::CATEGORY_COLUMN, category.as_str())
            }
        };
        self.select(select.limit(limit))
    }

    /// Single-record read. The id is filtered at the service and checked again
    /// on the returned rows.
    pub fn get_by_id(&self, id: &str) -> BoxFuture<'static, QueryResult<R>> {
        let request = self
            .service
            .select(R::TABLE, Select::new().eq(ID_COLUMN, id));
        let id = id.to_string();
        async move {
            decode::<R>(request.await?)?
                .into_iter()
                .find(|record| record.id() == id)
                .ok_or_else(|| not_found::<R>(&id))
        }
        .boxed()
    }

    pub fn create(&self, draft: &R::Draft) -> BoxFuture<'static, QueryResult<R>>
    where
        R: Creatable,
    {
        let row = match serde_json::to_value(draft) {
            Ok(row) => row,
            Err(err) => return failed(QueryError::from(ServiceError::from(err))),
        };
        let request = self.service.insert(R::TABLE, row);
        async move {
            decode::<R>(request.await?)?.into_iter().next().ok_or_else(|| {
                QueryError::from(ServiceError::InvalidResponse(format!(
                    "insert into {} returned no row",
                    R::TABLE
                )))
            })
        }
        .boxed()
    }

    /// Apply a partial update. No returned row means no record had that id.
    pub fn update(&self, id: &str, changes: &R::Patch) -> BoxFuture<'static, QueryResult<R>>
    where
        R: Editable,
    {
        let changes = match serde_json::to_value(changes) {
            Ok(changes) => changes,
            Err(err) => return failed(QueryError::from(ServiceError::from(err))),
        };
        let request = self.service.update(R::TABLE, id, changes);
        let id = id.to_string();
        async move {
            decode::<R>(request.await?)?
                .into_iter()
                .next()
                .ok_or_else(|| not_found::<R>(&id))
        }
        .boxed()
    }

    pub fn delete(&self, id: &str) -> BoxFuture<'static, QueryResult<()>>
    where
        R: Editable,
    {
        let request = self.service.delete(R::TABLE, id);
        async move { request.await.map_err(QueryError::from) }.boxed()
    }
}
