//! Mutation definitions.
//!
//! A [`Mutation`] performs exactly one write through the data service. The query
//! client runs it and, only when it succeeds, invalidates every cached read of
//! [`Mutation::resource`]. Mutations never write into the cache themselves.

use std::{fmt, marker::PhantomData};

use futures::future::BoxFuture;

use crate::{
    client::QueryClient,
    errors::QueryResult,
    key::Resource,
    record::{Creatable, Editable, RecordUpdate},
    types::{MutationInputBounds, QueryOutputBounds},
};

/// A write against the data service.
pub trait Mutation<Input>: Clone + PartialEq + 'static
where
    Input: MutationInputBounds,
{
    /// The type of data returned on success
    type Output: QueryOutputBounds;

    /// Resource whose cached reads become stale when this mutation succeeds.
    fn resource(&self) -> Resource;

    /// Issue the write. No retries.
    fn mutate(
        &self,
        client: &QueryClient,
        input: Input,
    ) -> BoxFuture<'static, QueryResult<Self::Output>>;
}

macro_rules! record_mutation {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<R> {
            _record: PhantomData<fn() -> R>,
        }

        impl<R> $name<R> {
            pub fn new() -> Self {
                Self {
                    _record: PhantomData,
                }
            }
        }

        impl<R> Default for $name<R> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<R> Clone for $name<R> {
            fn clone(&self) -> Self {
                Self::new()
            }
        }

        impl<R> PartialEq for $name<R> {
            fn eq(&self, _other: &Self) -> bool {
                true
            }
        }

        impl<R> fmt::Debug for $name<R> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

record_mutation!(
    /// Insert a new record from its draft.
    CreateRecord
);
record_mutation!(
    /// Apply a partial update to one record.
    UpdateRecord
);
record_mutation!(
    /// Delete one record by id.
    DeleteRecord
);

impl<R: Creatable> Mutation<R::Draft> for CreateRecord<R> {
    type Output = R;

    fn resource(&self) -> Resource {
        R::RESOURCE
    }

    fn mutate(&self, client: &QueryClient, draft: R::Draft) -> BoxFuture<'static, QueryResult<R>> {
        client.accessor::<R>().create(&draft)
    }
}

impl<R: Editable> Mutation<RecordUpdate<R::Patch>> for UpdateRecord<R> {
    type Output = R;

    fn resource(&self) -> Resource {
        R::RESOURCE
    }

    fn mutate(
        &self,
        client: &QueryClient,
        update: RecordUpdate<R::Patch>,
    ) -> BoxFuture<'static, QueryResult<R>> {
        client.accessor::<R>().update(&update.id, &update.changes)
    }
}

impl<R: Editable> Mutation<String> for DeleteRecord<R> {
    type Output = ();

    fn resource(&self) -> Resource {
        R::RESOURCE
    }

    fn mutate(&self, client: &QueryClient, id: String) -> BoxFuture<'static, QueryResult<()>> {
        client.accessor::<R>().delete(&id)
    }
}
