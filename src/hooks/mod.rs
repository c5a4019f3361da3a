//! Dioxus hooks over a [`QueryClient`](crate::client::QueryClient)

mod client;
mod mutation;
mod query;

pub use client::*;
pub use mutation::*;
pub use query::*;
