//! Hooks that install and reach the [`QueryClient`].

use dioxus::prelude::*;

use crate::{client::QueryClient, key::Resource, platform};

/// Install a [`QueryClient`] for this component and its descendants.
///
/// `init` runs once, on first render. The hook also starts a background loop that
/// runs cache maintenance (unused-entry cleanup and LRU eviction) every
/// [`maintenance_interval`](crate::client::QueryClientConfig::maintenance_interval).
///
/// ## Example
///
/// ```rust,no_run
/// use dioxus::prelude::*;
/// use scout_data::prelude::*;
///
/// #[component]
/// fn App() -> Element {
///     use_query_client_provider(|| QueryClient::new(MemoryService::new()));
///     rsx! { Dashboard {} }
/// }
///
/// #[component]
/// fn Dashboard() -> Element {
///     let stats = use_dashboard_stats();
///     rsx! {
///         match &*stats.read() {
///             State::Success(stats) => rsx! { "{stats.total_reports} reports" },
///             State::Error(err) => rsx! { "Error: {err}" },
///             _ => rsx! { "Loading..." },
///         }
///     }
/// }
/// ```
pub fn use_query_client_provider(init: impl FnOnce() -> QueryClient) -> QueryClient {
    let client = use_context_provider(init);

    let maintained = client.clone();
    use_future(move || {
        let client = maintained.clone();
        async move {
            loop {
                platform::sleep(client.config().maintenance_interval()).await;
                let stats = client.maintain();
                if stats.unused_removed > 0 || stats.lru_evicted > 0 || stats.subscriptions_pruned > 0
                {
                    crate::debug_log!(
                        "🧹 [CACHE-MAINTENANCE] Removed {} unused, evicted {}, pruned {} subscriptions, {} entries left",
                        stats.unused_removed,
                        stats.lru_evicted,
                        stats.subscriptions_pruned,
                        stats.final_size
                    );
                }
            }
        }
    });

    client
}

/// The [`QueryClient`] installed by the nearest ancestor.
///
/// # Panics
///
/// Panics when no ancestor called [`use_query_client_provider`].
pub fn use_query_client() -> QueryClient {
    try_use_context::<QueryClient>().unwrap_or_else(|| {
        panic!(
            "No QueryClient in context. Call use_query_client_provider() in an ancestor component."
        )
    })
}

/// Returns a function that marks every cached read of `resource` stale and
/// refreshes the components reading it.
pub fn use_invalidate_resource(resource: Resource) -> impl Fn() + Clone {
    let client = use_query_client();
    move || {
        client.invalidate_resource(resource);
    }
}

/// Returns a function that drops every cached read and refreshes every reader.
pub fn use_clear_query_cache() -> impl Fn() + Clone {
    let client = use_query_client();
    move || client.clear()
}
