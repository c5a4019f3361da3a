//! The generic read hook.

use std::{cell::RefCell, rc::Rc};

use dioxus::{core::ReactiveContext, prelude::*};

use crate::{
    client::QueryClient, key::CacheKey, query::Query, state::State, types::QuerySignal,
};

use super::use_query_client;

/// The key this hook's memo is currently subscribed to.
type Subscription = Rc<RefCell<Option<(CacheKey, ReactiveContext)>>>;

/// Read `query` through the nearest [`QueryClient`].
///
/// The hook re-runs whenever the query value changes or its cache key is
/// refreshed. On each run it:
///
/// - stays [`State::Idle`] when the query has no key (a required input is absent);
/// - serves a fresh cache entry as [`State::Success`];
/// - serves a stale entry as [`State::Success`] and refetches in the background;
/// - otherwise enters [`State::Loading`] and fetches, sharing the request with any
///   other reader of the same key.
///
/// Results for a key the hook has since moved away from are discarded. The
/// hook's refresh subscription follows its key and is released on unmount.
pub fn use_query<Q: Query>(query: Q) -> QuerySignal<Q::Output> {
    let client = use_query_client();
    let mut state = use_signal(|| State::Idle);
    let mut current_key: Signal<Option<CacheKey>> = use_signal(|| None);
    let subscription: Subscription = use_hook(Subscription::default);

    {
        let client = client.clone();
        let subscription = subscription.clone();
        use_drop(move || resubscribe(&client, &subscription, None));
    }

    let _query_memo = use_memo(use_reactive!(|(query)| {
        let Some(key) = query.key() else {
            resubscribe(&client, &subscription, None);
            if current_key.peek().is_some() {
                current_key.set(None);
            }
            if !state.peek().is_idle() {
                state.set(State::Idle);
            }
            return;
        };

        if current_key.peek().as_ref() != Some(&key) {
            current_key.set(Some(key.clone()));
        }

        // Re-run this memo whenever the key is stored or invalidated.
        if let Some(reactive_context) = ReactiveContext::current() {
            resubscribe(&client, &subscription, Some((key.clone(), reactive_context)));
        }

        match client.cached::<Q::Output>(&key) {
            Some(hit) => {
                let is_stale = hit.is_stale;
                if !matches!(&*state.peek(), State::Success(data) if data == &hit.data) {
                    state.set(State::Success(hit.data));
                }
                if is_stale {
                    crate::debug_log!(
                        "🔄 [SWR] Serving stale data for key: {} - revalidating",
                        key
                    );
                    spawn_fetch(client.clone(), query.clone(), key, state, current_key);
                }
            }
            None => {
                if !state.peek().is_loading() {
                    state.set(State::Loading);
                }
                spawn_fetch(client.clone(), query.clone(), key, state, current_key);
            }
        }
    }));

    state
}

// Moves the subscription to `next`, releasing the previous key if it differs.
fn resubscribe(
    client: &QueryClient,
    subscription: &Subscription,
    next: Option<(CacheKey, ReactiveContext)>,
) {
    let registry = client.refresh_registry();
    let previous = subscription.replace(next.clone());
    if let Some((previous_key, previous_context)) = previous
        && next.as_ref() != Some(&(previous_key.clone(), previous_context.clone()))
    {
        registry.unsubscribe(&previous_key, &previous_context);
    }
    if let Some((key, context)) = next {
        registry.subscribe_to_refresh(&key, context);
    }
}

fn spawn_fetch<Q: Query>(
    client: QueryClient,
    query: Q,
    key: CacheKey,
    mut state: QuerySignal<Q::Output>,
    current_key: Signal<Option<CacheKey>>,
) {
    spawn(async move {
        let result = client.fetch(&query).await;
        if current_key.peek().as_ref() != Some(&key) {
            crate::debug_log!("⏭️ [FETCH] Discarding result for superseded key: {}", key);
            return;
        }
        if *state.peek() != result {
            state.set(result);
        }
    });
}
