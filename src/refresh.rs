//! Refresh registry: wakes the reactive contexts that read a cache key.
//!
//! Readers subscribe their [`ReactiveContext`] to the key they render. Storing a
//! new value or invalidating a resource marks those contexts dirty so the owning
//! hook re-runs and consults the cache again.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use dioxus::core::ReactiveContext;

use crate::key::{CacheKey, Resource};

#[derive(Clone, Default)]
pub struct RefreshRegistry {
    entries: Arc<Mutex<HashMap<CacheKey, Vec<ReactiveContext>>>>,
}

impl RefreshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a reactive context to refreshes of `key`. Subscribing twice is a no-op.
    pub fn subscribe_to_refresh(&self, key: &CacheKey, context: ReactiveContext) {
        if let Ok(mut entries) = self.entries.lock() {
            let subscribers = entries.entry(key.clone()).or_default();
            if !subscribers.contains(&context) {
                subscribers.push(context);
            }
        }
    }

    /// Stop waking `context` for `key`. The emptied entry stays until [`prune`](Self::prune).
    pub fn unsubscribe(&self, key: &CacheKey, context: &ReactiveContext) {
        if let Ok(mut entries) = self.entries.lock()
            && let Some(subscribers) = entries.get_mut(key)
        {
            subscribers.retain(|subscriber| subscriber != context);
        }
    }

    /// Wake every reader of `key`.
    pub fn trigger_refresh(&self, key: &CacheKey) {
        let subscribers = match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned().unwrap_or_default(),
            Err(_) => return,
        };
        self.notify(key, subscribers);
    }

    /// Wake every reader of any key belonging to `resource`.
    ///
    /// # Returns
    ///
    /// The number of keys refreshed.
    pub fn trigger_resource(&self, resource: Resource) -> usize {
        let woken: Vec<(CacheKey, Vec<ReactiveContext>)> = {
            let Ok(entries) = self.entries.lock() else {
                return 0;
            };
            entries
                .iter()
                .filter(|(key, _)| key.belongs_to(resource))
                .map(|(key, subscribers)| (key.clone(), subscribers.clone()))
                .collect()
        };
        let count = woken.len();
        for (key, subscribers) in woken {
            self.notify(&key, subscribers);
        }
        count
    }

    /// Wake every subscribed reader and forget all subscriptions.
    pub fn clear_all(&self) {
        let drained: Vec<Vec<ReactiveContext>> = match self.entries.lock() {
            Ok(mut entries) => entries.drain().map(|(_, subscribers)| subscribers).collect(),
            Err(_) => return,
        };
        for context in drained.into_iter().flatten() {
            context.mark_dirty();
        }
    }

    /// Drop keys nobody subscribes to any more, unless `keep` still wants them.
    ///
    /// # Returns
    ///
    /// The number of keys dropped.
    pub fn prune(&self, keep: impl Fn(&CacheKey) -> bool) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|key, subscribers| !subscribers.is_empty() || keep(key));
        before - entries.len()
    }

    // Contexts whose scope is gone report `false` and are dropped.
    fn notify(&self, key: &CacheKey, subscribers: Vec<ReactiveContext>) {
        let dead: Vec<ReactiveContext> = subscribers
            .into_iter()
            .filter(|context| !context.mark_dirty())
            .collect();
        if dead.is_empty() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock()
            && let Some(subscribers) = entries.get_mut(key)
        {
            subscribers.retain(|context| !dead.contains(context));
        }
    }
}
