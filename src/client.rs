//! The query client: the explicitly scoped owner of the service, cache and
//! refresh registry.
//!
//! Nothing in this crate is a global singleton. Each application (or each test)
//! builds its own [`QueryClient`] and hands it to components through context.

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};

use crate::{
    accessor::Accessor,
    cache::{CacheGetOptions, CacheGetResult, CacheMaintenanceStats, QueryCache},
    errors::{QueryError, QueryResult},
    key::{CacheKey, Resource},
    mutation::Mutation,
    platform::{DEFAULT_MAINTENANCE_INTERVAL, DEFAULT_MAX_CACHE_SIZE, DEFAULT_UNUSED_THRESHOLD},
    query::Query,
    record::Record,
    refresh::RefreshRegistry,
    service::DataService,
    state::State,
    types::{MutationInputBounds, QueryOutputBounds},
};

type SharedRequest<T> = Shared<BoxFuture<'static, QueryResult<T>>>;
type InFlight = Arc<Mutex<HashMap<CacheKey, PendingRequest>>>;

/// A request awaiting the service. Invalidation removes it from the table, which
/// tells it not to store its result.
struct PendingRequest {
    token: u64,
    request: Box<dyn Any + Send + Sync>,
}

/// Cache policy for a [`QueryClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClientConfig {
    stale_time: Option<Duration>,
    cache_expiration: Option<Duration>,
    unused_threshold: Duration,
    max_entries: usize,
    maintenance_interval: Duration,
}

impl Default for QueryClientConfig {
    fn default() -> Self {
        Self {
            stale_time: None,
            cache_expiration: None,
            unused_threshold: DEFAULT_UNUSED_THRESHOLD,
            max_entries: DEFAULT_MAX_CACHE_SIZE,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
        }
    }
}

impl QueryClientConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than this are served but refetched in the background.
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Entries older than this are dropped on lookup.
    pub fn with_cache_expiration(mut self, expiration: Duration) -> Self {
        self.cache_expiration = Some(expiration);
        self
    }

    pub fn with_unused_threshold(mut self, threshold: Duration) -> Self {
        self.unused_threshold = threshold;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    pub fn stale_time(&self) -> Option<Duration> {
        self.stale_time
    }

    pub fn cache_expiration(&self) -> Option<Duration> {
        self.cache_expiration
    }

    pub fn unused_threshold(&self) -> Duration {
        self.unused_threshold
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn maintenance_interval(&self) -> Duration {
        self.maintenance_interval
    }

    fn get_options(&self) -> CacheGetOptions {
        CacheGetOptions {
            expiration: self.cache_expiration,
            stale_time: self.stale_time,
        }
    }
}

/// Clone is cheap: every clone shares the same service, cache and request table.
#[derive(Clone)]
pub struct QueryClient {
    service: Arc<dyn DataService>,
    cache: QueryCache,
    refresh_registry: RefreshRegistry,
    in_flight: InFlight,
    next_token: Arc<AtomicU64>,
    config: QueryClientConfig,
}

impl PartialEq for QueryClient {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.service, &other.service)
            && Arc::ptr_eq(&self.in_flight, &other.in_flight)
    }
}

impl QueryClient {
    pub fn new(service: impl DataService) -> Self {
        Self::from_arc(Arc::new(service))
    }

    pub fn from_arc(service: Arc<dyn DataService>) -> Self {
        Self {
            service,
            cache: QueryCache::new(),
            refresh_registry: RefreshRegistry::new(),
            in_flight: Arc::default(),
            next_token: Arc::default(),
            config: QueryClientConfig::default(),
        }
    }

    pub fn with_config(mut self, config: QueryClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &QueryClientConfig {
        &self.config
    }

    pub fn service(&self) -> Arc<dyn DataService> {
        self.service.clone()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn refresh_registry(&self) -> &RefreshRegistry {
        &self.refresh_registry
    }

    /// Typed accessor for records of `R`.
    pub fn accessor<R: Record>(&self) -> Accessor<R> {
        Accessor::new(self.service.clone())
    }

    /// Cached value for `key` under this client's policy.
    pub fn cached<T: QueryOutputBounds>(&self, key: &CacheKey) -> Option<CacheGetResult<T>> {
        self.cache.get_with_options(key, &self.config.get_options())
    }

    /// Number of requests currently awaiting the service.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|table| table.len()).unwrap_or(0)
    }

    /// Resolve a query: serve a fresh cache entry, or join or start the request
    /// for its key.
    ///
    /// A query without a key resolves to [`State::Idle`] without touching the
    /// service. Failures are returned but never cached.
    pub async fn fetch<Q: Query>(&self, query: &Q) -> State<Q::Output, QueryError> {
        let Some(key) = query.key() else {
            return State::Idle;
        };
        if let Some(hit) = self.cached::<Q::Output>(&key)
            && !hit.is_stale
        {
            crate::log_cache_hit!("Serving cached data for key: {}", key);
            return State::Success(hit.data);
        }
        self.request(key, query).await.into()
    }

    fn request<Q: Query>(&self, key: CacheKey, query: &Q) -> SharedRequest<Q::Output> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let Ok(mut in_flight) = self.in_flight.lock() else {
            return self.start_request(key, token, query);
        };
        if let Some(pending) = in_flight
            .get(&key)
            .and_then(|entry| entry.request.downcast_ref::<SharedRequest<Q::Output>>())
        {
            crate::log_request_dedup!("Joining pending request for key: {}", key);
            return pending.clone();
        }
        crate::debug_log!("🆕 [REQUEST-DEDUP] Starting new request for key: {}", key);
        let request = self.start_request(key.clone(), token, query);
        in_flight.insert(
            key,
            PendingRequest {
                token,
                request: Box::new(request.clone()),
            },
        );
        request
    }

    fn start_request<Q: Query>(
        &self,
        key: CacheKey,
        token: u64,
        query: &Q,
    ) -> SharedRequest<Q::Output> {
        let fetch = query.fetch(self);
        let cache = self.cache.clone();
        let refresh_registry = self.refresh_registry.clone();
        let in_flight = self.in_flight.clone();

        async move {
            let result = fetch.await;
            // Still registered means nothing invalidated the key while we waited.
            let current = in_flight.lock().is_ok_and(|mut table| {
                if table.get(&key).is_some_and(|entry| entry.token == token) {
                    table.remove(&key);
                    true
                } else {
                    false
                }
            });
            match &result {
                Ok(_) if !current => {
                    crate::debug_log!(
                        "⏭️ [FETCH] Not caching result for {}: invalidated while in flight",
                        key
                    );
                }
                Ok(data) => {
                    let updated = cache.set(key.clone(), data.clone());
                    crate::log_cache_store!("Stored data for: {} (updated: {})", key, updated);
                    refresh_registry.trigger_refresh(&key);
                }
                Err(error) => {
                    crate::debug_log!("❌ [FETCH] Request for {} failed: {}", key, error);
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    // Later reads start a new request instead of joining one dispatched before
    // the invalidation.
    fn abandon_requests(&self, matches: impl Fn(&CacheKey) -> bool) -> usize {
        let Ok(mut in_flight) = self.in_flight.lock() else {
            return 0;
        };
        let before = in_flight.len();
        in_flight.retain(|key, _| !matches(key));
        before - in_flight.len()
    }

    /// Run a mutation. On success every cached read of its resource is invalidated;
    /// on failure nothing is.
    pub async fn mutate<M, I>(&self, mutation: &M, input: I) -> QueryResult<M::Output>
    where
        M: Mutation<I>,
        I: MutationInputBounds,
    {
        let resource = mutation.resource();
        crate::log_mutation_start!("Writing {}", resource);
        let result = mutation.mutate(self, input).await;
        match &result {
            Ok(_) => {
                crate::log_mutation_success!("Write to {} succeeded", resource);
                self.invalidate_resource(resource);
            }
            Err(error) => {
                crate::log_mutation_error!("Write to {} failed: {}", resource, error);
            }
        }
        result
    }

    /// Mark every cached read of `resource` stale and wake its readers.
    ///
    /// # Returns
    ///
    /// The number of cache entries marked stale.
    pub fn invalidate_resource(&self, resource: Resource) -> usize {
        let abandoned = self.abandon_requests(|key| key.belongs_to(resource));
        if abandoned > 0 {
            crate::debug_log!("⏭️ [FETCH] Abandoned {} pending reads of {}", abandoned, resource);
        }
        let invalidated = self.cache.invalidate_resource(resource);
        self.refresh_registry.trigger_resource(resource);
        invalidated
    }

    /// Mark one cached read stale and wake its readers.
    pub fn invalidate_key(&self, key: &CacheKey) -> bool {
        self.abandon_requests(|candidate| candidate == key);
        let invalidated = self.cache.invalidate(key);
        self.refresh_registry.trigger_refresh(key);
        invalidated
    }

    /// Drop every cached read and wake every reader.
    pub fn clear(&self) {
        self.abandon_requests(|_| true);
        self.cache.clear();
        self.refresh_registry.clear_all();
    }

    /// Run unused-entry cleanup and LRU eviction with this client's policy, then
    /// forget refresh subscriptions that no reader or cache entry still needs.
    pub fn maintain(&self) -> CacheMaintenanceStats {
        let mut stats = self
            .cache
            .maintain(self.config.unused_threshold, self.config.max_entries);
        stats.subscriptions_pruned = self.refresh_registry.prune(|key| self.cache.contains(key));

        #[cfg(feature = "tracing")]
        {
            let usage = self.cache.stats();
            crate::debug_log!(
                "📊 [CACHE-STATS] {} entries, {} stale, {:.1} reads per entry",
                usage.entry_count,
                usage.stale_count,
                usage.avg_accesses_per_entry()
            );
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures::channel::oneshot;
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        errors::{ServiceError, ServiceResult},
        mutation::{CreateRecord, DeleteRecord},
        query::{AllQuery, DetailQuery},
        resources::{NewUnit, School, Unit},
        service::{MemoryService, Select},
    };

    fn seeded() -> MemoryService {
        MemoryService::new()
            .with_table(
                "schools",
                vec![
                    json!({"id": "s1", "name": "Lincoln High"}),
                    json!({"id": "s2", "name": "Roosevelt Middle"}),
                ],
            )
            .with_table("units", vec![json!({"id": "u1", "name": "Troop 12"})])
    }

    /// Holds every select until the gate opens.
    struct GatedService {
        inner: MemoryService,
        gate: Shared<oneshot::Receiver<()>>,
        selects: Arc<AtomicU32>,
    }

    impl DataService for GatedService {
        fn select(
            &self,
            table: &str,
            select: Select,
        ) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.clone();
            let request = self.inner.select(table, select);
            async move {
                let _ = gate.await;
                request.await
            }
            .boxed()
        }

        fn insert(&self, table: &str, row: Value) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
            self.inner.insert(table, row)
        }

        fn update(
            &self,
            table: &str,
            id: &str,
            changes: Value,
        ) -> BoxFuture<'static, ServiceResult<Vec<Value>>> {
            self.inner.update(table, id, changes)
        }

        fn delete(&self, table: &str, id: &str) -> BoxFuture<'static, ServiceResult<()>> {
            self.inner.delete(table, id)
        }

        fn dashboard_stats(&self) -> BoxFuture<'static, ServiceResult<Value>> {
            self.inner.dashboard_stats()
        }
    }

    #[tokio::test]
    async fn first_read_fetches_once_and_populates_key() {
        let service = seeded();
        let client = QueryClient::new(service.clone());
        let query = DetailQuery::<School>::new("s1");

        let state = client.fetch(&query).await;
        assert_eq!(state.data().map(|school| school.name.as_str()), Some("Lincoln High"));
        assert_eq!(service.select_count(), 1);

        let key = CacheKey::new(Resource::Schools).id("s1");
        assert!(client.cache().get::<School>(&key).is_some());

        // Served from cache.
        client.fetch(&query).await;
        assert_eq!(service.select_count(), 1);
    }

    #[tokio::test]
    async fn disabled_query_never_calls_the_service() {
        let service = seeded();
        let client = QueryClient::new(service.clone());
        let state = client.fetch(&DetailQuery::<School>::new("")).await;
        assert!(state.is_idle());
        assert_eq!(service.call_count(), 0);
        assert_eq!(client.cache().size(), 0);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_request() {
        let (open, gate) = oneshot::channel();
        let selects = Arc::new(AtomicU32::new(0));
        let client = QueryClient::new(GatedService {
            inner: seeded(),
            gate: gate.shared(),
            selects: selects.clone(),
        });
        let query = AllQuery::<School>::new();

        let first = client.fetch(&query);
        let second = client.fetch(&query);
        let release = async {
            tokio::task::yield_now().await;
            assert_eq!(client.in_flight_count(), 1);
            let _ = open.send(());
        };
        let (first, second, ()) = futures::join!(first, second, release);

        assert_eq!(first, second);
        assert_eq!(first.data().map(Vec::len), Some(2));
        assert_eq!(selects.load(Ordering::SeqCst), 1);
        assert_eq!(client.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn reads_after_a_write_never_join_an_older_request() {
        let (open, gate) = oneshot::channel();
        let selects = Arc::new(AtomicU32::new(0));
        let client = QueryClient::new(GatedService {
            inner: seeded(),
            gate: gate.shared(),
            selects: selects.clone(),
        });
        let list = AllQuery::<Unit>::new();

        let mut before_write = Box::pin(client.fetch(&list));
        assert!(futures::poll!(before_write.as_mut()).is_pending());
        assert_eq!(client.in_flight_count(), 1);

        let draft = NewUnit {
            school_id: "s1".to_string(),
            name: "Crew 3".to_string(),
            ..NewUnit::default()
        };
        client.mutate(&CreateRecord::<Unit>::new(), draft).await.unwrap();
        assert_eq!(client.in_flight_count(), 0);

        let mut after_write = Box::pin(client.fetch(&list));
        assert!(futures::poll!(after_write.as_mut()).is_pending());
        assert_eq!(selects.load(Ordering::SeqCst), 2);

        let _ = open.send(());
        let (before_write, after_write) = futures::join!(before_write, after_write);
        assert_eq!(before_write.data().map(Vec::len), Some(1));
        assert_eq!(after_write.data().map(Vec::len), Some(2));

        // Only the post-write list is cached, and it is fresh.
        let cached = client
            .cached::<Vec<Unit>>(&CacheKey::new(Resource::Units))
            .unwrap();
        assert_eq!(cached.data.len(), 2);
        assert!(!cached.is_stale);
        assert_eq!(client.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn successful_create_makes_unit_reads_stale() {
        let service = seeded();
        let client = QueryClient::new(service.clone());
        let list = AllQuery::<Unit>::new();
        let detail = DetailQuery::<Unit>::new("u1");
        client.fetch(&list).await;
        client.fetch(&detail).await;
        client.fetch(&AllQuery::<School>::new()).await;
        assert_eq!(service.select_count(), 3);

        let draft = NewUnit {
            school_id: "s1".to_string(),
            name: "Pack 7".to_string(),
            ..NewUnit::default()
        };
        client.mutate(&CreateRecord::<Unit>::new(), draft).await.unwrap();

        let units_key = CacheKey::new(Resource::Units);
        assert_eq!(client.cache().is_invalidated(&units_key), Some(true));
        assert_eq!(
            client.cache().is_invalidated(&CacheKey::new(Resource::Units).id("u1")),
            Some(true)
        );
        assert_eq!(
            client.cache().is_invalidated(&CacheKey::new(Resource::Schools)),
            Some(false)
        );

        let refreshed = client.fetch(&list).await;
        assert_eq!(refreshed.data().map(Vec::len), Some(2));
        assert_eq!(service.select_count(), 4);
        assert_eq!(client.cache().is_invalidated(&units_key), Some(false));
    }

    #[tokio::test]
    async fn failed_mutation_invalidates_nothing() {
        let service = seeded();
        let client = QueryClient::new(service.clone());
        client.fetch(&AllQuery::<School>::new()).await;

        service.fail_with(Some(ServiceError::AccessDenied("row level security".to_string())));
        let result = client
            .mutate(&DeleteRecord::<School>::new(), "s1".to_string())
            .await;
        assert_eq!(
            result,
            Err(QueryError::Upstream(ServiceError::AccessDenied(
                "row level security".to_string()
            )))
        );
        assert_eq!(
            client.cache().is_invalidated(&CacheKey::new(Resource::Schools)),
            Some(false)
        );
        assert_eq!(service.write_count(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let service = seeded();
        let client = QueryClient::new(service.clone());
        service.fail_with(Some(ServiceError::Network("offline".to_string())));

        let state = client.fetch(&AllQuery::<School>::new()).await;
        assert_eq!(
            state,
            State::Error(QueryError::Upstream(ServiceError::Network("offline".to_string())))
        );
        assert_eq!(client.cache().size(), 0);

        service.fail_with(None);
        assert!(client.fetch(&AllQuery::<School>::new()).await.is_success());
        assert_eq!(service.select_count(), 2);
    }

    #[tokio::test]
    async fn stale_time_forces_refetch() {
        let service = seeded();
        let client = QueryClient::new(service.clone())
            .with_config(QueryClientConfig::new().with_stale_time(Duration::from_millis(1)));
        client.fetch(&AllQuery::<School>::new()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        client.fetch(&AllQuery::<School>::new()).await;
        assert_eq!(service.select_count(), 2);
    }
}
