//! Platform shims shared by the cache and the hook runtime.

use std::time::Duration;

/// Entries unused for this long are dropped by cache maintenance.
pub const DEFAULT_UNUSED_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Upper bound on the number of cache entries kept after maintenance.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1000;

/// How often the hook runtime runs cache maintenance.
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

#[cfg(not(target_family = "wasm"))]
pub use std::time::Instant;
#[cfg(target_family = "wasm")]
pub use web_time::Instant;

/// Sleep on the current async runtime.
#[cfg(not(target_family = "wasm"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Sleep on the current async runtime.
#[cfg(target_family = "wasm")]
pub async fn sleep(duration: Duration) {
    wasmtimer::tokio::sleep(duration).await;
}
