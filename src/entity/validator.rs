//! Entity type validation backed by a TTL cache with single-flight refresh

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::registry::EntityRegistry;
use crate::{Error, Result};

/// Source of the authoritative list of entity type names
#[async_trait]
pub trait TypeSource: Send + Sync {
    /// Fetch every type name the remote API currently accepts
    async fn fetch_type_names(&self) -> Result<Vec<String>>;
}

/// Where a cached name set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOrigin {
    /// Returned by the type source
    Remote,
    /// Static registry names used after a failed or empty refresh
    Fallback,
}

/// Immutable snapshot of the valid type names
#[derive(Debug, Clone)]
pub struct TypeCache {
    valid_names: BTreeSet<String>,
    captured_at: Instant,
    ttl: Duration,
    origin: CacheOrigin,
}

impl TypeCache {
    fn new(names: impl IntoIterator<Item = String>, ttl: Duration, origin: CacheOrigin) -> Self {
        Self {
            valid_names: names.into_iter().collect(),
            captured_at: Instant::now(),
            ttl,
            origin,
        }
    }

    /// Whether the snapshot is older than its TTL
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.captured_at.elapsed() > self.ttl
    }

    /// Whether `name` is a valid type (exact match)
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.valid_names.contains(name)
    }

    /// Sorted valid names
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.valid_names.iter().cloned().collect()
    }

    /// Origin of this snapshot
    #[must_use]
    pub fn origin(&self) -> CacheOrigin {
        self.origin
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Arc<TypeCache>>>;

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<TypeCache>>,
    in_flight: Option<RefreshFuture>,
    /// Bumped by `clear()` so a refresh started earlier cannot install its result
    generation: u64,
}

/// Validates entity type names against a cached, self-refreshing name set.
///
/// Concurrent callers that find the cache missing or expired share a single
/// refresh future, so the type source is queried at most once per expiry.
/// A failed or empty refresh caches the static registry's names instead.
pub struct EntityTypeValidator {
    registry: Arc<EntityRegistry>,
    source: Arc<dyn TypeSource>,
    ttl: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl EntityTypeValidator {
    /// Create a validator; no refresh happens until the first lookup
    #[must_use]
    pub fn new(registry: Arc<EntityRegistry>, source: Arc<dyn TypeSource>, ttl: Duration) -> Self {
        Self {
            registry,
            source,
            ttl,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Sorted valid type names, refreshing the cache if needed
    pub async fn valid_type_names(&self) -> Vec<String> {
        self.current().await.names()
    }

    /// Return `name` unchanged if it is a valid entity type
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every valid name otherwise.
    pub async fn validate_type(&self, name: &str) -> Result<String> {
        let cache = self.current().await;
        if cache.contains(name) {
            return Ok(name.to_string());
        }

        let mut message = format!("Invalid entity type: '{name}'.");
        if let Some(suggestion) = cache
            .valid_names
            .iter()
            .find(|valid| valid.eq_ignore_ascii_case(name.trim()))
        {
            message.push_str(&format!(" Did you mean '{suggestion}'?"));
        }
        message.push_str(" Valid entity types: ");
        message.push_str(&cache.names().join(", "));
        Err(Error::Validation(message))
    }

    /// Drop the cached snapshot and abandon any in-flight refresh
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.snapshot = None;
        state.in_flight = None;
        state.generation = state.generation.wrapping_add(1);
        debug!("Entity type cache cleared");
    }

    /// Current snapshot, if one has been captured
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<TypeCache>> {
        self.state.lock().snapshot.clone()
    }

    async fn current(&self) -> Arc<TypeCache> {
        let refresh = {
            let mut state = self.state.lock();
            if let Some(snapshot) = state.snapshot.as_ref().filter(|s| !s.is_expired()) {
                return Arc::clone(snapshot);
            }
            match &state.in_flight {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let refresh = self.start_refresh(state.generation);
                    state.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };
        refresh.await
    }

    fn start_refresh(&self, generation: u64) -> RefreshFuture {
        let source = Arc::clone(&self.source);
        let registry = Arc::clone(&self.registry);
        let state = Arc::clone(&self.state);
        let ttl = self.ttl;

        async move {
            let cache = Arc::new(refresh_cache(source.as_ref(), &registry, ttl).await);
            {
                let mut state = state.lock();
                if state.generation == generation {
                    state.snapshot = Some(Arc::clone(&cache));
                    state.in_flight = None;
                }
            }
            cache
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for EntityTypeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTypeValidator")
            .field("ttl", &self.ttl)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

async fn refresh_cache(source: &dyn TypeSource, registry: &EntityRegistry, ttl: Duration) -> TypeCache {
    match source.fetch_type_names().await {
        Ok(names) if !names.is_empty() => {
            let added = registry.register_custom_types(&names);
            info!(count = names.len(), custom_added = added, "Entity type cache refreshed");
            TypeCache::new(names, ttl, CacheOrigin::Remote)
        }
        Ok(_) => {
            warn!("Type source returned no entity types, using static fallback");
            TypeCache::new(registry.names(), ttl, CacheOrigin::Fallback)
        }
        Err(e) => {
            warn!(error = %e, "Entity type refresh failed, using static fallback");
            TypeCache::new(registry.names(), ttl, CacheOrigin::Fallback)
        }
    }
}

/// Require a positive integer id (JSON integer or integral numeric string)
///
/// # Errors
///
/// Returns [`Error::Validation`] for anything else.
pub fn validate_id(id: &Value) -> Result<u64> {
    let parsed = match id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .filter(|id| *id > 0)
        .ok_or_else(|| Error::Validation(format!("Invalid entity ID: {id}. Must be a positive integer")))
}

/// Collection endpoint for an entity type
#[must_use]
pub fn endpoint_for_type(entity_type: &str) -> String {
    match entity_type {
        "TimeSheet" => "time".to_string(),
        other => format!("{other}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityCategory;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        names: Option<Vec<&'static str>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn new(names: Option<Vec<&'static str>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                names,
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TypeSource for CountingSource {
        async fn fetch_type_names(&self) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.names {
                Some(names) => Ok(names.iter().map(ToString::to_string).collect()),
                None => Err(Error::Transport("connection refused".to_string())),
            }
        }
    }

    fn validator(source: Arc<CountingSource>, ttl: Duration) -> EntityTypeValidator {
        EntityTypeValidator::new(Arc::new(EntityRegistry::with_defaults()), source, ttl)
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_refresh() {
        let source = CountingSource::new(Some(vec!["Bug", "UserStory"]), Duration::from_millis(30));
        let v = validator(Arc::clone(&source), Duration::from_secs(60));

        let (a, b, c) = tokio::join!(
            v.valid_type_names(),
            v.validate_type("Bug"),
            v.validate_type("UserStory"),
        );

        assert_eq!(source.calls(), 1);
        assert_eq!(a, vec!["Bug".to_string(), "UserStory".to_string()]);
        assert_eq!(b.unwrap(), "Bug");
        assert_eq!(c.unwrap(), "UserStory");
    }

    #[tokio::test]
    async fn test_snapshot_reused_until_ttl_expires() {
        let source = CountingSource::new(Some(vec!["Bug"]), Duration::ZERO);
        let v = validator(Arc::clone(&source), Duration::from_millis(40));

        v.validate_type("Bug").await.unwrap();
        v.validate_type("Bug").await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        v.validate_type("Bug").await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_registry() {
        let source = CountingSource::new(None, Duration::ZERO);
        let v = validator(Arc::clone(&source), Duration::from_secs(60));

        assert_eq!(v.validate_type("Iteration").await.unwrap(), "Iteration");
        let snapshot = v.snapshot().unwrap();
        assert_eq!(snapshot.origin(), CacheOrigin::Fallback);
        assert_eq!(snapshot.names(), EntityRegistry::with_defaults().names());
    }

    #[tokio::test]
    async fn test_empty_refresh_falls_back_to_registry() {
        let source = CountingSource::new(Some(Vec::new()), Duration::ZERO);
        let v = validator(source, Duration::from_secs(60));

        assert!(v.validate_type("Bug").await.is_ok());
        assert_eq!(v.snapshot().unwrap().origin(), CacheOrigin::Fallback);
    }

    #[tokio::test]
    async fn test_invalid_type_lists_valid_names() {
        let source = CountingSource::new(Some(vec!["Bug", "UserStory"]), Duration::ZERO);
        let v = validator(source, Duration::from_secs(60));

        let err = v.validate_type("bug").await.unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, Error::Validation(_)));
        assert!(message.contains("Did you mean 'Bug'?"));
        assert!(message.contains("Bug, UserStory"));

        let err = v.validate_type("Story").await.unwrap_err();
        assert!(!err.to_string().contains("Did you mean"));
    }

    #[tokio::test]
    async fn test_remote_names_register_custom_types() {
        let source = CountingSource::new(Some(vec!["Bug", "Objective"]), Duration::ZERO);
        let registry = Arc::new(EntityRegistry::with_defaults());
        let v = EntityTypeValidator::new(Arc::clone(&registry), source, Duration::from_secs(60));

        assert_eq!(v.validate_type("Objective").await.unwrap(), "Objective");
        assert_eq!(registry.get("Objective").unwrap().category, EntityCategory::Custom);
        assert_eq!(v.snapshot().unwrap().origin(), CacheOrigin::Remote);
    }

    #[tokio::test]
    async fn test_clear_forces_refresh() {
        let source = CountingSource::new(Some(vec!["Bug"]), Duration::ZERO);
        let v = validator(Arc::clone(&source), Duration::from_secs(60));

        v.valid_type_names().await;
        v.clear();
        assert!(v.snapshot().is_none());
        v.valid_type_names().await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_refresh() {
        let source = CountingSource::new(Some(vec!["Bug"]), Duration::from_millis(50));
        let v = validator(Arc::clone(&source), Duration::from_secs(60));

        let (names, ()) = tokio::join!(v.valid_type_names(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            v.clear();
        });

        assert_eq!(names, vec!["Bug".to_string()]);
        assert!(v.snapshot().is_none());
    }

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id(&json!(42)).unwrap(), 42);
        assert_eq!(validate_id(&json!("17")).unwrap(), 17);
        assert_eq!(validate_id(&json!(" 9 ")).unwrap(), 9);
        for bad in [json!(0), json!(-3), json!(1.5), json!("abc"), json!(null), json!([1])] {
            assert!(matches!(validate_id(&bad), Err(Error::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn test_endpoint_for_type() {
        assert_eq!(endpoint_for_type("TimeSheet"), "time");
        assert_eq!(endpoint_for_type("UserStory"), "UserStorys");
        assert_eq!(endpoint_for_type("Bug"), "Bugs");
    }
}
