use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::application::ports::{PendingQueue, ProfileStore, ServerGateway};
use crate::application::services::change_notifier::ChangeNotifier;
use crate::domain::entities::{PendingSyncEntry, UserProfile};
use crate::domain::resolver;
use crate::domain::value_objects::{AccountEmail, SyncOutcome, SyncSource};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;

/// Result of one pending-queue flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainOutcome {
    pub processed: u32,
    pub remaining: u32,
}

/// Orchestrates profile round trips: push local state up, merge with the
/// server copy, pull the canonical result down.
///
/// Mutual exclusion is cooperative single-flight: callers that lose the race
/// degrade to cached data immediately instead of queueing. The lock is a
/// `tokio::sync::Mutex` guard held across the round trip, so it releases on
/// every exit path, including errors.
pub struct SyncService {
    store: Arc<dyn ProfileStore>,
    queue: Arc<dyn PendingQueue>,
    gateway: Arc<dyn ServerGateway>,
    notifier: Arc<ChangeNotifier>,
    cache: crate::infrastructure::cache::ProfileCache,
    config: SyncConfig,
    flight: Arc<Mutex<()>>,
    last_global_sync: RwLock<Option<Instant>>,
    last_attempts: RwLock<HashMap<String, Instant>>,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        queue: Arc<dyn PendingQueue>,
        gateway: Arc<dyn ServerGateway>,
        notifier: Arc<ChangeNotifier>,
        config: SyncConfig,
    ) -> Self {
        let cache = crate::infrastructure::cache::ProfileCache::new(config.cache_ttl_secs);
        Self {
            store,
            queue,
            gateway,
            notifier,
            cache,
            config,
            flight: Arc::new(Mutex::new(())),
            last_global_sync: RwLock::new(None),
            last_attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Fast path: memory cache, then the durable store. Falls through to a
    /// full sync only when nothing is cached locally.
    pub async fn load_profile(&self, email: &AccountEmail) -> SyncOutcome<UserProfile> {
        if let Some(profile) = self.cache.get(email).await {
            return SyncOutcome::cache(profile);
        }

        match self.store.get_profile(email).await {
            Ok(Some(profile)) => {
                self.cache.set(profile.clone()).await;
                SyncOutcome::cache(profile)
            }
            Ok(None) => self.sync_now(email).await,
            Err(err) => {
                warn!(account = %email, error = %err, "profile store read failed");
                self.sync_now(email).await
            }
        }
    }

    /// Durable local write first, then a server push. A failed push queues
    /// the write for replay; the local copy is already safe either way.
    pub async fn save_profile(&self, mut profile: UserProfile) -> SyncOutcome<UserProfile> {
        profile.updated_at = Some(Utc::now());

        if let Err(err) = self.persist_local(&profile).await {
            return SyncOutcome::failed(err.to_string(), None, SyncSource::Cache);
        }

        match self.gateway.push_profile(&profile).await {
            Ok(()) => {
                // Confirmed by the server; any older queued write is superseded.
                if let Err(err) = self.queue.remove(&profile.email).await {
                    warn!(account = %profile.email, error = %err, "pending entry cleanup failed");
                }
                self.notifier.notify(&profile.email).await;
                SyncOutcome::server(profile)
            }
            Err(err) => {
                if let Err(enqueue_err) = self.enqueue_pending(&profile).await {
                    warn!(account = %profile.email, error = %enqueue_err, "could not queue offline write");
                }
                self.notifier.notify(&profile.email).await;
                if err.is_auth() {
                    SyncOutcome::failed("auth_required", Some(profile), SyncSource::Cache)
                } else {
                    debug!(account = %profile.email, error = %err, "profile push failed, queued for retry");
                    SyncOutcome::queued(profile)
                }
            }
        }
    }

    /// Authenticate against the server. Auth failure is surfaced distinctly
    /// so the caller can re-authenticate; the local cache is never cleared.
    pub async fn login(&self, email: &AccountEmail, password: &str) -> SyncOutcome<UserProfile> {
        match self.gateway.login(email, password).await {
            Ok(server_profile) => {
                let token = server_profile.token.clone();
                let mut candidates = vec![server_profile];
                if let Some(local) = self.cached_profile(email).await {
                    candidates.push(local);
                }
                let mut merged = resolver::resolve(&candidates, email);
                // The fresh session token always wins the merge.
                if token.is_some() {
                    merged.token = token;
                }
                if let Err(err) = self.persist_local(&merged).await {
                    warn!(account = %email, error = %err, "could not persist profile after login");
                }
                SyncOutcome::server(merged)
            }
            Err(err) if err.is_auth() => {
                SyncOutcome::failed("invalid_credentials", None, SyncSource::Server)
            }
            Err(err) => {
                debug!(account = %email, error = %err, "login unreachable, falling back to cache");
                Self::fallback(self.cached_profile(email).await)
            }
        }
    }

    /// One full round trip under the single-flight gate.
    pub async fn sync_now(&self, email: &AccountEmail) -> SyncOutcome<UserProfile> {
        if self.key_throttled(email).await {
            debug!(account = %email, "sync throttled by per-key interval");
            return SyncOutcome::throttled(self.cached_profile(email).await);
        }
        if self.cooldown_active().await {
            debug!(account = %email, "sync throttled by global cooldown");
            return SyncOutcome::throttled(self.cached_profile(email).await);
        }

        // Guard drops on every exit path below, releasing the lock.
        let _guard = match self.flight.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(account = %email, "sync already in flight");
                return SyncOutcome::throttled(self.cached_profile(email).await);
            }
        };

        self.stamp_attempt(email).await;

        if !self.gateway.probe().await {
            debug!(account = %email, "server unreachable, returning cached data");
            return Self::fallback(self.cached_profile(email).await);
        }

        match self.flush_pending().await {
            Ok(drain) if drain.processed > 0 || drain.remaining > 0 => {
                info!(
                    processed = drain.processed,
                    remaining = drain.remaining,
                    "pending queue flushed"
                );
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "pending queue flush failed"),
        }

        let local = self.cached_profile(email).await;
        let token = local.as_ref().and_then(|p| p.token.clone());

        match self.gateway.fetch_profile(email, token.as_deref()).await {
            Ok(server_copy) => {
                let mut candidates = Vec::new();
                if let Some(profile) = server_copy {
                    candidates.push(profile);
                }
                if let Some(profile) = local {
                    candidates.push(profile);
                }
                let mut merged = resolver::resolve(&candidates, email);

                // The image side channel outlives merges that dropped the field.
                if !merged.has_image() {
                    if let Ok(Some(image)) = self.store.get_profile_image(email).await {
                        merged.profile_image = Some(image);
                    }
                }

                if let Err(err) = self.persist_local(&merged).await {
                    return SyncOutcome::failed(err.to_string(), Some(merged), SyncSource::Server);
                }
                self.stamp_global_sync().await;
                info!(account = %email, "profile sync completed");
                SyncOutcome::server(merged)
            }
            Err(err) if err.is_auth() => {
                debug!(account = %email, "sync rejected, re-authentication required");
                SyncOutcome::failed(
                    "auth_required",
                    self.cached_profile(email).await,
                    SyncSource::Cache,
                )
            }
            Err(err) => {
                warn!(account = %email, error = %err, "all profile endpoints failed");
                Self::fallback(self.cached_profile(email).await)
            }
        }
    }

    /// Replay queued offline writes. Entries leave the queue only on a
    /// confirmed server acknowledgment.
    pub async fn flush_pending(&self) -> Result<DrainOutcome, AppError> {
        let entries = self.queue.list().await?;
        let mut processed = 0;
        let mut remaining = 0;

        for entry in entries {
            match self.replay(&entry).await {
                ReplayResult::Acknowledged => {
                    self.queue.remove(&entry.email).await?;
                    processed += 1;
                }
                ReplayResult::Unparseable => {
                    // Corrupt payloads can never succeed; treat like any
                    // other corrupt stored record and drop them.
                    warn!(account = %entry.email, "dropping unparseable pending entry");
                    self.queue.remove(&entry.email).await?;
                }
                ReplayResult::Retained => {
                    remaining += 1;
                }
            }
        }

        Ok(DrainOutcome {
            processed,
            remaining,
        })
    }

    /// Whether the server has seen writes for this account since our last
    /// recorded local change. Used by the foreground-event polling pass.
    pub async fn has_remote_updates(&self, email: &AccountEmail) -> Result<bool, AppError> {
        let since = self
            .store
            .last_change(email)
            .await?
            .unwrap_or_else(|| chrono::DateTime::<Utc>::UNIX_EPOCH);
        self.gateway.check_updates_since(email, since).await
    }

    /// App-returned-to-foreground trigger; just a sync request.
    pub async fn on_foreground(&self, email: &AccountEmail) -> SyncOutcome<UserProfile> {
        self.sync_now(email).await
    }

    async fn replay(&self, entry: &PendingSyncEntry) -> ReplayResult {
        match entry.data_type.as_str() {
            "profile" => match serde_json::from_value::<UserProfile>(entry.payload.clone()) {
                Ok(profile) => match self.gateway.push_profile(&profile).await {
                    Ok(()) => ReplayResult::Acknowledged,
                    Err(err) => {
                        debug!(account = %entry.email, error = %err, "pending replay failed");
                        ReplayResult::Retained
                    }
                },
                Err(_) => ReplayResult::Unparseable,
            },
            other => {
                debug!(account = %entry.email, data_type = other, "unknown pending data type");
                ReplayResult::Retained
            }
        }
    }

    async fn enqueue_pending(&self, profile: &UserProfile) -> Result<(), AppError> {
        let payload = serde_json::to_value(profile)?;
        self.queue
            .enqueue(PendingSyncEntry::profile(profile.email.clone(), payload))
            .await
    }

    async fn persist_local(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.store.put_profile(profile).await?;
        if let Some(image) = profile.profile_image.as_deref() {
            self.store.put_profile_image(&profile.email, image).await?;
        }
        self.cache.set(profile.clone()).await;
        Ok(())
    }

    async fn cached_profile(&self, email: &AccountEmail) -> Option<UserProfile> {
        if let Some(profile) = self.cache.get(email).await {
            return Some(profile);
        }
        match self.store.get_profile(email).await {
            Ok(found) => {
                if let Some(profile) = found.clone() {
                    self.cache.set(profile).await;
                }
                found
            }
            Err(err) => {
                warn!(account = %email, error = %err, "profile store read failed");
                None
            }
        }
    }

    fn fallback(local: Option<UserProfile>) -> SyncOutcome<UserProfile> {
        match local {
            Some(profile) => SyncOutcome::offline(Some(profile)),
            None => SyncOutcome::no_data(),
        }
    }

    async fn key_throttled(&self, email: &AccountEmail) -> bool {
        let min_interval = Duration::from_secs(self.config.per_key_min_interval_secs);
        if min_interval.is_zero() {
            return false;
        }
        let attempts = self.last_attempts.read().await;
        attempts
            .get(email.as_str())
            .is_some_and(|at| at.elapsed() < min_interval)
    }

    async fn cooldown_active(&self) -> bool {
        let cooldown = Duration::from_secs(self.config.cooldown_secs);
        if cooldown.is_zero() {
            return false;
        }
        let last = self.last_global_sync.read().await;
        last.is_some_and(|at| at.elapsed() < cooldown)
    }

    async fn stamp_attempt(&self, email: &AccountEmail) {
        let mut attempts = self.last_attempts.write().await;
        attempts.insert(email.as_str().to_string(), Instant::now());
    }

    async fn stamp_global_sync(&self) {
        let mut last = self.last_global_sync.write().await;
        *last = Some(Instant::now());
    }
}

enum ReplayResult {
    Acknowledged,
    Retained,
    Unparseable,
}
