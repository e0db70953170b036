use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::application::ports::{ProfileStore, RelationshipGraph};
use crate::domain::entities::record_owner;
use crate::domain::value_objects::{AccountEmail, DataDomain};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;

/// Whether a patient should pull caregiver data, and from whom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregiverSyncCheck {
    pub needs_sync: bool,
    pub caregiver_email: Option<AccountEmail>,
}

/// Fans caregiver-authored records out to the owning patient's namespace.
///
/// The relationship graph is the only authorization source: records are
/// copied solely for the caregiver the graph records for that patient, and
/// only records whose `forPatient` matches the patient's normalized email.
pub struct PropagationService {
    store: Arc<dyn ProfileStore>,
    graph: Arc<dyn RelationshipGraph>,
    config: SyncConfig,
}

impl PropagationService {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        graph: Arc<dyn RelationshipGraph>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            graph,
            config,
        }
    }

    /// A patient with no caregiver never needs a caregiver sync; one who has
    /// never synced always does.
    pub async fn needs_sync(&self, patient: &AccountEmail) -> Result<CaregiverSyncCheck, AppError> {
        let caregiver = match self.graph.caregiver_of(patient).await? {
            Some(caregiver) => caregiver,
            None => {
                return Ok(CaregiverSyncCheck {
                    needs_sync: false,
                    caregiver_email: None,
                });
            }
        };

        let needs_sync = match self.store.last_caregiver_sync(patient).await? {
            Some(last) => {
                let age = Utc::now().signed_duration_since(last);
                age.num_seconds() < 0 || age.num_seconds() as u64 >= self.config.staleness_window_secs
            }
            None => true,
        };

        Ok(CaregiverSyncCheck {
            needs_sync,
            caregiver_email: Some(caregiver),
        })
    }

    /// Copy the caregiver's records for this patient into the patient's
    /// namespace, one domain at a time. Domains are isolated: a failure in
    /// one never blocks the others. Returns false without touching the store
    /// when `caregiver` is not the patient's recorded caregiver.
    pub async fn sync_from_caregiver(
        &self,
        patient: &AccountEmail,
        caregiver: &AccountEmail,
    ) -> Result<bool, AppError> {
        match self.graph.caregiver_of(patient).await? {
            Some(recorded) if recorded == *caregiver => {}
            recorded => {
                warn!(
                    patient = %patient,
                    caregiver = %caregiver,
                    recorded = ?recorded.as_ref().map(|c| c.as_str()),
                    "rejecting sync from unlinked caregiver"
                );
                return Ok(false);
            }
        }

        for domain in DataDomain::COLLECTIONS {
            if let Err(err) = self.sync_collection(domain, patient, caregiver).await {
                warn!(patient = %patient, %domain, error = %err, "domain sync failed, continuing");
            }
        }

        if let Err(err) = self.sync_home_location(patient, caregiver).await {
            warn!(patient = %patient, error = %err, "home location sync failed, continuing");
        }

        self.store.stamp_caregiver_sync(patient).await?;
        info!(patient = %patient, caregiver = %caregiver, "caregiver data propagated");
        Ok(true)
    }

    async fn sync_collection(
        &self,
        domain: DataDomain,
        patient: &AccountEmail,
        caregiver: &AccountEmail,
    ) -> Result<(), AppError> {
        let records = self.store.get_records(domain, caregiver).await?;
        let for_patient: Vec<_> = records
            .into_iter()
            .filter(|record| record_owner(record).as_ref() == Some(patient))
            .collect();

        debug!(patient = %patient, %domain, count = for_patient.len(), "propagating records");
        self.store.put_records(domain, patient, &for_patient).await
    }

    /// Two legacy source shapes: a dedicated per-patient key, or the map
    /// nested inside the caregiver's own profile. The dedicated key wins.
    async fn sync_home_location(
        &self,
        patient: &AccountEmail,
        caregiver: &AccountEmail,
    ) -> Result<(), AppError> {
        let dedicated = self.store.get_home_location(patient).await?;
        let location = match dedicated {
            Some(location) => Some(location),
            None => self
                .store
                .get_profile(caregiver)
                .await?
                .and_then(|profile| profile.home_location),
        };

        if let Some(location) = location {
            self.store.put_home_location(patient, &location).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use crate::domain::entities::{HomeLocation, UserProfile};

    #[derive(Default)]
    struct MemStore {
        profiles: StdMutex<HashMap<String, UserProfile>>,
        records: StdMutex<HashMap<String, Vec<Value>>>,
        locations: StdMutex<HashMap<String, HomeLocation>>,
        caregiver_syncs: StdMutex<HashMap<String, DateTime<Utc>>>,
    }

    #[async_trait]
    impl ProfileStore for MemStore {
        async fn get_profile(&self, email: &AccountEmail) -> Result<Option<UserProfile>, AppError> {
            Ok(self.profiles.lock().unwrap().get(email.as_str()).cloned())
        }

        async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
            self.profiles
                .lock()
                .unwrap()
                .insert(profile.email.as_str().to_string(), profile.clone());
            Ok(())
        }

        async fn delete_profile(&self, email: &AccountEmail) -> Result<(), AppError> {
            self.profiles.lock().unwrap().remove(email.as_str());
            Ok(())
        }

        async fn get_records(
            &self,
            domain: DataDomain,
            email: &AccountEmail,
        ) -> Result<Vec<Value>, AppError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&domain.storage_key(email))
                .cloned()
                .unwrap_or_default())
        }

        async fn put_records(
            &self,
            domain: DataDomain,
            email: &AccountEmail,
            records: &[Value],
        ) -> Result<(), AppError> {
            self.records
                .lock()
                .unwrap()
                .insert(domain.storage_key(email), records.to_vec());
            Ok(())
        }

        async fn get_home_location(
            &self,
            email: &AccountEmail,
        ) -> Result<Option<HomeLocation>, AppError> {
            Ok(self.locations.lock().unwrap().get(email.as_str()).cloned())
        }

        async fn put_home_location(
            &self,
            email: &AccountEmail,
            location: &HomeLocation,
        ) -> Result<(), AppError> {
            self.locations
                .lock()
                .unwrap()
                .insert(email.as_str().to_string(), location.clone());
            Ok(())
        }

        async fn get_profile_image(
            &self,
            _email: &AccountEmail,
        ) -> Result<Option<String>, AppError> {
            Ok(None)
        }

        async fn put_profile_image(
            &self,
            _email: &AccountEmail,
            _image: &str,
        ) -> Result<(), AppError> {
            Ok(())
        }

        async fn last_caregiver_sync(
            &self,
            email: &AccountEmail,
        ) -> Result<Option<DateTime<Utc>>, AppError> {
            Ok(self
                .caregiver_syncs
                .lock()
                .unwrap()
                .get(email.as_str())
                .copied())
        }

        async fn stamp_caregiver_sync(&self, email: &AccountEmail) -> Result<(), AppError> {
            self.caregiver_syncs
                .lock()
                .unwrap()
                .insert(email.as_str().to_string(), Utc::now());
            Ok(())
        }

        async fn last_change(
            &self,
            _email: &AccountEmail,
        ) -> Result<Option<DateTime<Utc>>, AppError> {
            Ok(None)
        }

        async fn stamp_last_change(&self, _email: &AccountEmail) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemGraph {
        links: StdMutex<HashMap<String, AccountEmail>>,
    }

    #[async_trait]
    impl RelationshipGraph for MemGraph {
        async fn link(
            &self,
            patient: &AccountEmail,
            caregiver: &AccountEmail,
        ) -> Result<(), AppError> {
            self.links
                .lock()
                .unwrap()
                .insert(patient.as_str().to_string(), caregiver.clone());
            Ok(())
        }

        async fn caregiver_of(
            &self,
            patient: &AccountEmail,
        ) -> Result<Option<AccountEmail>, AppError> {
            Ok(self.links.lock().unwrap().get(patient.as_str()).cloned())
        }

        async fn patients_of(
            &self,
            caregiver: &AccountEmail,
        ) -> Result<Vec<AccountEmail>, AppError> {
            Ok(self
                .links
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, c)| *c == caregiver)
                .map(|(p, _)| AccountEmail::new(p).unwrap())
                .collect())
        }
    }

    fn email(raw: &str) -> AccountEmail {
        AccountEmail::new(raw).unwrap()
    }

    fn test_config(staleness_window_secs: u64) -> SyncConfig {
        SyncConfig {
            cooldown_secs: 0,
            per_key_min_interval_secs: 0,
            staleness_window_secs,
            pending_soft_cap: 500,
            cache_ttl_secs: 600,
        }
    }

    struct Harness {
        store: Arc<MemStore>,
        graph: Arc<MemGraph>,
        service: PropagationService,
    }

    fn harness(staleness_window_secs: u64) -> Harness {
        let store = Arc::new(MemStore::default());
        let graph = Arc::new(MemGraph::default());
        let service = PropagationService::new(
            store.clone(),
            graph.clone(),
            test_config(staleness_window_secs),
        );
        Harness {
            store,
            graph,
            service,
        }
    }

    #[tokio::test]
    async fn test_propagates_only_records_owned_by_the_patient() {
        let h = harness(900);
        h.graph.link(&email("p@x.com"), &email("c@x.com")).await.unwrap();

        let records = vec![
            json!({"id": "r1", "title": "meds", "forPatient": "p@x.com"}),
            json!({"id": "r2", "title": "other", "forPatient": "other@x.com"}),
            json!({"id": "r3", "title": "unowned"}),
        ];
        h.store
            .put_records(DataDomain::Reminders, &email("c@x.com"), &records)
            .await
            .unwrap();

        let synced = h
            .service
            .sync_from_caregiver(&email("p@x.com"), &email("c@x.com"))
            .await
            .unwrap();
        assert!(synced);

        let mine = h
            .store
            .get_records(DataDomain::Reminders, &email("p@x.com"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["id"], "r1");
    }

    #[tokio::test]
    async fn test_owner_match_uses_normalized_email() {
        let h = harness(900);
        h.graph.link(&email("p@x.com"), &email("c@x.com")).await.unwrap();

        let records = vec![json!({"id": "r1", "forPatient": " P@X.COM "})];
        h.store
            .put_records(DataDomain::Memories, &email("c@x.com"), &records)
            .await
            .unwrap();

        h.service
            .sync_from_caregiver(&email("p@x.com"), &email("c@x.com"))
            .await
            .unwrap();

        let mine = h
            .store
            .get_records(DataDomain::Memories, &email("p@x.com"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn test_unlinked_caregiver_is_rejected_without_store_writes() {
        let h = harness(900);
        h.graph.link(&email("p@x.com"), &email("real@x.com")).await.unwrap();

        let records = vec![json!({"id": "r1", "forPatient": "p@x.com"})];
        h.store
            .put_records(DataDomain::Reminders, &email("intruder@x.com"), &records)
            .await
            .unwrap();

        let synced = h
            .service
            .sync_from_caregiver(&email("p@x.com"), &email("intruder@x.com"))
            .await
            .unwrap();
        assert!(!synced);

        let mine = h
            .store
            .get_records(DataDomain::Reminders, &email("p@x.com"))
            .await
            .unwrap();
        assert!(mine.is_empty());
        assert!(h
            .store
            .last_caregiver_sync(&email("p@x.com"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_home_location_prefers_dedicated_patient_key() {
        let h = harness(900);
        h.graph.link(&email("p@x.com"), &email("c@x.com")).await.unwrap();

        h.store
            .put_home_location(
                &email("p@x.com"),
                &HomeLocation {
                    latitude: 1.0,
                    longitude: 2.0,
                    address: Some("dedicated".to_string()),
                },
            )
            .await
            .unwrap();
        let mut caregiver_profile = UserProfile::new(email("c@x.com"));
        caregiver_profile.home_location = Some(HomeLocation {
            latitude: 9.0,
            longitude: 9.0,
            address: Some("profile".to_string()),
        });
        h.store.put_profile(&caregiver_profile).await.unwrap();

        h.service
            .sync_from_caregiver(&email("p@x.com"), &email("c@x.com"))
            .await
            .unwrap();

        let location = h
            .store
            .get_home_location(&email("p@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(location.address.as_deref(), Some("dedicated"));
    }

    #[tokio::test]
    async fn test_needs_sync_is_false_without_a_caregiver() {
        let h = harness(900);
        let check = h.service.needs_sync(&email("p@x.com")).await.unwrap();
        assert!(!check.needs_sync);
        assert!(check.caregiver_email.is_none());
    }

    #[tokio::test]
    async fn test_needs_sync_is_true_before_first_sync() {
        let h = harness(900);
        h.graph.link(&email("p@x.com"), &email("c@x.com")).await.unwrap();

        let check = h.service.needs_sync(&email("p@x.com")).await.unwrap();
        assert!(check.needs_sync);
        assert_eq!(check.caregiver_email, Some(email("c@x.com")));
    }

    #[tokio::test]
    async fn test_needs_sync_tracks_the_staleness_window() {
        let h = harness(900);
        h.graph.link(&email("p@x.com"), &email("c@x.com")).await.unwrap();

        h.store.stamp_caregiver_sync(&email("p@x.com")).await.unwrap();
        let fresh = h.service.needs_sync(&email("p@x.com")).await.unwrap();
        assert!(!fresh.needs_sync);

        h.store
            .caregiver_syncs
            .lock()
            .unwrap()
            .insert("p@x.com".to_string(), Utc::now() - ChronoDuration::seconds(901));
        let stale = h.service.needs_sync(&email("p@x.com")).await.unwrap();
        assert!(stale.needs_sync);
    }
}
