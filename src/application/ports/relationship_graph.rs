use async_trait::async_trait;

use crate::domain::value_objects::AccountEmail;
use crate::shared::error::AppError;

/// Durable caregiver-patient mapping, the authorization boundary for all
/// propagation. Visibility is only ever trusted through this graph, never
/// inferred from record contents.
///
/// At most one caregiver per patient; re-linking overwrites the previous
/// caregiver silently.
#[async_trait]
pub trait RelationshipGraph: Send + Sync {
    /// Idempotent. Forward and inverse views update atomically.
    async fn link(
        &self,
        patient: &AccountEmail,
        caregiver: &AccountEmail,
    ) -> Result<(), AppError>;

    async fn caregiver_of(&self, patient: &AccountEmail)
        -> Result<Option<AccountEmail>, AppError>;

    async fn patients_of(&self, caregiver: &AccountEmail)
        -> Result<Vec<AccountEmail>, AppError>;
}
