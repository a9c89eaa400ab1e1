use crate::models::{MedicalRecord, MedicalRecordPatch};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

/// Persistence operations behind the record API. Each call touches at most
/// one document and is atomic at that granularity.
#[async_trait]
pub trait MedicalRecordStore: Send + Sync {
    async fn insert(&self, record: &MedicalRecord) -> Result<(), AppError>;

    /// All records, most recently created first.
    async fn list_newest_first(&self) -> Result<Vec<MedicalRecord>, AppError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<MedicalRecord>, AppError>;

    /// The earliest stored record with this (idNumber, serviceCode) pair.
    async fn find_by_subject(
        &self,
        id_number: &str,
        service_code: &str,
    ) -> Result<Option<MedicalRecord>, AppError>;

    /// Applies `patch` and bumps `updatedAt` strictly past its previous value.
    /// Returns the updated record, or `None` when no record has this id.
    async fn update(
        &self,
        id: &ObjectId,
        patch: MedicalRecordPatch,
    ) -> Result<Option<MedicalRecord>, AppError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &ObjectId) -> Result<bool, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
