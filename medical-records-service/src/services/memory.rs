use crate::models::{MedicalRecord, MedicalRecordPatch};
use crate::services::store::MedicalRecordStore;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local store with the same ordering rules as MongoDB: records are
/// kept in insertion order, which is what subject search treats as "first".
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Vec<MedicalRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MedicalRecordStore for InMemoryRecordStore {
    async fn insert(&self, record: &MedicalRecord) -> Result<(), AppError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn list_newest_first(&self) -> Result<Vec<MedicalRecord>, AppError> {
        let mut records = self.records.read().await.clone();
        // Stable sort on a reversed copy: ties keep newest-inserted first.
        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<MedicalRecord>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == *id)
            .cloned())
    }

    async fn find_by_subject(
        &self,
        id_number: &str,
        service_code: &str,
    ) -> Result<Option<MedicalRecord>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id_number == id_number && r.service_code == service_code)
            .cloned())
    }

    async fn update(
        &self,
        id: &ObjectId,
        patch: MedicalRecordPatch,
    ) -> Result<Option<MedicalRecord>, AppError> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == *id) else {
            return Ok(None);
        };

        record.apply(patch);
        record.updated_at = Utc::now().max(record.updated_at + Duration::milliseconds(1));
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, AppError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != *id);
        Ok(records.len() < before)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
