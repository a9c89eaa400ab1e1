use crate::models::{MedicalRecord, MedicalRecordPatch};
use crate::services::store::MedicalRecordStore;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document},
    options::{FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

const RECORDS_COLLECTION: &str = "medicalrecords";

#[derive(Clone)]
pub struct MedicalDb {
    client: MongoClient,
    db: Database,
}

impl MedicalDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        let store = Self { client, db };

        // The driver connects lazily; ping so an unreachable server fails startup.
        store.health_check().await?;
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(store)
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for medical-records-service");

        let records = self.records();

        // Newest-first listing
        let created_index = IndexModel::builder()
            .keys(doc! { "createdAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("created_at_idx".to_string())
                    .build(),
            )
            .build();

        records.create_index(created_index, None).await.map_err(|e| {
            tracing::error!("Failed to create createdAt index: {}", e);
            AppError::from(e)
        })?;

        // Search by subject. Not unique: the same pair may appear many times.
        let subject_index = IndexModel::builder()
            .keys(doc! { "idNumber": 1, "serviceCode": 1 })
            .options(
                IndexOptions::builder()
                    .name("subject_lookup".to_string())
                    .build(),
            )
            .build();

        records.create_index(subject_index, None).await.map_err(|e| {
            tracing::error!("Failed to create (idNumber, serviceCode) index: {}", e);
            AppError::from(e)
        })?;

        // Documents written by older deployments key the code as `servicecode`.
        let legacy_subject_index = IndexModel::builder()
            .keys(doc! { "idNumber": 1, "servicecode": 1 })
            .options(
                IndexOptions::builder()
                    .name("legacy_subject_lookup".to_string())
                    .build(),
            )
            .build();

        records
            .create_index(legacy_subject_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create (idNumber, servicecode) index: {}", e);
                AppError::from(e)
            })?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub fn records(&self) -> Collection<MedicalRecord> {
        self.db.collection(RECORDS_COLLECTION)
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }
}

/// Matches a subject under either spelling of the service code key.
fn subject_filter(id_number: &str, service_code: &str) -> Document {
    doc! {
        "idNumber": id_number,
        "$or": [
            { "serviceCode": service_code },
            { "servicecode": service_code },
        ],
    }
}

/// Builds the update pipeline. User values are wrapped in `$literal` so
/// strings starting with `$` are never read as field paths. A legacy
/// `servicecode` key is moved to `serviceCode` on the way through.
fn update_pipeline(patch: MedicalRecordPatch) -> Vec<Document> {
    let mut set = Document::new();

    match patch.service_code {
        Some(value) => set.insert("serviceCode", doc! { "$literal": value }),
        None => set.insert(
            "serviceCode",
            doc! { "$ifNull": ["$serviceCode", "$servicecode"] },
        ),
    };

    let strings = [
        ("idNumber", patch.id_number),
        ("name", patch.name),
        ("doctor", patch.doctor),
        ("jobTitle", patch.job_title),
    ];
    for (field, value) in strings {
        if let Some(value) = value {
            set.insert(field, doc! { "$literal": value });
        }
    }

    let dates = [
        ("issueDate", patch.issue_date),
        ("startDate", patch.start_date),
        ("endDate", patch.end_date),
    ];
    for (field, value) in dates {
        if let Some(value) = value {
            set.insert(field, doc! { "$literal": BsonDateTime::from_chrono(value) });
        }
    }

    if let Some(duration) = patch.duration {
        set.insert("duration", doc! { "$literal": Bson::Double(duration) });
    }

    // Strictly increasing even when two updates land in the same millisecond.
    set.insert(
        "updatedAt",
        doc! { "$max": ["$$NOW", { "$add": ["$updatedAt", 1_i64] }] },
    );

    vec![doc! { "$set": set }, doc! { "$unset": "servicecode" }]
}

#[async_trait]
impl MedicalRecordStore for MedicalDb {
    async fn insert(&self, record: &MedicalRecord) -> Result<(), AppError> {
        self.records().insert_one(record, None).await.map_err(|e| {
            tracing::error!("Failed to insert medical record: {}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn list_newest_first(&self) -> Result<Vec<MedicalRecord>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .build();

        let cursor = self.records().find(doc! {}, options).await.map_err(|e| {
            tracing::error!("Failed to list medical records: {}", e);
            AppError::from(e)
        })?;

        cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to read medical records cursor: {}", e);
            AppError::from(e)
        })
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<MedicalRecord>, AppError> {
        self.records()
            .find_one(doc! { "_id": *id }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to find medical record: {}", e);
                AppError::from(e)
            })
    }

    async fn find_by_subject(
        &self,
        id_number: &str,
        service_code: &str,
    ) -> Result<Option<MedicalRecord>, AppError> {
        let options = FindOneOptions::builder().sort(doc! { "_id": 1 }).build();

        self.records()
            .find_one(subject_filter(id_number, service_code), options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to search medical records: {}", e);
                AppError::from(e)
            })
    }

    async fn update(
        &self,
        id: &ObjectId,
        patch: MedicalRecordPatch,
    ) -> Result<Option<MedicalRecord>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.records()
            .find_one_and_update(doc! { "_id": *id }, update_pipeline(patch), options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update medical record: {}", e);
                AppError::from(e)
            })
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, AppError> {
        let result = self
            .records()
            .delete_one(doc! { "_id": *id }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete medical record: {}", e);
                AppError::from(e)
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_date;

    #[test]
    fn update_pipeline_sets_only_patched_fields() {
        let patch = MedicalRecordPatch {
            name: Some("$where".to_string()),
            end_date: parse_date("2024-02-01"),
            ..Default::default()
        };

        let pipeline = update_pipeline(patch);
        let set = pipeline[0].get_document("$set").unwrap();

        assert_eq!(
            set.get_document("name").unwrap().get_str("$literal").unwrap(),
            "$where"
        );
        assert!(set.get_document("endDate").is_ok());
        assert!(set.get_document("updatedAt").is_ok());
        assert!(!set.contains_key("doctor"));
        assert!(!set.contains_key("createdAt"));
    }

    #[test]
    fn update_pipeline_carries_legacy_service_code_forward() {
        let pipeline = update_pipeline(MedicalRecordPatch::default());
        let set = pipeline[0].get_document("$set").unwrap();

        let fallback = set.get_document("serviceCode").unwrap().get_array("$ifNull").unwrap();
        assert_eq!(fallback[0].as_str(), Some("$serviceCode"));
        assert_eq!(fallback[1].as_str(), Some("$servicecode"));
        assert_eq!(pipeline[1].get_str("$unset").unwrap(), "servicecode");

        let patched = update_pipeline(MedicalRecordPatch {
            service_code: Some("B2".to_string()),
            ..Default::default()
        });
        let set = patched[0].get_document("$set").unwrap();
        assert_eq!(
            set.get_document("serviceCode").unwrap().get_str("$literal").unwrap(),
            "B2"
        );
    }

    #[test]
    fn subject_filter_accepts_both_service_code_keys() {
        let filter = subject_filter("123", "A1");
        assert_eq!(filter.get_str("idNumber").unwrap(), "123");

        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(
            branches[0].as_document().unwrap().get_str("serviceCode").unwrap(),
            "A1"
        );
        assert_eq!(
            branches[1].as_document().unwrap().get_str("servicecode").unwrap(),
            "A1"
        );
    }
}
