pub mod admin;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod store;

pub use admin::{
    invalid_credentials, AdminAuthenticator, INVALID_CREDENTIALS, PLACEHOLDER_TOKEN,
};
pub use database::MedicalDb;
pub use memory::InMemoryRecordStore;
pub use metrics::{get_metrics, init_metrics, record_login, record_operation};
pub use store::MedicalRecordStore;
