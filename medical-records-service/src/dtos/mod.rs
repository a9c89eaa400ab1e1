pub mod admin;
pub mod medical;

pub use admin::{LoginRequest, LoginResponse};
pub use medical::{CreateRecordResponse, MedicalRecordResponse, MessageResponse, SearchParams};
