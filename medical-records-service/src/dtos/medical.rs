use crate::models::MedicalRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Wire form of a record. Dates are RFC 3339 with millisecond precision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub service_code: String,
    pub id_number: String,
    pub name: String,
    pub issue_date: String,
    pub start_date: String,
    pub end_date: String,
    pub duration: f64,
    pub doctor: String,
    pub job_title: String,
    pub created_at: String,
    pub updated_at: String,
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<MedicalRecord> for MedicalRecordResponse {
    fn from(record: MedicalRecord) -> Self {
        Self {
            id: record.id.to_hex(),
            service_code: record.service_code,
            id_number: record.id_number,
            name: record.name,
            issue_date: format_timestamp(&record.issue_date),
            start_date: format_timestamp(&record.start_date),
            end_date: format_timestamp(&record.end_date),
            duration: record.duration,
            doctor: record.doctor,
            job_title: record.job_title,
            created_at: format_timestamp(&record.created_at),
            updated_at: format_timestamp(&record.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRecordResponse {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "idNumber")]
    pub id_number: Option<String>,
    #[serde(rename = "serviceCode", alias = "servicecode")]
    pub service_code: Option<String>,
}

impl SearchParams {
    /// Names of the required parameters that are absent or blank.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.id_number) {
            missing.push("idNumber");
        }
        if is_blank(&self.service_code) {
            missing.push("serviceCode");
        }
        missing
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
