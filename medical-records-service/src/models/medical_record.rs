use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service_core::error::AppError;
use std::fmt;

pub const SERVICE_CODE: &str = "serviceCode";
pub const ID_NUMBER: &str = "idNumber";
pub const NAME: &str = "name";
pub const ISSUE_DATE: &str = "issueDate";
pub const START_DATE: &str = "startDate";
pub const END_DATE: &str = "endDate";
pub const DURATION: &str = "duration";
pub const DOCTOR: &str = "doctor";
pub const JOB_TITLE: &str = "jobTitle";

/// Older clients spell the service code in lowercase.
pub const LEGACY_SERVICE_CODE: &str = "servicecode";

/// A stored medical record, as persisted in the `medicalrecords` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(alias = "servicecode")]
    pub service_code: String,
    pub id_number: String,
    pub name: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub issue_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    pub duration: f64,
    pub doctor: String,
    pub job_title: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl MedicalRecord {
    /// Assigns a fresh identity and creation timestamps to validated input.
    pub fn new(input: NewMedicalRecord) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            service_code: input.service_code,
            id_number: input.id_number,
            name: input.name,
            issue_date: input.issue_date,
            start_date: input.start_date,
            end_date: input.end_date,
            duration: input.duration,
            doctor: input.doctor,
            job_title: input.job_title,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the fields present in `patch`. Timestamps are left alone.
    pub fn apply(&mut self, patch: MedicalRecordPatch) {
        if let Some(v) = patch.service_code {
            self.service_code = v;
        }
        if let Some(v) = patch.id_number {
            self.id_number = v;
        }
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.issue_date {
            self.issue_date = v;
        }
        if let Some(v) = patch.start_date {
            self.start_date = v;
        }
        if let Some(v) = patch.end_date {
            self.end_date = v;
        }
        if let Some(v) = patch.duration {
            self.duration = v;
        }
        if let Some(v) = patch.doctor {
            self.doctor = v;
        }
        if let Some(v) = patch.job_title {
            self.job_title = v;
        }
    }
}

/// A complete, validated record payload that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedicalRecord {
    pub service_code: String,
    pub id_number: String,
    pub name: String,
    pub issue_date: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration: f64,
    pub doctor: String,
    pub job_title: String,
}

/// Validated field overwrites for an update. `None` means "keep current".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicalRecordPatch {
    pub service_code: Option<String>,
    pub id_number: Option<String>,
    pub name: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub doctor: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn required(field: &'static str) -> Self {
        Self {
            field,
            message: format!("Path `{}` is required.", field),
        }
    }

    fn invalid(field: &'static str, expected: &str) -> Self {
        Self {
            field,
            message: format!("Path `{}` must be {}.", field, expected),
        }
    }
}

/// Every field-level problem found in one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MedicalRecord validation failed: ")?;
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::BadRequest(anyhow::Error::new(errors))
    }
}

/// Checks a create payload: every domain field present, non-empty, and of
/// its declared JSON type. Unknown keys are ignored.
pub fn validate_new_record(payload: &Value) -> Result<NewMedicalRecord, FieldErrors> {
    let object = as_object(payload)?;
    let mut reader = FieldReader::new(object);

    let service_code = reader.required_string(SERVICE_CODE);
    let id_number = reader.required_string(ID_NUMBER);
    let name = reader.required_string(NAME);
    let issue_date = reader.required_date(ISSUE_DATE);
    let start_date = reader.required_date(START_DATE);
    let end_date = reader.required_date(END_DATE);
    let duration = reader.required_number(DURATION);
    let doctor = reader.required_string(DOCTOR);
    let job_title = reader.required_string(JOB_TITLE);

    reader.finish()?;

    // finish() returned Ok, so every field above is Some.
    Ok(NewMedicalRecord {
        service_code: service_code.unwrap_or_default(),
        id_number: id_number.unwrap_or_default(),
        name: name.unwrap_or_default(),
        issue_date: issue_date.unwrap_or_default(),
        start_date: start_date.unwrap_or_default(),
        end_date: end_date.unwrap_or_default(),
        duration: duration.unwrap_or_default(),
        doctor: doctor.unwrap_or_default(),
        job_title: job_title.unwrap_or_default(),
    })
}

/// Checks an update payload. Only the keys present are validated, with the
/// same rules as creation, so applying the patch to a valid record always
/// yields a valid record.
pub fn validate_patch(payload: &Value) -> Result<MedicalRecordPatch, FieldErrors> {
    let object = as_object(payload)?;
    let mut reader = FieldReader::new(object);

    let patch = MedicalRecordPatch {
        service_code: reader.optional_string(SERVICE_CODE),
        id_number: reader.optional_string(ID_NUMBER),
        name: reader.optional_string(NAME),
        issue_date: reader.optional_date(ISSUE_DATE),
        start_date: reader.optional_date(START_DATE),
        end_date: reader.optional_date(END_DATE),
        duration: reader.optional_number(DURATION),
        doctor: reader.optional_string(DOCTOR),
        job_title: reader.optional_string(JOB_TITLE),
    };

    reader.finish()?;
    Ok(patch)
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    payload.as_object().ok_or_else(|| {
        FieldErrors(vec![FieldError {
            field: "body",
            message: "Request body must be a JSON object.".to_string(),
        }])
    })
}

struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            errors: Vec::new(),
        }
    }

    fn lookup(&self, field: &'static str) -> Option<&'a Value> {
        let value = self.object.get(field);
        if value.is_none() && field == SERVICE_CODE {
            return self.object.get(LEGACY_SERVICE_CODE);
        }
        value
    }

    fn required_string(&mut self, field: &'static str) -> Option<String> {
        match self.lookup(field) {
            None | Some(Value::Null) => self.fail(FieldError::required(field)),
            Some(value) => self.string(field, value),
        }
    }

    fn optional_string(&mut self, field: &'static str) -> Option<String> {
        match self.lookup(field) {
            None => None,
            Some(Value::Null) => self.fail(FieldError::required(field)),
            Some(value) => self.string(field, value),
        }
    }

    fn required_date(&mut self, field: &'static str) -> Option<DateTime<Utc>> {
        match self.lookup(field) {
            None | Some(Value::Null) => self.fail(FieldError::required(field)),
            Some(value) => self.date(field, value),
        }
    }

    fn optional_date(&mut self, field: &'static str) -> Option<DateTime<Utc>> {
        match self.lookup(field) {
            None => None,
            Some(Value::Null) => self.fail(FieldError::required(field)),
            Some(value) => self.date(field, value),
        }
    }

    fn required_number(&mut self, field: &'static str) -> Option<f64> {
        match self.lookup(field) {
            None | Some(Value::Null) => self.fail(FieldError::required(field)),
            Some(value) => self.number(field, value),
        }
    }

    fn optional_number(&mut self, field: &'static str) -> Option<f64> {
        match self.lookup(field) {
            None => None,
            Some(Value::Null) => self.fail(FieldError::required(field)),
            Some(value) => self.number(field, value),
        }
    }

    fn string(&mut self, field: &'static str, value: &Value) -> Option<String> {
        match value {
            Value::String(s) if s.trim().is_empty() => self.fail(FieldError::required(field)),
            Value::String(s) => Some(s.clone()),
            _ => self.fail(FieldError::invalid(field, "a string")),
        }
    }

    fn date(&mut self, field: &'static str, value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) if s.trim().is_empty() => self.fail(FieldError::required(field)),
            Value::String(s) => match parse_date(s.trim()) {
                Some(date) => Some(date),
                None => self.fail(FieldError::invalid(
                    field,
                    "a date (YYYY-MM-DD or RFC 3339)",
                )),
            },
            _ => self.fail(FieldError::invalid(
                field,
                "a date (YYYY-MM-DD or RFC 3339)",
            )),
        }
    }

    fn number(&mut self, field: &'static str, value: &Value) -> Option<f64> {
        match value.as_f64() {
            Some(n) if n.is_finite() => Some(n),
            _ => self.fail(FieldError::invalid(field, "a number")),
        }
    }

    fn fail<T>(&mut self, error: FieldError) -> Option<T> {
        self.errors.push(error);
        None
    }

    fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(FieldErrors(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "serviceCode": "A1",
            "idNumber": "123",
            "name": "X",
            "issueDate": "2024-01-01",
            "startDate": "2024-01-01",
            "endDate": "2024-01-10",
            "duration": 9,
            "doctor": "Dr. Y",
            "jobTitle": "Engineer"
        })
    }

    #[test]
    fn accepts_complete_payload() {
        let record = validate_new_record(&valid_payload()).expect("payload should be valid");
        assert_eq!(record.service_code, "A1");
        assert_eq!(record.duration, 9.0);
        assert_eq!(record.end_date, parse_date("2024-01-10").unwrap());
    }

    #[test]
    fn each_missing_field_is_reported() {
        for field in [
            SERVICE_CODE,
            ID_NUMBER,
            NAME,
            ISSUE_DATE,
            START_DATE,
            END_DATE,
            DURATION,
            DOCTOR,
            JOB_TITLE,
        ] {
            let mut payload = valid_payload();
            payload.as_object_mut().unwrap().remove(field);

            let errors = validate_new_record(&payload).unwrap_err();
            assert_eq!(errors.fields().collect::<Vec<_>>(), vec![field]);
            assert!(errors.to_string().contains(field));
        }
    }

    #[test]
    fn collects_every_error_in_one_pass() {
        let errors = validate_new_record(&json!({ "duration": "nine" })).unwrap_err();
        assert_eq!(errors.0.len(), 9);
    }

    #[test]
    fn rejects_type_coercion() {
        let mut payload = valid_payload();
        payload["duration"] = json!("9");
        payload["idNumber"] = json!(123);

        let errors = validate_new_record(&payload).unwrap_err();
        let mut fields: Vec<_> = errors.fields().collect();
        fields.sort();
        assert_eq!(fields, vec![DURATION, ID_NUMBER]);
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let mut payload = valid_payload();
        payload["name"] = json!("  ");

        let errors = validate_new_record(&payload).unwrap_err();
        assert_eq!(errors.0, vec![FieldError::required(NAME)]);
    }

    #[test]
    fn rejects_unparseable_dates() {
        let mut payload = valid_payload();
        payload["startDate"] = json!("01/02/2024");

        let errors = validate_new_record(&payload).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![START_DATE]);
    }

    #[test]
    fn accepts_legacy_service_code_key() {
        let mut payload = valid_payload();
        let object = payload.as_object_mut().unwrap();
        object.remove(SERVICE_CODE);
        object.insert(LEGACY_SERVICE_CODE.to_string(), json!("B7"));

        let record = validate_new_record(&payload).unwrap();
        assert_eq!(record.service_code, "B7");
    }

    #[test]
    fn end_before_start_is_permitted() {
        let mut payload = valid_payload();
        payload["endDate"] = json!("2023-12-01");
        assert!(validate_new_record(&payload).is_ok());
    }

    #[test]
    fn rejects_non_object_body() {
        let errors = validate_new_record(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["body"]);
    }

    #[test]
    fn patch_only_validates_supplied_fields() {
        let patch = validate_patch(&json!({ "name": "Z", "duration": 3.5 })).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Z"));
        assert_eq!(patch.duration, Some(3.5));
        assert!(patch.doctor.is_none());
    }

    #[test]
    fn patch_cannot_null_required_fields() {
        let errors = validate_patch(&json!({ "doctor": null })).unwrap_err();
        assert_eq!(errors.0, vec![FieldError::required(DOCTOR)]);
    }

    #[test]
    fn apply_keeps_unmentioned_fields() {
        let mut record = MedicalRecord::new(validate_new_record(&valid_payload()).unwrap());
        let before = record.clone();

        record.apply(validate_patch(&json!({ "jobTitle": "Manager" })).unwrap());

        assert_eq!(record.job_title, "Manager");
        assert_eq!(record.name, before.name);
        assert_eq!(record.id, before.id);
        assert_eq!(record.created_at, before.created_at);
    }

    #[test]
    fn reads_documents_stored_with_lowercase_service_code() {
        use mongodb::bson::{doc, DateTime as BsonDateTime};

        let now = BsonDateTime::now();
        let stored = doc! {
            "_id": ObjectId::new(),
            "servicecode": "A1",
            "idNumber": "123",
            "name": "X",
            "issueDate": now,
            "startDate": now,
            "endDate": now,
            "duration": 9,
            "doctor": "Dr. Y",
            "jobTitle": "Engineer",
            "createdAt": now,
            "updatedAt": now,
            "__v": 0,
        };

        let record: MedicalRecord = mongodb::bson::from_document(stored).unwrap();
        assert_eq!(record.service_code, "A1");
        assert_eq!(record.duration, 9.0);
    }

    #[test]
    fn parses_rfc3339_dates() {
        let parsed = parse_date("2024-03-05T10:30:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-05T08:30:00+00:00");
    }
}
