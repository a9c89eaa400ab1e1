pub mod medical_record;

pub use medical_record::{
    parse_date, validate_new_record, validate_patch, FieldError, FieldErrors, MedicalRecord,
    MedicalRecordPatch, NewMedicalRecord,
};
