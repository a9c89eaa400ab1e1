pub mod admin;
pub mod health;
pub mod medical;

pub use admin::admin_login;
pub use health::{health_check, metrics_endpoint};
pub use medical::{
    create_record, delete_record, get_record, list_records, search_records, update_record,
};
