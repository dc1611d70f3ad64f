pub mod models;
pub mod queries;
pub mod stores;

pub use stores::{PgAlertLedger, PgPreferenceStore, PgRuleStore};
