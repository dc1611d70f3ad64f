pub mod alerts;
pub mod api_keys;
pub mod deliveries;
pub mod preferences;
pub mod rules;
