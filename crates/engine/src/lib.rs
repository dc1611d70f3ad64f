pub mod dispatch;
pub mod events;
pub mod memory;
pub mod senders;
pub mod service;
pub mod templates;
pub mod worker;

pub use dispatch::{DispatchConfig, Dispatcher};
pub use events::{AlertEvent, EventBus};
pub use service::{AlertEngine, EngineError};
