pub mod config;
pub mod events;
pub mod session;
pub mod stats;

pub use config::{LoggingSettings, SessionConfig};
pub use events::{DisconnectReason, EventCollector, EventHandler, JoinAbortReason, SessionEvent};
pub use session::{Session, SessionBuilder};
pub use stats::{NetStatistics, TrafficCounters};
