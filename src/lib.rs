pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod server;
pub mod sweeper;
pub mod table;

pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use config::Config;
pub use engine::{AdmissionParams, ClientRecord, Decision};
pub use error::{AdmissionError, ConfigError};
pub use limiter::{AdmissionControl, Outcome};
pub use middleware::AdmissionState;
pub use response::ErrorBody;
pub use server::{create_app, Server};
