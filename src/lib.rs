pub mod blocks;
pub mod cli;
pub mod config;
pub mod constants;
pub mod logging;
pub mod publisher;
pub mod topic;
pub mod transport;

pub use config::Config;
pub use publisher::{Outcome, TransferSummary, run};
pub use transport::{MqttTransport, Transport};
