//! Consumers of the payment status: the background poller and its HTTP source.

pub mod http;
pub mod poller;

pub use http::HttpStatusSource;
pub use poller::{PollSnapshot, PollerConfig, PollerHandle, StatusPoller, StatusSource};
