pub mod service;

pub use service::{StatusFeed, StatusPoller};
