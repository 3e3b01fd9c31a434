pub mod service;

pub use service::{WeatherPoller, WeatherSchedule};
