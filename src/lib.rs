pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod settings;
pub mod status;
pub mod view;
pub mod weather;

#[cfg(test)]
pub(crate) mod testing;
