pub mod api;
pub mod app;
pub mod config;
pub mod consumer;
pub mod generation;
pub mod logging;
pub mod terminal;
#[cfg(test)]
pub mod test_support;
pub mod tools;
pub mod trace;
pub mod types;
pub mod ui;
pub mod util;
