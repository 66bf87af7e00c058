// Library interface for lazyjson
// Exposes the ingestion, parsing and table modules to the binary and to
// integration tests

pub mod app;
pub mod cancel;
pub mod config;
pub mod event;
pub mod filter;
pub mod handlers;
pub mod index;
pub mod logging;
pub mod reader;
pub mod renderer;
pub mod signal;
pub mod source;
pub mod streamer;
pub mod table;
pub mod ui;
pub mod viewport;

#[cfg(test)]
mod test_utils;
