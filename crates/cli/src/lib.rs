pub mod args;
pub mod artifact_collector;
pub mod browser;
pub mod cli;
pub mod commands;
pub mod context;
pub mod context_store;
pub mod control;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod output;
pub mod project;
pub mod protocol;
pub mod readable;
pub mod relay;
pub mod runtime;
pub mod session;
pub mod session_broker;
pub mod session_helpers;
pub mod styles;
pub mod target;
pub mod test_sync;
pub mod types;
pub mod workspace;
