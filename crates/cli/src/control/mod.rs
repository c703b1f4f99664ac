//! The local control plane: diagnostics sink, state store, session runtime
//! pool, lane scheduler, worker orchestrator, and contract registry. The
//! daemon transport lives in [`crate::daemon`] since it is wire-level, not
//! control-plane state.

pub mod config;
pub mod contract_registry;
pub mod diagnostics;
pub mod lane_scheduler;
pub mod orchestrator;
pub mod runtime_pool;
pub mod state_store;
