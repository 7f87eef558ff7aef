//! LoadGuard: lowers the priority of CPU-hungry processes while the host is
//! busy, and puts every one of them back before it exits.

pub mod config;
pub mod evaluator;
pub mod ledger;
pub mod lifecycle;
pub mod monitor;
pub mod platform;
pub mod restore;
pub mod sampler;
pub mod scanner;
pub mod signals;
pub mod status;
pub mod throttle;
