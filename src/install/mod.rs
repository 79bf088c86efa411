//! Executable replacement: slot paths, strategies, the install state machine
//! and startup reconciliation.

mod installer;
mod reconcile;
mod slot;
mod strategy;

pub use installer::{AtomicInstaller, InstallReport, InstallState, run_install};
pub use reconcile::{ReconcileReport, reconcile_slot, sweep_downloads};
pub use slot::ExecutableSlot;
pub use strategy::{
    DirectCopyStrategy, ReplaceStrategy, ZipExeStrategy, for_host as strategy_for_host,
};
