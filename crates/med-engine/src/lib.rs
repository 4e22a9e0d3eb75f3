//! Medication tracking engine: quantity ledger, administration log, shift audits with
//! reviewer approval, and alerts.

mod alerts;
mod approval;
mod config;
mod engine;
mod ledger;
mod reconciler;
mod recorder;
mod shift;
#[cfg(test)]
pub(crate) mod testing;

pub use alerts::{AlertEngine, NewAlert};
pub use approval::ApprovalWorkflow;
pub use config::{EngineConfig, DEFAULT_LOW_STOCK_THRESHOLD};
pub use engine::MedicationEngine;
pub use ledger::{checked_count, checked_decrement, Ledger};
pub use reconciler::AuditReconciler;
pub use recorder::AdministrationRecorder;
pub use shift::derive_shift;

use med_notify::{MedEvent, Notifier};

/// Hand an event to the notifier. Delivery problems are logged, never returned.
pub(crate) async fn publish(notifier: &dyn Notifier, event: MedEvent) {
    let kind = event.kind();
    if let Err(e) = notifier.notify(event).await {
        tracing::warn!(kind, error = %e, "failed to publish event");
    }
}
