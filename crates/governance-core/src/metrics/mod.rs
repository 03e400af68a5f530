// governance-core/src/metrics/mod.rs
// ============================================================================
// Module: Metrics
// Description: Metric catalog and event-sourced state (component C4).
// Purpose: Re-export `MetricRegistry` and `StateModel` for the rest of the
//          kernel.
// Dependencies: crate::ontology, crate::primitives, bigdecimal
// ============================================================================

pub mod registry;
pub mod state;

pub use registry::MetricDefinition;
pub use registry::MetricRegistry;
pub use registry::MetricType;
pub use registry::RegistryError;
pub use state::HistoryEntry;
pub use state::MetricRecord;
pub use state::StateError;
pub use state::StateModel;
pub use state::StateSnapshot;
