// governance-core/src/metrics/registry.rs
// ============================================================================
// Module: Metric Registry
// Description: Typed catalog of metric definitions.
// Purpose: Component C4 (half): the validators every mutation must pass
//          before `StateModel` ever sees it.
// Dependencies: crate::ontology::identifiers, std::collections::HashMap
// ============================================================================

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::ontology::MetricId;
use crate::ontology::MetricValue;
use thiserror::Error;

/// The three metric kinds the kernel understands natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    /// A monotonically-tracked accumulator; mutations are increments and the
    /// running total may never go negative.
    Counter,
    /// A point-in-time numeric reading; mutations are absolute sets.
    Gauge,
    /// A two-valued flag; mutations are absolute sets.
    Boolean,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Counter => "COUNTER",
            Self::Gauge => "GAUGE",
            Self::Boolean => "BOOLEAN",
        };
        f.write_str(label)
    }
}

/// A registered metric's catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// The metric's identifier.
    pub id: MetricId,
    /// The metric's type, governing validation and mutation semantics.
    pub metric_type: MetricType,
    /// A human-readable unit label (e.g. `"credits"`, `"percent"`); purely
    /// descriptive, not enforced.
    pub unit: String,
}

impl MetricDefinition {
    /// Returns whether `value` is an acceptable shape for this metric's type
    /// (type-level acceptance only; numeric finiteness and counter
    /// non-negativity are checked by `StateModel::validate_mutation`, which
    /// needs the current running total).
    #[must_use]
    pub fn accepts(&self, value: &MetricValue) -> bool {
        match self.metric_type {
            Self::Counter | Self::Gauge => value.as_number().is_some(),
            Self::Boolean => value.as_bool().is_some(),
        }
        .then_some(())
        .is_some()
    }
}

/// Errors raised by [`MetricRegistry::register`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A metric with this id is already registered under a different type.
    #[error("metric redefined with a different type: {0}")]
    MetricRedefined(MetricId),
}

/// Catalog of known metric definitions.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    definitions: HashMap<MetricId, MetricDefinition>,
}

impl MetricRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a metric definition.
    ///
    /// Re-registering the same id with the same type is a harmless no-op
    /// (idempotent genesis loading); re-registering with a different type
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MetricRedefined`] if `def.id` is already
    /// registered under a different [`MetricType`].
    pub fn register(&mut self, def: MetricDefinition) -> Result<(), RegistryError> {
        if let Some(existing) = self.definitions.get(&def.id) {
            if existing.metric_type != def.metric_type {
                return Err(RegistryError::MetricRedefined(def.id));
            }
            return Ok(());
        }
        self.definitions.insert(def.id.clone(), def);
        Ok(())
    }

    /// Returns the definition registered under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &MetricId) -> Option<&MetricDefinition> {
        self.definitions.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(id: &str) -> MetricDefinition {
        MetricDefinition {
            id: MetricId::new(id),
            metric_type: MetricType::Counter,
            unit: "credits".to_string(),
        }
    }

    #[test]
    fn redefining_with_different_type_fails() {
        let mut registry = MetricRegistry::new();
        registry.register(counter("wealth")).unwrap();
        let mut gauge = counter("wealth");
        gauge.metric_type = MetricType::Gauge;
        assert_eq!(
            registry.register(gauge),
            Err(RegistryError::MetricRedefined(MetricId::new("wealth")))
        );
    }

    #[test]
    fn reregistering_same_type_is_idempotent() {
        let mut registry = MetricRegistry::new();
        registry.register(counter("wealth")).unwrap();
        assert!(registry.register(counter("wealth")).is_ok());
    }

    #[test]
    fn boolean_definition_rejects_numeric_value() {
        let def = MetricDefinition {
            id: MetricId::new("flagged"),
            metric_type: MetricType::Boolean,
            unit: String::new(),
        };
        assert!(!def.accepts(&MetricValue::from_i64(1)));
        assert!(def.accepts(&MetricValue::Bool(true)));
    }
}
