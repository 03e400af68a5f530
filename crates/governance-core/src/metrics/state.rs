// governance-core/src/metrics/state.rs
// ============================================================================
// Module: State Model
// Description: Current metric values plus the hash-linked snapshot chain.
// Purpose: Component C4 (half): the only place mutations are ever applied.
// Dependencies: crate::{metrics::registry, ontology, primitives}, bigdecimal
// ============================================================================

//! ## Overview
//! `StateModel` is "trusted-write-only": nothing outside
//! [`crate::kernel`] may call [`StateModel::apply_trusted`] with mutations
//! that were not already accepted by the Guard pipeline. Numeric mutations
//! are parsed into [`bigdecimal::BigDecimal`] so repeated `COUNTER`
//! increments are exact and replay-stable, avoiding `f64` equality drift.

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use thiserror::Error;

use crate::metrics::registry::MetricRegistry;
use crate::metrics::registry::MetricType;
use crate::ontology::EntityId;
use crate::ontology::EvidenceId;
use crate::ontology::MetricId;
use crate::ontology::MetricValue;
use crate::ontology::Mutation;
use crate::primitives::HashDigest;
use crate::primitives::LogicalTimestamp;
use crate::primitives::ZERO_DIGEST;
use crate::primitives::canonical_json_bytes;
use crate::primitives::hash_bytes;

/// One metric's recorded value plus provenance, as carried in a
/// [`StateSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// The current value.
    pub value: MetricValue,
    /// When this value was last updated.
    pub updated_at: LogicalTimestamp,
    /// Who last updated it.
    pub updated_by: EntityId,
    /// The Evidence entry that recorded this update.
    pub evidence_id: EvidenceId,
}

/// One value-change record returned by [`StateModel::get_history`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The value after this change.
    pub value: MetricValue,
    /// When the change was recorded.
    pub timestamp: LogicalTimestamp,
    /// Who made the change.
    pub updated_by: EntityId,
    /// The Evidence entry that recorded the change.
    pub evidence_id: EvidenceId,
}

/// An immutable point-in-time snapshot of the metric store, hash-linked to
/// its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Monotonically increasing snapshot version, starting at 0 (genesis).
    pub version: u64,
    /// The Action whose commit produced this snapshot (`None` for genesis).
    pub action_id: Option<crate::ontology::ActionId>,
    /// When this snapshot was produced.
    pub timestamp: LogicalTimestamp,
    /// Every metric's current value.
    pub metrics: BTreeMap<MetricId, MetricRecord>,
    /// This snapshot's content hash.
    pub hash: HashDigest,
    /// The preceding snapshot's hash; the zero digest for genesis.
    pub previous_hash: HashDigest,
}

#[derive(Debug, Clone, Serialize)]
struct SnapshotContent<'a> {
    version: u64,
    action_id: &'a Option<crate::ontology::ActionId>,
    timestamp: LogicalTimestamp,
    metrics: &'a BTreeMap<MetricId, MetricRecord>,
    previous_hash: HashDigest,
}

/// Errors raised while validating or applying mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The target metric has no registered definition.
    #[error("unregistered metric: {0}")]
    UnregisteredMetric(MetricId),
    /// The value's shape does not match the metric's declared type.
    #[error("value rejected by metric validator: {0}")]
    ValidatorRejected(MetricId),
    /// A numeric value was not finite (`NaN` or `±Infinity`).
    #[error("non-finite numeric value for metric: {0}")]
    NonFinite(MetricId),
    /// A `COUNTER` mutation would drive the running total negative.
    #[error("counter would go negative: {0}")]
    CounterNegative(MetricId),
    /// Canonicalization of the snapshot content failed.
    #[error("snapshot canonicalization failed: {0}")]
    Canonicalization(#[from] crate::primitives::HashError),
}

/// Holds the current metric values and the snapshot chain.
///
/// Owned by the kernel's collaborators; the Kernel holds a non-owning
/// reference. Constructed with a shared [`MetricRegistry`]
/// reference at commit time rather than owning one, since the registry's
/// lifetime spans multiple kernel components.
#[derive(Debug)]
pub struct StateModel {
    chain: Vec<StateSnapshot>,
}

impl StateModel {
    /// Creates a state model seeded with a genesis snapshot (version 0, no
    /// metrics, zero `previousHash`).
    #[must_use]
    pub fn new(genesis_timestamp: LogicalTimestamp) -> Self {
        let genesis = StateSnapshot {
            version: 0,
            action_id: None,
            timestamp: genesis_timestamp,
            metrics: BTreeMap::new(),
            hash: ZERO_DIGEST,
            previous_hash: ZERO_DIGEST,
        };
        Self { chain: vec![genesis] }
    }

    /// Returns the current value of `metric_id`, if it has ever been set.
    #[must_use]
    pub fn get(&self, metric_id: &MetricId) -> Option<&MetricValue> {
        self.tip().metrics.get(metric_id).map(|record| &record.value)
    }

    /// Returns the current snapshot chain tip.
    #[must_use]
    pub fn tip(&self) -> &StateSnapshot {
        #[allow(clippy::unwrap_used, reason = "chain always holds at least the genesis snapshot")]
        self.chain.last().unwrap()
    }

    /// Returns the full snapshot chain, genesis first.
    #[must_use]
    pub fn snapshot_chain(&self) -> &[StateSnapshot] {
        &self.chain
    }

    /// Returns the recorded value-change history for `metric_id`, oldest
    /// first.
    #[must_use]
    pub fn get_history(&self, metric_id: &MetricId) -> Vec<HistoryEntry> {
        self.chain
            .iter()
            .filter_map(|snapshot| {
                snapshot.metrics.get(metric_id).map(|record| HistoryEntry {
                    value: record.value.clone(),
                    timestamp: record.updated_at,
                    updated_by: record.updated_by.clone(),
                    evidence_id: record.evidence_id,
                })
            })
            .collect()
    }

    /// Validates a single mutation against `registry` and the current
    /// running total (for `COUNTER` metrics).
    ///
    /// # Errors
    ///
    /// Returns one of [`StateError::UnregisteredMetric`],
    /// [`StateError::ValidatorRejected`], [`StateError::NonFinite`], or
    /// [`StateError::CounterNegative`].
    pub fn validate_mutation(
        &self,
        registry: &MetricRegistry,
        mutation: &Mutation,
    ) -> Result<(), StateError> {
        let definition = registry
            .get(&mutation.metric_id)
            .ok_or_else(|| StateError::UnregisteredMetric(mutation.metric_id.clone()))?;
        if !definition.accepts(&mutation.value) {
            return Err(StateError::ValidatorRejected(mutation.metric_id.clone()));
        }
        if let Some(number) = mutation.value.as_number() {
            if number.as_f64().map_or(true, |v| !v.is_finite()) {
                return Err(StateError::NonFinite(mutation.metric_id.clone()));
            }
            if definition.metric_type == MetricType::Counter {
                let delta = decimal_from_number(number);
                let current = self.current_decimal(&mutation.metric_id);
                if current + delta < BigDecimal::from(0) {
                    return Err(StateError::CounterNegative(mutation.metric_id.clone()));
                }
            }
        }
        Ok(())
    }

    fn current_decimal(&self, metric_id: &MetricId) -> BigDecimal {
        self.tip()
            .metrics
            .get(metric_id)
            .and_then(|record| record.value.as_number())
            .map(decimal_from_number)
            .unwrap_or_else(|| BigDecimal::from(0))
    }

    /// Applies `mutations` atomically, advancing the snapshot chain by
    /// exactly one version. `COUNTER` values are applied as increments to
    /// the running total; `GAUGE`/`BOOLEAN` values are applied as absolute
    /// sets.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure; in that case no mutation in
    /// the batch is applied (atomicity).
    ///
    /// # Panics
    ///
    /// Does not panic under normal operation; callers must only pass
    /// mutations already accepted by [`StateModel::validate_mutation`] — the
    /// second validation pass here is defense against a caller skipping it.
    pub fn apply_trusted(
        &mut self,
        registry: &MetricRegistry,
        mutations: &[Mutation],
        timestamp: LogicalTimestamp,
        actor: &EntityId,
        action_id: Option<crate::ontology::ActionId>,
        evidence_id: EvidenceId,
    ) -> Result<&StateSnapshot, StateError> {
        for mutation in mutations {
            self.validate_mutation(registry, mutation)?;
        }

        let mut metrics = self.tip().metrics.clone();
        for mutation in mutations {
            #[allow(clippy::unwrap_used, reason = "validated above; definition is guaranteed present")]
            let definition = registry.get(&mutation.metric_id).unwrap();
            let new_value = match definition.metric_type {
                MetricType::Counter => {
                    let delta = decimal_from_number(
                        #[allow(clippy::unwrap_used, reason = "validated as numeric above")]
                        mutation.value.as_number().unwrap(),
                    );
                    let current = metrics
                        .get(&mutation.metric_id)
                        .and_then(|record| record.value.as_number())
                        .map(decimal_from_number)
                        .unwrap_or_else(|| BigDecimal::from(0));
                    number_to_metric_value(current + delta)
                }
                MetricType::Gauge | MetricType::Boolean => mutation.value.clone(),
            };
            metrics.insert(
                mutation.metric_id.clone(),
                MetricRecord {
                    value: new_value,
                    updated_at: timestamp,
                    updated_by: actor.clone(),
                    evidence_id,
                },
            );
        }

        let version = self.tip().version + 1;
        let previous_hash = self.tip().hash;
        let content = SnapshotContent {
            version,
            action_id: &action_id,
            timestamp,
            metrics: &metrics,
            previous_hash,
        };
        let bytes = canonical_json_bytes(&content)?;
        let hash = hash_bytes(&bytes);

        self.chain.push(StateSnapshot {
            version,
            action_id,
            timestamp,
            metrics,
            hash,
            previous_hash,
        });
        Ok(self.tip())
    }
}

fn decimal_from_number(number: &Number) -> BigDecimal {
    BigDecimal::from_str(&number.to_string()).unwrap_or_else(|_| BigDecimal::from(0))
}

fn number_to_metric_value(decimal: BigDecimal) -> MetricValue {
    let text = decimal.to_string();
    Number::from_str(&text)
        .map(MetricValue::Number)
        .unwrap_or_else(|_| MetricValue::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::registry::MetricDefinition;
    use crate::ontology::ActionId;

    fn registry_with_counter() -> MetricRegistry {
        let mut registry = MetricRegistry::new();
        registry
            .register(MetricDefinition {
                id: MetricId::new("wealth"),
                metric_type: MetricType::Counter,
                unit: "credits".to_string(),
            })
            .unwrap();
        registry
    }

    #[test]
    fn genesis_has_zero_previous_hash() {
        let state = StateModel::new(LogicalTimestamp::ZERO);
        assert_eq!(state.tip().previous_hash, ZERO_DIGEST);
        assert_eq!(state.tip().version, 0);
    }

    #[test]
    fn counter_mutation_is_additive() {
        let registry = registry_with_counter();
        let mut state = StateModel::new(LogicalTimestamp::ZERO);
        state
            .apply_trusted(
                &registry,
                &[Mutation::new(MetricId::new("wealth"), MetricValue::from_i64(10))],
                LogicalTimestamp::new(1, 0),
                &EntityId::new("alice"),
                Some(ActionId::new("a1")),
                EvidenceId::zero(),
            )
            .unwrap();
        state
            .apply_trusted(
                &registry,
                &[Mutation::new(MetricId::new("wealth"), MetricValue::from_i64(5))],
                LogicalTimestamp::new(2, 0),
                &EntityId::new("alice"),
                Some(ActionId::new("a2")),
                EvidenceId::zero(),
            )
            .unwrap();
        let value = state.get(&MetricId::new("wealth")).unwrap();
        assert_eq!(value.as_number().unwrap().as_i64(), Some(15));
    }

    #[test]
    fn counter_cannot_go_negative() {
        let registry = registry_with_counter();
        let mut state = StateModel::new(LogicalTimestamp::ZERO);
        let mutation = Mutation::new(MetricId::new("wealth"), MetricValue::from_i64(-1));
        assert_eq!(
            state.validate_mutation(&registry, &mutation),
            Err(StateError::CounterNegative(MetricId::new("wealth")))
        );
    }

    #[test]
    fn unregistered_metric_is_rejected() {
        let registry = MetricRegistry::new();
        let state = StateModel::new(LogicalTimestamp::ZERO);
        let mutation = Mutation::new(MetricId::new("ghost"), MetricValue::from_i64(1));
        assert_eq!(
            state.validate_mutation(&registry, &mutation),
            Err(StateError::UnregisteredMetric(MetricId::new("ghost")))
        );
    }

    #[test]
    fn snapshot_chain_grows_by_one_per_commit() {
        let registry = registry_with_counter();
        let mut state = StateModel::new(LogicalTimestamp::ZERO);
        state
            .apply_trusted(
                &registry,
                &[Mutation::new(MetricId::new("wealth"), MetricValue::from_i64(1))],
                LogicalTimestamp::new(1, 0),
                &EntityId::new("alice"),
                Some(ActionId::new("a1")),
                EvidenceId::zero(),
            )
            .unwrap();
        assert_eq!(state.snapshot_chain().len(), 2);
        assert_eq!(state.snapshot_chain()[1].previous_hash, state.snapshot_chain()[0].hash);
    }

    #[test]
    fn atomicity_rejects_whole_batch_on_single_failure() {
        let registry = registry_with_counter();
        let mut state = StateModel::new(LogicalTimestamp::ZERO);
        let mutations = vec![
            Mutation::new(MetricId::new("wealth"), MetricValue::from_i64(10)),
            Mutation::new(MetricId::new("wealth"), MetricValue::from_i64(-100)),
        ];
        let result = state.apply_trusted(
            &registry,
            &mutations,
            LogicalTimestamp::new(1, 0),
            &EntityId::new("alice"),
            Some(ActionId::new("a1")),
            EvidenceId::zero(),
        );
        assert!(result.is_err());
        assert_eq!(state.snapshot_chain().len(), 1);
    }
}
