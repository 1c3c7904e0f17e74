//! Condition set correlator
//!
//! Combines the evaluations of one trigger's condition set into a firing
//! decision. Each `(tenant, trigger, mode)` owns a slot array indexed by
//! condition set position; the trigger fires once every slot holds a matching
//! evaluation whose data lies within the correlation window.
//!
//! # Locking
//!
//! States live in a [`DashMap`] of `Arc<Mutex<_>>` handles. The map shard is
//! locked only long enough to clone a handle, so triggers never contend with
//! each other, while slot write, firing check and generation advance happen
//! under the trigger's own mutex.
//!
//! # Expiry
//!
//! The window is rolling: after every placement, slots whose data is older
//! than the newest occupied slot minus the window are cleared. [`Correlator::sweep`]
//! clears slots that aged out against the clock for triggers receiving no data.
//!
//! # Stale evidence
//!
//! Invalidation records the clock instant; evaluations stamped earlier are
//! discarded. Triggers registered through [`Correlator::register`] also pin
//! their definitions, and an evaluation of any other definition is discarded
//! regardless of its timestamp.

use chrono::Duration;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared::models::{Condition, ConditionSpec, TriggerMode};
use shared::{EngineConfig, Error, Result};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::condition_eval::ConditionEval;
use crate::dedup::{is_duplicate, FiredEvidence};

/// Correlation state key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerKey {
    pub tenant_id: String,
    pub trigger_id: String,
    pub trigger_mode: TriggerMode,
}

impl TriggerKey {
    pub fn new(
        tenant_id: impl Into<String>,
        trigger_id: impl Into<String>,
        trigger_mode: TriggerMode,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            trigger_id: trigger_id.into(),
            trigger_mode,
        }
    }

    pub fn of(eval: &ConditionEval) -> Self {
        Self::new(eval.tenant_id(), eval.trigger_id(), eval.trigger_mode())
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant_id, self.trigger_id, self.trigger_mode)
    }
}

/// Fired decision for a trigger's condition set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub id: Uuid,
    pub tenant_id: String,
    pub trigger_id: String,
    pub trigger_mode: TriggerMode,
    /// Generation that completed
    pub generation: u64,
    /// Engine time of the firing, epoch milliseconds
    pub fired_at: i64,
    /// One evaluation per condition set position, in index order
    pub evidence: Vec<ConditionEval>,
}

/// Point-in-time view of a trigger's correlation state
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationSnapshot {
    pub generation: u64,
    pub slots: Vec<Option<ConditionEval>>,
    pub invalidated_at: Option<i64>,
    pub last_fired_generation: Option<u64>,
}

#[derive(Debug)]
enum Outcome {
    Pending,
    Duplicate,
    Fired {
        generation: u64,
        evidence: Vec<ConditionEval>,
    },
}

#[derive(Debug, Default)]
struct ConditionSetState {
    generation: u64,
    slots: Vec<Option<ConditionEval>>,
    invalidated_at: Option<i64>,
    fired: FiredEvidence,
    /// Registered definitions by set index
    definitions: Option<Vec<Condition>>,
}

impl ConditionSetState {
    fn accept(&mut self, eval: ConditionEval, window: i64, dedup: bool) -> Result<Outcome> {
        if let Some(invalidated_at) = self.invalidated_at {
            if eval.eval_timestamp() < invalidated_at {
                return Err(Error::stale(
                    eval.trigger_id(),
                    format!(
                        "evaluated at {} before invalidation at {}",
                        eval.eval_timestamp(),
                        invalidated_at
                    ),
                ));
            }
        }

        if let Some(definitions) = &self.definitions {
            let index = eval.condition_set_index();
            let current = definitions
                .get(index)
                .is_some_and(|definition| eval.detail().evaluated(definition));
            if !current {
                return Err(Error::stale(
                    eval.trigger_id(),
                    format!("condition {} is not a registered definition", eval.condition_id()),
                ));
            }
        }

        let size = eval.condition_set_size();
        if self.slots.len() != size {
            if !self.slots.is_empty() {
                warn!(
                    trigger_id = %eval.trigger_id(),
                    previous_size = self.slots.len(),
                    size = size,
                    "Condition set size changed, resetting correlation state"
                );
                self.invalidate(eval.eval_timestamp());
            }
            self.slots = vec![None; size];
        }

        let index = eval.condition_set_index();
        if dedup {
            let same_as_slot = self.slots[index]
                .as_ref()
                .is_some_and(|current| is_duplicate(current, &eval));
            if same_as_slot || self.fired.contains(&eval) {
                return Ok(Outcome::Duplicate);
            }
        }

        if let Some(current) = &self.slots[index] {
            if eval.data_timestamp() < current.data_timestamp() {
                return Err(Error::stale(
                    eval.trigger_id(),
                    format!(
                        "data at {} is older than slot {} data at {}",
                        eval.data_timestamp(),
                        index,
                        current.data_timestamp()
                    ),
                ));
            }
        }

        self.slots[index] = Some(eval);
        self.expire_relative(window);

        let complete = self
            .slots
            .iter()
            .all(|slot| slot.as_ref().is_some_and(ConditionEval::is_match));
        if !complete {
            return Ok(Outcome::Pending);
        }

        let evidence: Vec<ConditionEval> = self.slots.iter_mut().filter_map(Option::take).collect();
        let generation = self.generation;
        self.fired.record(&evidence, generation);
        self.generation += 1;

        Ok(Outcome::Fired {
            generation,
            evidence,
        })
    }

    /// Clear slots older than the newest occupied slot minus `window`
    fn expire_relative(&mut self, window: i64) -> usize {
        let anchor = self
            .slots
            .iter()
            .flatten()
            .map(ConditionEval::data_timestamp)
            .max();

        match anchor {
            Some(anchor) => self.expire_before(anchor.saturating_sub(window)),
            None => 0,
        }
    }

    fn expire_before(&mut self, cutoff: i64) -> usize {
        let mut cleared = 0;
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|eval| eval.data_timestamp() < cutoff) {
                *slot = None;
                cleared += 1;
            }
        }
        cleared
    }

    fn invalidate(&mut self, at: i64) {
        self.generation += 1;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.fired.clear();
        self.invalidated_at = Some(at);
    }

    fn snapshot(&self) -> CorrelationSnapshot {
        CorrelationSnapshot {
            generation: self.generation,
            slots: self.slots.clone(),
            invalidated_at: self.invalidated_at,
            last_fired_generation: self.fired.generation(),
        }
    }
}

fn lock(handle: &Mutex<ConditionSetState>) -> MutexGuard<'_, ConditionSetState> {
    // State is plain data and every mutation leaves it consistent
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-trigger correlation of condition evaluations
pub struct Correlator {
    states: DashMap<TriggerKey, Arc<Mutex<ConditionSetState>>>,
    windows: DashMap<(String, String), Duration>,
    default_window: Duration,
    dedup_enabled: bool,
    clock: Arc<dyn Clock>,
}

impl Correlator {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            states: DashMap::new(),
            windows: DashMap::new(),
            default_window: config.correlation_window,
            dedup_enabled: config.dedup_enabled,
            clock,
        }
    }

    /// Set or clear (`None`) a trigger's own correlation window
    pub fn set_window(&self, tenant_id: &str, trigger_id: &str, window: Option<Duration>) {
        let key = (tenant_id.to_string(), trigger_id.to_string());
        match window {
            Some(window) => {
                self.windows.insert(key, window);
            }
            None => {
                self.windows.remove(&key);
            }
        }
    }

    /// Effective correlation window of a trigger
    pub fn window(&self, tenant_id: &str, trigger_id: &str) -> Duration {
        self.windows
            .get(&(tenant_id.to_string(), trigger_id.to_string()))
            .map(|w| *w)
            .unwrap_or(self.default_window)
    }

    /// Submit an evaluation
    ///
    /// Returns the verdict when the evaluation completes its condition set.
    /// Duplicates and stale evidence are discarded and yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `UnboundCondition` if the evaluation's condition has no
    /// identity or an index outside its set.
    pub fn submit(&self, eval: ConditionEval) -> Result<Option<Verdict>> {
        eval.condition_identity().validate()?;

        let key = TriggerKey::of(&eval);
        let window = self
            .window(&key.tenant_id, &key.trigger_id)
            .num_milliseconds();
        let handle = self.handle(&key);

        let outcome = {
            let mut state = lock(&handle);
            state.accept(eval, window, self.dedup_enabled)
        };

        match outcome {
            Ok(Outcome::Pending) => Ok(None),
            Ok(Outcome::Duplicate) => {
                debug!(trigger = %key, "Duplicate evidence discarded");
                #[cfg(feature = "metrics")]
                metrics::counter!("alert_engine.duplicates").increment(1);
                Ok(None)
            }
            Ok(Outcome::Fired {
                generation,
                evidence,
            }) => {
                let verdict = Verdict {
                    id: Uuid::new_v4(),
                    tenant_id: key.tenant_id,
                    trigger_id: key.trigger_id,
                    trigger_mode: key.trigger_mode,
                    generation,
                    fired_at: self.clock.now_millis(),
                    evidence,
                };

                info!(
                    tenant_id = %verdict.tenant_id,
                    trigger_id = %verdict.trigger_id,
                    trigger_mode = %verdict.trigger_mode,
                    generation = verdict.generation,
                    "Condition set satisfied"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "alert_engine.verdicts",
                    "mode" => verdict.trigger_mode.to_string()
                )
                .increment(1);

                Ok(Some(verdict))
            }
            Err(e @ Error::StaleEvidence { .. }) => {
                debug!(trigger = %key, error = %e, "Stale evidence discarded");
                #[cfg(feature = "metrics")]
                metrics::counter!("alert_engine.stale_evidence").increment(1);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Pin a trigger's condition definitions and invalidate its state
    ///
    /// Afterwards only evaluations of these definitions are accepted. A mode
    /// without conditions accepts nothing.
    pub fn register(&self, tenant_id: &str, trigger_id: &str, conditions: &[Condition]) {
        let now = self.clock.now_millis();
        for mode in TriggerMode::ALL {
            let mut definitions: Vec<Condition> = conditions
                .iter()
                .filter(|c| {
                    c.tenant_id() == tenant_id
                        && c.trigger_id() == trigger_id
                        && c.trigger_mode() == mode
                })
                .cloned()
                .collect();
            definitions.sort_by_key(|c| c.condition_set_index());

            let handle = self.handle(&TriggerKey::new(tenant_id, trigger_id, mode));
            let mut state = lock(&handle);
            state.invalidate(now);
            state.slots = vec![None; definitions.len()];
            state.definitions = Some(definitions);
        }
        info!(
            tenant_id = tenant_id,
            trigger_id = trigger_id,
            conditions = conditions.len(),
            invalidated_at = now,
            "Condition definitions registered"
        );
    }

    /// Discard in-flight correlation state of both trigger modes
    ///
    /// Evaluations produced before this call are treated as stale.
    pub fn invalidate(&self, tenant_id: &str, trigger_id: &str) {
        let now = self.clock.now_millis();
        for mode in TriggerMode::ALL {
            let handle = self.handle(&TriggerKey::new(tenant_id, trigger_id, mode));
            lock(&handle).invalidate(now);
        }
        info!(
            tenant_id = tenant_id,
            trigger_id = trigger_id,
            invalidated_at = now,
            "Correlation state invalidated"
        );
    }

    /// Forget a trigger entirely
    pub fn remove(&self, tenant_id: &str, trigger_id: &str) {
        for mode in TriggerMode::ALL {
            self.states
                .remove(&TriggerKey::new(tenant_id, trigger_id, mode));
        }
        self.windows
            .remove(&(tenant_id.to_string(), trigger_id.to_string()));
        debug!(
            tenant_id = tenant_id,
            trigger_id = trigger_id,
            "Correlation state removed"
        );
    }

    /// Clear slots whose data is older than `now` minus the trigger window
    ///
    /// Returns the number of cleared slots.
    pub fn sweep(&self, now: i64) -> usize {
        let handles: Vec<(TriggerKey, Arc<Mutex<ConditionSetState>>)> = self
            .states
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut cleared = 0;
        for (key, handle) in handles {
            let window = self
                .window(&key.tenant_id, &key.trigger_id)
                .num_milliseconds();
            cleared += lock(&handle).expire_before(now.saturating_sub(window));
        }

        if cleared > 0 {
            debug!(cleared = cleared, now = now, "Expired correlation slots swept");
        }
        cleared
    }

    /// Current state of a trigger, after lazy expiry
    pub fn snapshot(&self, key: &TriggerKey) -> Option<CorrelationSnapshot> {
        let handle = self.states.get(key).map(|entry| Arc::clone(entry.value()))?;
        let window = self
            .window(&key.tenant_id, &key.trigger_id)
            .num_milliseconds();

        let mut state = lock(&handle);
        state.expire_relative(window);
        Some(state.snapshot())
    }

    /// Number of tracked `(tenant, trigger, mode)` states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn handle(&self, key: &TriggerKey) -> Arc<Mutex<ConditionSetState>> {
        if let Some(entry) = self.states.get(key) {
            return Arc::clone(entry.value());
        }
        Arc::clone(self.states.entry(key.clone()).or_default().value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::evaluators::ThresholdConditionEval;
    use shared::models::{ConditionIdentity, Data, ThresholdCondition, ThresholdOperator};

    fn eval(size: usize, index: usize, value: f64, data_ts: i64, eval_ts: i64) -> ConditionEval {
        let c = ThresholdCondition::new(
            ConditionIdentity::firing("acme", "T", size, index),
            format!("m{}", index),
            ThresholdOperator::Gt,
            90.0,
        );
        let data = Data::numeric(format!("m{}", index), data_ts, value);
        ThresholdConditionEval::evaluate(&c, &data, eval_ts).unwrap()
    }

    fn correlator(window_secs: i64) -> (Correlator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let config = EngineConfig {
            correlation_window: Duration::seconds(window_secs),
            ..EngineConfig::default()
        };
        (Correlator::with_clock(&config, clock.clone()), clock)
    }

    fn key() -> TriggerKey {
        TriggerKey::new("acme", "T", TriggerMode::Firing)
    }

    #[test]
    fn test_size_one_fires_immediately() {
        let (correlator, _) = correlator(5);
        let verdict = correlator.submit(eval(1, 0, 95.0, 100, 1)).unwrap().unwrap();

        assert_eq!(verdict.trigger_id, "T");
        assert_eq!(verdict.generation, 0);
        assert_eq!(verdict.evidence.len(), 1);
    }

    #[test]
    fn test_non_match_does_not_fire() {
        let (correlator, _) = correlator(5);
        assert!(correlator.submit(eval(1, 0, 50.0, 100, 1)).unwrap().is_none());
    }

    #[test]
    fn test_latest_evaluation_replaces_slot() {
        let (correlator, _) = correlator(5);
        assert!(correlator.submit(eval(2, 0, 95.0, 1_000, 1)).unwrap().is_none());
        assert!(correlator.submit(eval(2, 0, 50.0, 1_500, 1)).unwrap().is_none());

        // Slot 0 now holds a non-match
        assert!(correlator.submit(eval(2, 1, 95.0, 2_000, 1)).unwrap().is_none());

        let verdict = correlator.submit(eval(2, 0, 96.0, 2_500, 1)).unwrap().unwrap();
        assert_eq!(verdict.evidence[0].data_timestamp(), 2_500);
        assert_eq!(verdict.evidence[1].data_timestamp(), 2_000);
    }

    #[test]
    fn test_firing_advances_generation() {
        let (correlator, _) = correlator(5);
        correlator.submit(eval(1, 0, 95.0, 100, 1)).unwrap().unwrap();

        let snapshot = correlator.snapshot(&key()).unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.last_fired_generation, Some(0));
        assert!(snapshot.slots.iter().all(Option::is_none));
    }

    #[test]
    fn test_replayed_evidence_does_not_refire() {
        let (correlator, _) = correlator(5);
        correlator.submit(eval(1, 0, 95.0, 100, 1)).unwrap().unwrap();

        assert!(correlator.submit(eval(1, 0, 95.0, 100, 2)).unwrap().is_none());
        // New data fires again
        assert!(correlator.submit(eval(1, 0, 95.0, 101, 3)).unwrap().is_some());
    }

    #[test]
    fn test_dedup_disabled_refires_on_replay() {
        let config = EngineConfig {
            dedup_enabled: false,
            ..EngineConfig::default()
        };
        let correlator = Correlator::with_clock(&config, Arc::new(ManualClock::new(0)));

        assert!(correlator.submit(eval(1, 0, 95.0, 100, 1)).unwrap().is_some());
        assert!(correlator.submit(eval(1, 0, 95.0, 100, 1)).unwrap().is_some());
    }

    #[test]
    fn test_out_of_order_data_is_discarded() {
        let (correlator, _) = correlator(5);
        correlator.submit(eval(2, 0, 50.0, 2_000, 1)).unwrap();
        correlator.submit(eval(2, 0, 95.0, 1_000, 1)).unwrap();

        let snapshot = correlator.snapshot(&key()).unwrap();
        let slot = snapshot.slots[0].as_ref().unwrap();
        assert_eq!(slot.data_timestamp(), 2_000);
        assert!(!slot.is_match());
    }

    #[test]
    fn test_invalidation_discards_earlier_evaluations() {
        let (correlator, clock) = correlator(5);
        correlator.submit(eval(2, 0, 95.0, 1_000, 1)).unwrap();

        clock.set(10);
        correlator.invalidate("acme", "T");

        // Produced before the invalidation
        assert!(correlator.submit(eval(2, 1, 95.0, 1_001, 5)).unwrap().is_none());
        let snapshot = correlator.snapshot(&key()).unwrap();
        assert_eq!(snapshot.invalidated_at, Some(10));
        assert!(snapshot.slots.iter().all(Option::is_none));

        assert!(correlator.submit(eval(2, 0, 95.0, 1_002, 10)).unwrap().is_none());
        assert!(correlator.submit(eval(2, 1, 95.0, 1_003, 11)).unwrap().is_some());
    }

    #[test]
    fn test_size_change_resets_state() {
        let (correlator, _) = correlator(5);
        correlator.submit(eval(2, 0, 95.0, 1_000, 1)).unwrap();

        let verdict = correlator.submit(eval(1, 0, 95.0, 1_001, 2)).unwrap().unwrap();
        assert_eq!(verdict.evidence.len(), 1);
        assert_eq!(verdict.generation, 1);

        // Size-2 evaluation produced before the edit is stale now
        assert!(correlator.submit(eval(2, 1, 95.0, 1_002, 1)).unwrap().is_none());
    }

    #[test]
    fn test_per_trigger_window_override() {
        let (correlator, _) = correlator(5);
        correlator.set_window("acme", "T", Some(Duration::seconds(60)));
        assert_eq!(correlator.window("acme", "T"), Duration::seconds(60));
        assert_eq!(correlator.window("acme", "other"), Duration::seconds(5));

        correlator.submit(eval(2, 0, 95.0, 0, 1)).unwrap();
        assert!(correlator.submit(eval(2, 1, 95.0, 30_000, 1)).unwrap().is_some());

        correlator.set_window("acme", "T", None);
        assert_eq!(correlator.window("acme", "T"), Duration::seconds(5));
    }

    #[test]
    fn test_sweep_clears_aged_slots() {
        let (correlator, _) = correlator(5);
        correlator.submit(eval(2, 0, 95.0, 1_000, 1)).unwrap();

        assert_eq!(correlator.sweep(5_500), 0);
        assert_eq!(correlator.sweep(6_001), 1);
        assert!(correlator.snapshot(&key()).unwrap().slots[0].is_none());
    }

    #[test]
    fn test_unbound_evaluation_is_rejected() {
        let (correlator, _) = correlator(5);
        let mut json = serde_json::to_value(eval(1, 0, 95.0, 100, 1)).unwrap();
        json["condition"]["tenantId"] = "".into();
        let unbound: ConditionEval = serde_json::from_value(json).unwrap();

        let err = correlator.submit(unbound).unwrap_err();
        assert!(matches!(err, Error::UnboundCondition(_)));
    }

    #[test]
    fn test_remove_forgets_trigger() {
        let (correlator, _) = correlator(5);
        correlator.submit(eval(2, 0, 95.0, 1_000, 1)).unwrap();
        assert!(!correlator.is_empty());

        correlator.remove("acme", "T");
        assert!(correlator.snapshot(&key()).is_none());
        assert_eq!(correlator.len(), 0);
    }

    #[test]
    fn test_registered_edit_discards_same_instant_evidence() {
        let (correlator, clock) = correlator(5);
        clock.set(1_005);
        let before_edit = eval(1, 0, 95.0, 1_000, 1_005);

        let edited = ThresholdCondition::new(
            ConditionIdentity::firing("acme", "T", 1, 0),
            "m0",
            ThresholdOperator::Gt,
            99.0,
        );
        correlator.register("acme", "T", &[edited.clone().into()]);

        // Same millisecond as the edit, but produced by the old definition
        assert!(correlator.submit(before_edit).unwrap().is_none());
        assert!(correlator.snapshot(&key()).unwrap().slots[0].is_none());

        let data = Data::numeric("m0", 1_001, 100.0);
        let current = ThresholdConditionEval::evaluate(&edited, &data, 1_005).unwrap();
        assert!(correlator.submit(current).unwrap().is_some());
    }

    #[test]
    fn test_registered_mode_without_conditions_accepts_nothing() {
        let (correlator, _) = correlator(5);
        correlator.register("acme", "T", &[]);

        assert!(correlator.submit(eval(1, 0, 95.0, 100, 1)).unwrap().is_none());
        assert!(correlator.snapshot(&key()).unwrap().slots.is_empty());
    }
}
