//! Alerts engine
//!
//! Ties evaluation and correlation together for a set of registered triggers.
//! Data points are routed to every condition that reads their id, evaluated,
//! and the results submitted to the correlator.
//!
//! # Related points
//!
//! - RATE conditions use the previously seen point of the same id
//! - COMPARE conditions pair the incoming point with the latest point of the
//!   other id
//!
//! Both are skipped until the related point is known.

use chrono::Duration;
use dashmap::DashMap;
use shared::models::{Condition, ConditionSpec, Data, TriggerMode};
use shared::{EngineConfig, Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::correlator::{Correlator, Verdict};
use crate::evaluator::Evaluator;
use crate::sweeper::spawn_sweeper;

type TriggerRef = (String, String);

/// Condition that could not be evaluated or correlated
#[derive(Debug)]
pub struct Rejection {
    pub condition_id: String,
    pub error: Error,
}

/// Result of feeding one data point to the engine
#[derive(Debug, Default)]
pub struct DataOutcome {
    pub verdicts: Vec<Verdict>,
    pub rejections: Vec<Rejection>,
}

/// Evaluation and correlation for registered triggers
pub struct AlertsEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    evaluator: Evaluator,
    correlator: Arc<Correlator>,
    /// Conditions per trigger
    triggers: DashMap<TriggerRef, Vec<Arc<Condition>>>,
    /// Conditions per data id they read, shared with `triggers`
    conditions: DashMap<String, Vec<Arc<Condition>>>,
    /// Latest point per routed data id
    last_data: DashMap<String, Data>,
}

impl AlertsEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: config.clone(),
            evaluator: Evaluator::with_clock(clock.clone()),
            correlator: Arc::new(Correlator::with_clock(config, clock.clone())),
            clock,
            triggers: DashMap::new(),
            conditions: DashMap::new(),
            last_data: DashMap::new(),
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    /// Register (or replace) a trigger's conditions
    ///
    /// Any in-flight correlation state of the trigger is invalidated, and
    /// evaluations of the replaced definitions are discarded from then on.
    ///
    /// # Errors
    ///
    /// - `UnboundCondition` if a condition has no identity
    /// - `Validation` if a condition belongs to another trigger, has invalid
    ///   parameters, or a mode's indices do not form `0..size`
    pub fn add_trigger(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        conditions: Vec<Condition>,
        window: Option<Duration>,
    ) -> Result<()> {
        validate_condition_sets(tenant_id, trigger_id, &conditions)?;

        if let Some(window) = window {
            if window <= Duration::zero() {
                return Err(Error::validation(format!(
                    "trigger '{}' has a non-positive correlation window",
                    trigger_id
                )));
            }
        }

        // Pin the new definitions before routing changes, so evaluations of
        // the old ones still in flight are discarded
        self.correlator.set_window(tenant_id, trigger_id, window);
        self.correlator.register(tenant_id, trigger_id, &conditions);

        let key = (tenant_id.to_string(), trigger_id.to_string());
        self.unregister(&key);

        let conditions: Vec<Arc<Condition>> = conditions.into_iter().map(Arc::new).collect();
        for condition in &conditions {
            let data_ids: BTreeSet<&str> = condition.data_ids().into_iter().collect();
            for data_id in data_ids {
                self.conditions
                    .entry(data_id.to_string())
                    .or_default()
                    .push(Arc::clone(condition));
            }
        }

        let count = conditions.len();
        self.triggers.insert(key, conditions);

        info!(
            tenant_id = tenant_id,
            trigger_id = trigger_id,
            conditions = count,
            "Trigger registered"
        );
        Ok(())
    }

    /// Unregister a trigger and forget its correlation state
    ///
    /// Returns whether the trigger was registered.
    pub fn remove_trigger(&self, tenant_id: &str, trigger_id: &str) -> bool {
        let key = (tenant_id.to_string(), trigger_id.to_string());
        let removed = self.unregister(&key);
        self.correlator.remove(tenant_id, trigger_id);

        if removed {
            info!(tenant_id = tenant_id, trigger_id = trigger_id, "Trigger removed");
        }
        removed
    }

    /// Registered conditions of a trigger
    pub fn trigger_conditions(&self, tenant_id: &str, trigger_id: &str) -> Option<Vec<Condition>> {
        self.triggers
            .get(&(tenant_id.to_string(), trigger_id.to_string()))
            .map(|conditions| conditions.iter().map(|c| Condition::clone(c)).collect())
    }

    /// Evaluate every condition reading `data.id` and correlate the results
    ///
    /// Failures are collected per condition and never stop the remaining
    /// conditions from being evaluated.
    pub fn send_data(&self, data: &Data) -> DataOutcome {
        let mut outcome = DataOutcome::default();

        let conditions = match self.conditions.get(&data.id) {
            Some(conditions) => conditions.clone(),
            None => {
                trace!(data_id = %data.id, "No condition reads this data id");
                return outcome;
            }
        };
        let previous = self.last_data.get(&data.id).map(|d| d.clone());

        for condition in conditions.iter().map(Arc::as_ref) {
            let result = match condition {
                Condition::Rate(_) => match previous.as_ref() {
                    Some(previous) if previous.timestamp < data.timestamp => {
                        self.evaluator.evaluate_with(condition, data, Some(previous))
                    }
                    _ => {
                        trace!(
                            condition_id = %condition.condition_id(),
                            "No earlier point for rate, skipping"
                        );
                        continue;
                    }
                },
                Condition::Compare(c) => {
                    let incoming_is_first = data.id == c.data_id;
                    let other_id = if incoming_is_first { &c.data2_id } else { &c.data_id };
                    let Some(other) = self.last_data.get(other_id).map(|d| d.clone()) else {
                        trace!(
                            condition_id = %condition.condition_id(),
                            other_data_id = %other_id,
                            "No point of the other series yet, skipping"
                        );
                        continue;
                    };

                    if incoming_is_first {
                        self.evaluator.evaluate_with(condition, data, Some(&other))
                    } else {
                        self.evaluator.evaluate_with(condition, &other, Some(data))
                    }
                }
                _ => self.evaluator.evaluate(condition, data),
            };

            match result.and_then(|eval| self.correlator.submit(eval)) {
                Ok(Some(verdict)) => outcome.verdicts.push(verdict),
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        condition_id = %condition.condition_id(),
                        data_id = %data.id,
                        error = %error,
                        "Condition rejected data point"
                    );
                    outcome.rejections.push(Rejection {
                        condition_id: condition.condition_id(),
                        error,
                    });
                }
            }
        }

        self.remember(data);
        outcome
    }

    /// Feed several data points in order
    pub fn send_all<'a>(&self, data: impl IntoIterator<Item = &'a Data>) -> DataOutcome {
        let mut outcome = DataOutcome::default();
        for point in data {
            let DataOutcome {
                verdicts,
                rejections,
            } = self.send_data(point);
            outcome.verdicts.extend(verdicts);
            outcome.rejections.extend(rejections);
        }
        outcome
    }

    /// Start the background expiry sweep at the configured interval
    pub fn start_sweeper(&self, cancel_token: CancellationToken) -> JoinHandle<()> {
        spawn_sweeper(
            Arc::clone(&self.correlator),
            Arc::clone(&self.clock),
            self.config.sweep_interval_std(),
            cancel_token,
        )
    }

    fn remember(&self, data: &Data) {
        self.last_data
            .entry(data.id.clone())
            .and_modify(|latest| {
                if data.timestamp > latest.timestamp {
                    *latest = data.clone();
                }
            })
            .or_insert_with(|| data.clone());
    }

    fn unregister(&self, key: &TriggerRef) -> bool {
        let Some((_, previous)) = self.triggers.remove(key) else {
            return false;
        };

        let data_ids: BTreeSet<String> = previous
            .iter()
            .flat_map(|c| c.data_ids().into_iter().map(str::to_string))
            .collect();

        for data_id in data_ids {
            let emptied = match self.conditions.get_mut(&data_id) {
                Some(mut conditions) => {
                    conditions.retain(|c| !(c.tenant_id() == key.0 && c.trigger_id() == key.1));
                    conditions.is_empty()
                }
                None => false,
            };
            if emptied {
                self.conditions.remove_if(&data_id, |_, conditions| conditions.is_empty());
                self.last_data.remove(&data_id);
            }
        }

        debug!(tenant_id = %key.0, trigger_id = %key.1, "Trigger conditions unregistered");
        true
    }
}

/// Check ownership and set positions of a trigger's conditions
fn validate_condition_sets(
    tenant_id: &str,
    trigger_id: &str,
    conditions: &[Condition],
) -> Result<()> {
    if conditions.is_empty() {
        return Err(Error::validation(format!(
            "trigger '{}' has no conditions",
            trigger_id
        )));
    }

    for condition in conditions {
        condition.identity().validate()?;
        if condition.tenant_id() != tenant_id || condition.trigger_id() != trigger_id {
            return Err(Error::validation(format!(
                "condition {} does not belong to trigger {}/{}",
                condition.condition_id(),
                tenant_id,
                trigger_id
            )));
        }
        condition.validate()?;
    }

    for mode in TriggerMode::ALL {
        let set: Vec<&Condition> = conditions
            .iter()
            .filter(|c| c.trigger_mode() == mode)
            .collect();
        if set.is_empty() {
            continue;
        }

        let size = set.len();
        let mut indices: Vec<usize> = Vec::with_capacity(size);
        for condition in &set {
            if condition.condition_set_size() != size {
                return Err(Error::validation(format!(
                    "condition {} declares set size {} but {} set of '{}' has {} conditions",
                    condition.condition_id(),
                    condition.condition_set_size(),
                    mode,
                    trigger_id,
                    size
                )));
            }
            indices.push(condition.condition_set_index());
        }

        indices.sort_unstable();
        if indices.iter().copied().ne(0..size) {
            return Err(Error::validation(format!(
                "{} set of trigger '{}' has indices {:?}, expected 0..{}",
                mode, trigger_id, indices, size
            )));
        }
    }

    Ok(())
}
