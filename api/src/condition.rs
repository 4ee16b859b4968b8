use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    pub fn is_true(self) -> bool {
        self == ConditionStatus::True
    }
}

/// A knative-style duck condition. Readiness of a resource is summarized
/// by the top-level condition, computed from its dependents.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

impl Condition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: None,
            message: None,
            last_transition_time: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_true(&self) -> bool {
        self.status.is_true()
    }

    fn same_state(&self, other: &Condition) -> bool {
        self.status == other.status && self.reason == other.reason && self.message == other.message
    }
}

pub const CONDITION_READY: &str = "Ready";

/// A fixed set of dependent condition types AND'd into a top-level
/// `Ready` condition.
pub struct ConditionSet {
    dependents: &'static [&'static str],
}

impl ConditionSet {
    pub const fn new(dependents: &'static [&'static str]) -> Self {
        Self { dependents }
    }

    pub fn manage<'a>(&'a self, conditions: &'a mut Vec<Condition>) -> ConditionManager<'a> {
        ConditionManager {
            set: self,
            conditions,
        }
    }
}

pub struct ConditionManager<'a> {
    set: &'a ConditionSet,
    conditions: &'a mut Vec<Condition>,
}

impl ConditionManager<'_> {
    pub fn get(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Sets any missing dependent (and the top-level condition) to
    /// Unknown. Conditions already present keep their state.
    pub fn initialize(&mut self) {
        for type_ in self.set.dependents.iter().chain([&CONDITION_READY]) {
            if self.get(type_).is_none() {
                self.store(Condition::new(*type_, ConditionStatus::Unknown));
            }
        }
    }

    pub fn mark_true(&mut self, type_: &str) {
        self.set_condition(Condition::new(type_, ConditionStatus::True));
    }

    pub fn mark_true_with_reason(
        &mut self,
        type_: &str,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set_condition(
            Condition::new(type_, ConditionStatus::True)
                .with_reason(reason)
                .with_message(message),
        );
    }

    pub fn mark_false(
        &mut self,
        type_: &str,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set_condition(
            Condition::new(type_, ConditionStatus::False)
                .with_reason(reason)
                .with_message(message),
        );
    }

    pub fn mark_unknown(
        &mut self,
        type_: &str,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set_condition(
            Condition::new(type_, ConditionStatus::Unknown)
                .with_reason(reason)
                .with_message(message),
        );
    }

    /// Marks the top-level condition directly, bypassing the dependent
    /// recomputation. Used for the unobserved-generation marker, which a
    /// completed reconcile pass overwrites.
    pub fn mark_ready_unknown(&mut self, reason: impl Into<String>, message: impl Into<String>) {
        self.store(
            Condition::new(CONDITION_READY, ConditionStatus::Unknown)
                .with_reason(reason)
                .with_message(message),
        );
    }

    /// Stores a dependent condition copied verbatim from another
    /// resource, recomputing the top-level condition.
    pub fn set(&mut self, condition: Condition) {
        self.set_condition(condition);
    }

    /// Stores a dependent condition and recomputes the top-level one:
    /// false if any dependent is false, unknown if any is unknown,
    /// otherwise true.
    fn set_condition(&mut self, condition: Condition) {
        self.store(condition);
        let ready = self.aggregate();
        self.store(ready);
    }

    fn aggregate(&self) -> Condition {
        for status in [ConditionStatus::False, ConditionStatus::Unknown] {
            if let Some(worst) = self
                .set
                .dependents
                .iter()
                .filter_map(|t| self.get(t))
                .find(|c| c.status == status)
            {
                let mut ready = Condition::new(CONDITION_READY, status);
                ready.reason = worst.reason.clone();
                ready.message = worst.message.clone();
                return ready;
            }
        }
        Condition::new(CONDITION_READY, ConditionStatus::True)
    }

    /// Transition times only move when (status, reason, message) change,
    /// so an unchanged status round-trips byte-identical and redundant
    /// writes can be elided upstream.
    fn store(&mut self, mut condition: Condition) {
        match self.conditions.iter_mut().find(|c| c.type_ == condition.type_) {
            Some(existing) if existing.same_state(&condition) => {}
            Some(existing) => {
                condition.last_transition_time = Some(Time(Utc::now()));
                *existing = condition;
            }
            None => {
                condition.last_transition_time = Some(Time(Utc::now()));
                self.conditions.push(condition);
                self.conditions.sort_by(|a, b| a.type_.cmp(&b.type_));
            }
        }
    }
}
