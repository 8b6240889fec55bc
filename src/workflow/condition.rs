//! Status conditions and their transition rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One logical concern reported on the declared object's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Ready,
    CustomRolesReady,
    NetworkPeerReady,
    CloudProviderIntegrationReady,
    AlertConfigurationReady,
    IntegrationReady,
    ProjectTeamsReady,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Ready => "Ready",
            ConditionType::CustomRolesReady => "ProjectCustomRolesReady",
            ConditionType::NetworkPeerReady => "NetworkPeerReady",
            ConditionType::CloudProviderIntegrationReady => "CloudProviderIntegrationReady",
            ConditionType::AlertConfigurationReady => "AlertConfigurationReady",
            ConditionType::IntegrationReady => "IntegrationReady",
            ConditionType::ProjectTeamsReady => "ProjectTeamsReady",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    pub fn new(condition_type: ConditionType, status: ConditionStatus) -> Self {
        Self {
            condition_type,
            status,
            reason: None,
            message: None,
            last_transition_time: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = if message.is_empty() {
            None
        } else {
            Some(message)
        };
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Condition list ordered by first insertion.
///
/// Setting a condition replaces the entry of the same type in place. The
/// transition time only moves forward when the status actually changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn set(&mut self, condition: Condition) {
        self.set_at(condition, Utc::now());
    }

    /// Like [`set`](Self::set) with an explicit clock reading.
    pub fn set_at(&mut self, mut condition: Condition, now: DateTime<Utc>) {
        match self
            .0
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) => {
                condition.last_transition_time = if existing.status == condition.status {
                    existing.last_transition_time
                } else {
                    now
                };
                *existing = condition;
            }
            None => {
                condition.last_transition_time = now;
                self.0.push(condition);
            }
        }
    }

    pub fn unset(&mut self, condition_type: ConditionType) {
        self.0.retain(|c| c.condition_type != condition_type);
    }

    pub fn get(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.0.iter().find(|c| c.condition_type == condition_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge another list into this one, keeping transition-time rules.
    pub fn merge(&mut self, other: Conditions) {
        for condition in other.0 {
            let now = condition.last_transition_time;
            self.set_at(condition, now);
        }
    }
}

impl IntoIterator for Conditions {
    type Item = Condition;
    type IntoIter = std::vec::IntoIter<Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
