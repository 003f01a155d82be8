use chrono::{DateTime, Utc};
use pkg_constants::state::EVENTS_PREFIX;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::meta::{ObjectMeta, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
}

/// Human readable notification about an object, like a Kubernetes Event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEvent {
    pub metadata: ObjectMeta,
    pub involved_kind: String,
    pub involved_name: String,
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ClusterEvent {
    pub fn normal(involved: &ObjectMeta, kind: &str, reason: &str, message: String) -> Self {
        let name = format!("{}.{}", involved.name, &Uuid::new_v4().simple().to_string()[..8]);
        Self {
            metadata: ObjectMeta::new(&involved.namespace, &name),
            involved_kind: kind.to_string(),
            involved_name: involved.name.clone(),
            event_type: EventType::Normal,
            reason: reason.to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

impl Resource for ClusterEvent {
    const KIND: &'static str = "Event";
    const PREFIX: &'static str = EVENTS_PREFIX;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
