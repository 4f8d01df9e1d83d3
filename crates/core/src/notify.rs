//! Mutation notifications from the LMS domain.
//!
//! Whatever performs writes against the LMS (or relays its change feed) calls
//! [`MutationNotifier::publish`]. Subscribers are registered per entity kind
//! while the notifier is being built; afterwards it is shared read-only, so
//! publishing takes no locks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// LMS entities whose changes affect the aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Course,
    Enrollment,
    User,
    Profile,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] =
        [EntityKind::Course, EntityKind::Enrollment, EntityKind::User, EntityKind::Profile];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Course => "course",
            EntityKind::Enrollment => "enrollment",
            EntityKind::User => "user",
            EntityKind::Profile => "profile",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Created,
    Updated,
    Deleted,
}

/// One change in the LMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MutationEvent {
    pub entity: EntityKind,
    pub action: MutationAction,
    /// Tenant the change belongs to, when the publisher knows it.
    #[serde(default)]
    pub tenant: Option<String>,
}

impl MutationEvent {
    pub fn new(entity: EntityKind, action: MutationAction) -> Self {
        Self { entity, action, tenant: None }
    }

    pub fn for_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }
}

/// Receives mutation events.
#[async_trait::async_trait]
pub trait MutationSubscriber: Send + Sync {
    async fn on_mutation(&self, event: &MutationEvent) -> Result<(), Error>;
}

/// Publish/subscribe hub for mutation events.
#[derive(Default)]
pub struct MutationNotifier {
    subscribers: HashMap<EntityKind, Vec<Arc<dyn MutationSubscriber>>>,
}

impl MutationNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for events about `kind`.
    pub fn subscribe(&mut self, kind: EntityKind, subscriber: Arc<dyn MutationSubscriber>) {
        self.subscribers.entry(kind).or_default().push(subscriber);
    }

    pub fn subscriber_count(&self, kind: EntityKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its kind, in registration order.
    ///
    /// All subscribers run even if one fails. Returns the number of
    /// deliveries, or the first failure.
    pub async fn publish(&self, event: &MutationEvent) -> Result<usize, Error> {
        let Some(subscribers) = self.subscribers.get(&event.entity) else {
            tracing::debug!(entity = %event.entity, "no subscribers for mutation");
            return Ok(0);
        };

        let mut first_error = None;
        for subscriber in subscribers {
            if let Err(e) = subscriber.on_mutation(event).await {
                tracing::error!(
                    entity = %event.entity,
                    action = ?event.action,
                    error = %e,
                    "mutation subscriber failed"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(subscribers.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        seen: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MutationSubscriber for Counter {
        async fn on_mutation(&self, _event: &MutationEvent) -> Result<(), Error> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl MutationSubscriber for Failing {
        async fn on_mutation(&self, _event: &MutationEvent) -> Result<(), Error> {
            Err(Error::CacheUnavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_only_matching_kind() {
        let counter = Arc::new(Counter::default());
        let mut notifier = MutationNotifier::new();
        notifier.subscribe(EntityKind::Enrollment, counter.clone());

        let delivered = notifier
            .publish(&MutationEvent::new(EntityKind::Enrollment, MutationAction::Created))
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        let delivered = notifier
            .publish(&MutationEvent::new(EntityKind::Course, MutationAction::Deleted))
            .await
            .unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(counter.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_subscriber_does_not_starve_others() {
        let counter = Arc::new(Counter::default());
        let mut notifier = MutationNotifier::new();
        notifier.subscribe(EntityKind::User, Arc::new(Failing));
        notifier.subscribe(EntityKind::User, counter.clone());

        let result = notifier.publish(&MutationEvent::new(EntityKind::User, MutationAction::Updated)).await;
        assert!(matches!(result, Err(Error::CacheUnavailable(_))));
        assert_eq!(counter.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_deserializes_lowercase() {
        let event: MutationEvent = serde_json::from_str(r#"{"entity":"profile","action":"deleted"}"#).unwrap();
        assert_eq!(event, MutationEvent::new(EntityKind::Profile, MutationAction::Deleted));
    }
}
