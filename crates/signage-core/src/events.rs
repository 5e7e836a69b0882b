//! Domain events and their subscribers
//!
//! Cross-record updates (tag sort refresh, orphan position cleanup) are not
//! hidden in save hooks. A mutation dispatches a typed [`DomainEvent`] and the
//! [`EventBus`] runs its subscribers synchronously in registration order.

use crate::identity::{PositionId, SignId, TagId};
use crate::registry::Registry;
use crate::sort::tags_sort;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// A sign finished the save pipeline
    SignSaved { sign: SignId, created: bool },
    /// A sign was removed; `position` is where it stood
    SignDeleted { sign: SignId, position: PositionId },
    /// The tag set of a sign changed
    SignTagsChanged { sign: SignId },
    /// A tag's text changed
    TagRenamed { tag: TagId },
}

/// Reacts to domain events
pub trait Subscriber: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    fn handle(&self, registry: &mut Registry, event: &DomainEvent) -> Result<()>;
}

/// Ordered list of subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Box<dyn Subscriber>>,
}

impl EventBus {
    /// Create a bus without subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus with the tag sort and orphan position subscribers
    pub fn with_defaults() -> Self {
        let mut bus = Self::new();
        bus.subscribe(TagSortSubscriber);
        bus.subscribe(OrphanPositionCleanup);
        bus
    }

    pub fn subscribe(&mut self, subscriber: impl Subscriber + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Run every subscriber; the first error stops dispatch
    pub fn dispatch(&self, registry: &mut Registry, event: &DomainEvent) -> Result<()> {
        for subscriber in &self.subscribers {
            tracing::trace!(subscriber = subscriber.name(), ?event, "Dispatching event");
            subscriber.handle(registry, event)?;
        }
        Ok(())
    }
}

/// Keeps `sort.tags` in step with tag membership and tag text
pub struct TagSortSubscriber;

impl Subscriber for TagSortSubscriber {
    fn name(&self) -> &'static str {
        "tag_sort"
    }

    fn handle(&self, registry: &mut Registry, event: &DomainEvent) -> Result<()> {
        let affected: Vec<SignId> = match event {
            DomainEvent::SignTagsChanged { sign } => vec![*sign],
            DomainEvent::TagRenamed { tag } => registry.signs_with_tag(*tag).map(|s| s.id).collect(),
            _ => return Ok(()),
        };
        for id in affected {
            let sorted = tags_sort(registry, registry.require_sign(id)?);
            if let Some(sign) = registry.sign_mut(id) {
                sign.sort.tags = sorted;
            }
        }
        Ok(())
    }
}

/// Removes a position once its last sign is gone
pub struct OrphanPositionCleanup;

impl Subscriber for OrphanPositionCleanup {
    fn name(&self) -> &'static str {
        "orphan_position_cleanup"
    }

    fn handle(&self, registry: &mut Registry, event: &DomainEvent) -> Result<()> {
        let DomainEvent::SignDeleted { sign, position } = event else {
            return Ok(());
        };
        let occupied = registry.signs_at_position(*position).any(|s| s.id != *sign);
        if !occupied && registry.remove_position(*position).is_some() {
            tracing::debug!(position = %position, "Removed empty position");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::*;
    use crate::model::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn registry() -> (Registry, PositionId) {
        let mut registry = Registry::new();
        let project = ProjectId::new(registry.allocate());
        let zone = ZoneId::new(registry.allocate());
        registry.insert_zone(Zone::new(zone, project, "Lobby"));
        let position = PositionId::new(registry.allocate());
        registry
            .save_position(Position::new(position, zone, 0.0, 0.0))
            .unwrap();
        (registry, position)
    }

    struct Counter(Arc<AtomicUsize>);

    impl Subscriber for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn handle(&self, _registry: &mut Registry, _event: &DomainEvent) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_reaches_every_subscriber() {
        let (mut registry, _) = registry();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::with_defaults();
        bus.subscribe(Counter(hits.clone()));
        assert_eq!(bus.subscriber_count(), 3);

        let event = DomainEvent::SignSaved {
            sign: SignId::new(1),
            created: true,
        };
        bus.dispatch(&mut registry, &event).unwrap();
        bus.dispatch(&mut registry, &event).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_tag_rename_refreshes_sort() {
        let (mut registry, position) = registry();
        let tag = TagId::new(registry.allocate());
        registry.insert_tag(Tag {
            id: tag,
            tag: "old".into(),
        });
        let mut sign = registry.new_sign(position);
        sign.tags = vec![tag];
        let id = sign.id;
        registry.insert_sign(sign);

        let bus = EventBus::with_defaults();
        bus.dispatch(&mut registry, &DomainEvent::SignTagsChanged { sign: id })
            .unwrap();
        assert_eq!(registry.sign(id).unwrap().sort.tags, "old");

        registry.tag_mut(tag).unwrap().tag = "new".into();
        bus.dispatch(&mut registry, &DomainEvent::TagRenamed { tag })
            .unwrap();
        assert_eq!(registry.sign(id).unwrap().sort.tags, "new");
    }

    #[test]
    fn test_orphan_position_removed() {
        let (mut registry, position) = registry();
        let first = registry.new_sign(position);
        let second = registry.new_sign(position);
        let (a, b) = (first.id, second.id);
        registry.insert_sign(first);
        registry.insert_sign(second);
        let bus = EventBus::with_defaults();

        registry.remove_sign(a);
        bus.dispatch(&mut registry, &DomainEvent::SignDeleted { sign: a, position })
            .unwrap();
        assert!(registry.position(position).is_some());

        registry.remove_sign(b);
        bus.dispatch(&mut registry, &DomainEvent::SignDeleted { sign: b, position })
            .unwrap();
        assert!(registry.position(position).is_none());
    }
}
