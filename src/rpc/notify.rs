//! Event-to-notification mapper registry.
//!
//! Each mapper declares the event kinds it subscribes to and converts a
//! matching event into at most one outbound notification. Every eligible
//! mapper runs for every event; notifications are not lock-gated.

use super::proto::Notification;
use crate::events::{EventKind, StudioEvent};

pub trait NotificationMapper: Send + Sync {
    fn subscriptions(&self) -> &[EventKind];

    /// `None` means "not applicable", not an error.
    fn map(&self, event: &StudioEvent) -> Option<Notification>;
}

#[derive(Default)]
pub struct MapperRegistry {
    mappers: Vec<Box<dyn NotificationMapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mapper: Box<dyn NotificationMapper>) {
        self.mappers.push(mapper);
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Notifications produced by every mapper subscribed to `event`, in
    /// registration order.
    pub fn map_event<'a>(
        &'a self,
        event: &'a StudioEvent,
    ) -> impl Iterator<Item = Notification> + 'a {
        let kind = event.kind();
        self.mappers
            .iter()
            .filter(move |m| m.subscriptions().contains(&kind))
            .filter_map(move |m| m.map(event))
    }
}
