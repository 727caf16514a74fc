//! Entity drafts and finished entities
//!
//! A draft accumulates components while a stage owns it. Components can be
//! added or overwritten but never removed; `finish` seals the draft into an
//! immutable [`FinishedEntity`] for the output sink.

pub mod components;
pub mod templates;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::types::{DVec3, EntityId};

pub use components::{Component, ComponentKind};
pub use templates::EntityTemplates;

#[derive(Debug, Clone, Default)]
pub struct EntityDraft {
    id: EntityId,
    components: BTreeMap<ComponentKind, Component>,
}

impl EntityDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Attach a component, replacing any earlier one of the same kind
    pub fn add(&mut self, component: Component) {
        self.components.insert(component.kind(), component);
    }

    pub fn get(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.get(&kind)
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn position(&self) -> Option<DVec3> {
        match self.get(ComponentKind::Position) {
            Some(Component::Position(position)) => Some(*position),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn finish(self) -> FinishedEntity {
        FinishedEntity {
            id: self.id,
            components: self.components,
        }
    }
}

/// Sealed entity handed to the host; read-only
#[derive(Debug, Clone, Serialize)]
pub struct FinishedEntity {
    id: EntityId,
    components: BTreeMap<ComponentKind, Component>,
}

impl FinishedEntity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn get(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.get(&kind)
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn position(&self) -> Option<DVec3> {
        match self.get(ComponentKind::Position) {
            Some(Component::Position(position)) => Some(*position),
            _ => None,
        }
    }

    /// Metadata entity type, e.g. "StarterShip" or an asteroid variant
    pub fn entity_type(&self) -> Option<&str> {
        match self.get(ComponentKind::Metadata) {
            Some(Component::Metadata { entity_type }) => Some(entity_type),
            _ => None,
        }
    }
}
