//! Priority → direction → event-type listener index.

use std::collections::BTreeMap;
use switchboard_core::{
    Direction, EventSelector, ListenDirection, ListenerHandler, ListenerSpec, Priority,
};

type TypeLevel = BTreeMap<EventSelector, Vec<IndexedListener>>;
type DirectionLevel = BTreeMap<ListenDirection, TypeLevel>;

/// One `(handler, inline)` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedListener {
    /// The callback.
    pub handler: ListenerHandler,
    /// Whether it runs inside the dispatch pipeline.
    pub inline: bool,
}

/// Merged listener bindings of every loaded module.
///
/// Empty branches are pruned on removal, so two indexes holding the same
/// bindings compare equal regardless of their load history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerIndex {
    levels: BTreeMap<Priority, DirectionLevel>,
}

impl ListenerIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. Returns `false` if the same `(handler, inline)` tuple
    /// is already present under the binding's key.
    pub fn insert(&mut self, spec: &ListenerSpec) -> bool {
        let entry = IndexedListener {
            handler: spec.handler.clone(),
            inline: spec.inline,
        };
        let slot = self
            .levels
            .entry(spec.priority)
            .or_default()
            .entry(spec.direction)
            .or_default()
            .entry(spec.event.clone())
            .or_default();
        if slot.contains(&entry) {
            return false;
        }
        slot.push(entry);
        true
    }

    /// Whether this exact binding is present.
    pub fn contains(&self, spec: &ListenerSpec) -> bool {
        self.levels
            .get(&spec.priority)
            .and_then(|directions| directions.get(&spec.direction))
            .and_then(|selectors| selectors.get(&spec.event))
            .is_some_and(|slot| {
                slot.iter()
                    .any(|entry| entry.handler == spec.handler && entry.inline == spec.inline)
            })
    }

    /// Remove a binding, pruning branches left empty. Returns `false` if the
    /// binding was not present.
    pub fn remove(&mut self, spec: &ListenerSpec) -> bool {
        let Some(directions) = self.levels.get_mut(&spec.priority) else {
            return false;
        };
        let Some(types) = directions.get_mut(&spec.direction) else {
            return false;
        };
        let Some(slot) = types.get_mut(&spec.event) else {
            return false;
        };
        let Some(position) = slot
            .iter()
            .position(|e| e.handler == spec.handler && e.inline == spec.inline)
        else {
            return false;
        };
        slot.remove(position);

        if slot.is_empty() {
            types.remove(&spec.event);
        }
        if types.is_empty() {
            directions.remove(&spec.direction);
        }
        if directions.is_empty() {
            self.levels.remove(&spec.priority);
        }
        true
    }

    /// Priorities with at least one binding, ascending.
    pub fn priorities(&self) -> impl Iterator<Item = Priority> + '_ {
        self.levels.keys().copied()
    }

    /// Bindings at `priority` matching an event: direction `both` then the
    /// event's own direction, and within each, type `all` then the verb.
    pub fn matching<'a>(
        &'a self,
        priority: Priority,
        direction: Direction,
        verb: &str,
    ) -> impl Iterator<Item = &'a IndexedListener> + 'a {
        let verb = EventSelector::Verb(verb.to_lowercase());
        let directions = self.levels.get(&priority);
        [ListenDirection::Both, ListenDirection::from(direction)]
            .into_iter()
            .filter_map(move |d| directions.and_then(|level| level.get(&d)))
            .flat_map(move |types| {
                [EventSelector::All, verb.clone()]
                    .into_iter()
                    .filter_map(move |selector| types.get(&selector))
                    .flatten()
            })
    }

    /// Total number of bindings.
    pub fn len(&self) -> usize {
        self.levels
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Whether the index has no bindings.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Every populated key with its entry count, in index order.
    pub fn shape(&self) -> Vec<(Priority, ListenDirection, EventSelector, usize)> {
        self.levels
            .iter()
            .flat_map(|(priority, directions)| {
                directions.iter().flat_map(move |(direction, types)| {
                    types
                        .iter()
                        .map(move |(event, slot)| (*priority, *direction, event.clone(), slot.len()))
                })
            })
            .collect()
    }
}
