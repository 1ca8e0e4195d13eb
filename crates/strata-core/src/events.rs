//! Per-node event listener registry.
//!
//! Event strings follow the `type.namespace` convention and may list
//! several space-separated entries (`"click.menu tap"`). Listeners
//! registered under the reserved [`RESERVED_NAMESPACE`] belong to the
//! engine and survive every `off` that does not name that namespace.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Namespace for built-in cache invalidation listeners.
pub const RESERVED_NAMESPACE: &str = "strata";

/// One `type.namespace` entry of an event string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSpec<'a> {
    /// Empty when the entry was namespace-only, e.g. `.menu`.
    pub base: &'a str,
    pub namespace: Option<&'a str>,
}

/// Split an event string into its `type.namespace` entries.
pub fn parse_event_types(types: &str) -> impl Iterator<Item = EventSpec<'_>> {
    types.split_whitespace().map(|part| match part.split_once('.') {
        Some((base, ns)) => EventSpec {
            base,
            namespace: (!ns.is_empty()).then_some(ns),
        },
        None => EventSpec {
            base: part,
            namespace: None,
        },
    })
}

/// Payload delivered with a fired event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum EventData {
    #[default]
    None,
    /// `<attr>Change`: previous and new value of the attribute.
    AttrChange {
        old: crate::attrs::AttrValue,
        new: crate::attrs::AttrValue,
    },
    /// `add` / `remove` on a container: arena index of the child.
    Child { index: usize },
    Custom { value: serde_json::Value },
}

#[derive(Debug, Clone)]
pub struct Listener<H> {
    pub namespace: Option<String>,
    pub handler: H,
}

/// Event type → ordered listeners.
///
/// Generic over the handler so the scene crate can store closures that
/// receive the whole scene while this crate stays free of it.
#[derive(Debug, Clone)]
pub struct ListenerRegistry<H> {
    listeners: HashMap<String, SmallVec<[Listener<H>; 2]>>,
}

impl<H> Default for ListenerRegistry<H> {
    fn default() -> Self {
        Self {
            listeners: HashMap::new(),
        }
    }
}

impl<H: Clone> ListenerRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every type in `types`.
    /// Entries without a base type are ignored.
    pub fn on(&mut self, types: &str, handler: H) {
        for ty in parse_event_types(types) {
            if ty.base.is_empty() {
                continue;
            }
            self.listeners
                .entry(ty.base.to_string())
                .or_default()
                .push(Listener {
                    namespace: ty.namespace.map(str::to_string),
                    handler: handler.clone(),
                });
        }
    }

    /// Remove listeners matching `types`.
    ///
    /// `"click"` removes every non-reserved click listener, `"click.menu"`
    /// only those in `menu`, `".menu"` every `menu` listener of any type.
    /// An empty string removes all non-reserved listeners.
    pub fn off(&mut self, types: &str) {
        let mut parsed = parse_event_types(types).peekable();
        if parsed.peek().is_none() {
            for list in self.listeners.values_mut() {
                remove_matching(list, None);
            }
        }
        for ty in parsed {
            if ty.base.is_empty() {
                for list in self.listeners.values_mut() {
                    remove_matching(list, ty.namespace);
                }
            } else if let Some(list) = self.listeners.get_mut(ty.base) {
                remove_matching(list, ty.namespace);
            }
        }
        self.listeners.retain(|_, list| !list.is_empty());
    }

    /// Snapshot of the handlers for `event_type`, in registration order.
    ///
    /// Dispatch iterates the snapshot so handlers may add or remove
    /// listeners while the event is being delivered.
    pub fn handlers(&self, event_type: &str) -> SmallVec<[H; 4]> {
        self.listeners
            .get(event_type)
            .map(|list| list.iter().map(|l| l.handler.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has(&self, event_type: &str) -> bool {
        self.listeners.get(event_type).is_some_and(|l| !l.is_empty())
    }

    /// Number of listeners for `event_type`, reserved ones included.
    pub fn count(&self, event_type: &str) -> usize {
        self.listeners.get(event_type).map_or(0, |l| l.len())
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

fn remove_matching<H>(list: &mut SmallVec<[Listener<H>; 2]>, namespace: Option<&str>) {
    list.retain(|l| {
        let ns = l.namespace.as_deref();
        let protected = ns == Some(RESERVED_NAMESPACE) && namespace != Some(RESERVED_NAMESPACE);
        let matches = namespace.is_none() || ns == namespace;
        protected || !matches
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> ListenerRegistry<u32> {
        let mut reg = ListenerRegistry::new();
        reg.on("click", 1);
        reg.on("click.menu tap.menu", 2);
        reg.on("xChange.strata", 3);
        reg
    }

    #[test]
    fn parses_namespaced_types() {
        let specs: Vec<_> = parse_event_types("click.menu  tap .ns").collect();
        assert_eq!(
            specs,
            vec![
                EventSpec { base: "click", namespace: Some("menu") },
                EventSpec { base: "tap", namespace: None },
                EventSpec { base: "", namespace: Some("ns") },
            ]
        );
    }

    #[test]
    fn handlers_keep_registration_order() {
        let reg = registry();
        assert_eq!(reg.handlers("click").as_slice(), &[1, 2]);
        assert_eq!(reg.handlers("tap").as_slice(), &[2]);
        assert!(reg.handlers("dblclick").is_empty());
    }

    #[test]
    fn off_by_namespace_only() {
        let mut reg = registry();
        reg.off(".menu");
        assert_eq!(reg.handlers("click").as_slice(), &[1]);
        assert!(!reg.has("tap"));
    }

    #[test]
    fn off_type_and_namespace() {
        let mut reg = registry();
        reg.off("click.menu");
        assert_eq!(reg.handlers("click").as_slice(), &[1]);
        assert!(reg.has("tap"));
    }

    #[test]
    fn reserved_namespace_survives_plain_off() {
        let mut reg = registry();
        reg.off("xChange");
        reg.off("");
        assert_eq!(reg.count("xChange"), 1);
        assert!(!reg.has("click"));

        reg.off("xChange.strata");
        assert_eq!(reg.count("xChange"), 0);
    }

    #[test]
    fn event_data_serializes_tagged() {
        let data = EventData::Child { index: 3 };
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"kind":"child","index":3}"#);
    }
}
