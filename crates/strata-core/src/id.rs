//! Node ids.
//!
//! The `id` attribute is stored as an [`Ident`]: an index into one
//! process-wide interner, so every node carrying `id: "knob"` holds the same
//! four-byte value. Interned strings are never freed; ids are expected to be
//! a bounded set of author-chosen names, not per-frame generated data.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

static IDS: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Interned value of a node's `id` attribute.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident(Spur);

impl Ident {
    pub fn intern(s: &str) -> Self {
        Ident(IDS.get_or_intern(s))
    }

    /// The ident for `s` if some node ever used it, without interning.
    pub fn get(s: &str) -> Option<Self> {
        IDS.get(s).map(Ident)
    }

    pub fn as_str(&self) -> &str {
        IDS.resolve(&self.0)
    }

    /// Whether a `#id` selector can name this id. Selectors drop
    /// whitespace and split on commas, so ids containing either, or the
    /// empty id, are unreachable through `find`.
    pub fn is_selectable(&self) -> bool {
        let s = self.as_str();
        !s.is_empty() && !s.chars().any(|c| c == ',' || c.is_whitespace())
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Ident {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Ident {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Ident::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nodes_sharing_an_id_share_the_ident() {
        let knob = Ident::intern("volume-knob");
        assert_eq!(Ident::intern("volume-knob"), knob);
        assert_ne!(Ident::intern("balance-knob"), knob);
        assert_eq!(format!("{knob:?}"), "#volume-knob");
        assert_eq!(knob.to_string(), "volume-knob");
    }

    #[test]
    fn lookups_for_unused_ids_do_not_grow_the_table() {
        assert_eq!(Ident::get("sprite-that-was-never-placed"), None);
        assert_eq!(Ident::get("sprite-that-was-never-placed"), None);
        let placed = Ident::intern("sprite-placed-once");
        assert_eq!(Ident::get("sprite-placed-once"), Some(placed));
    }

    #[test]
    fn ids_with_separators_cannot_be_selected() {
        assert!(Ident::intern("hero_2").is_selectable());
        assert!(!Ident::intern("hero 2").is_selectable());
        assert!(!Ident::intern("a,b").is_selectable());
        assert!(!Ident::intern("").is_selectable());
    }

    #[test]
    fn serde_uses_the_plain_string() {
        let id = Ident::intern("board");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""board""#);
        let back: Ident = serde_json::from_str(r#""board""#).unwrap();
        assert_eq!(back, id);
    }
}
