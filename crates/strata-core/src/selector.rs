//! Selector strings for `find` / `find_one`.
//!
//! Grammar: comma-separated alternatives, whitespace ignored. Each
//! alternative is `#id`, `.name` or a type name starting with an uppercase
//! letter (`Rect`, `Group`, `Shape`). Invalid alternatives are reported
//! through `settings::warn` and skipped.

use crate::settings;
use winnow::combinator::{alt, eof, preceded, terminated};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorPart {
    Id(String),
    Name(String),
    /// Matches the class name (`Rect`) or the node type (`Shape`).
    Type(String),
}

/// What a selector needs to know about a node.
pub trait Selectable {
    fn selector_id(&self) -> Option<&str>;
    fn has_name(&self, name: &str) -> bool;
    fn class_name(&self) -> &str;
    fn node_type(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub parts: Vec<SelectorPart>,
}

impl Selector {
    pub fn parse(input: &str) -> Self {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let mut parts = Vec::new();
        for raw in compact.split(',') {
            match selector_part.parse(raw) {
                Ok(part) => parts.push(part),
                Err(_) => settings::warn(format_args!(
                    "selector \"{raw}\" is invalid; allowed selectors look like \"#foo\", \".bar\" or \"Group\""
                )),
            }
        }
        Self { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn matches<T: Selectable + ?Sized>(&self, node: &T) -> bool {
        self.parts.iter().any(|part| match part {
            SelectorPart::Id(id) => node.selector_id() == Some(id.as_str()),
            SelectorPart::Name(name) => node.has_name(name),
            SelectorPart::Type(ty) => node.class_name() == ty || node.node_type() == ty,
        })
    }
}

fn selector_part(input: &mut &str) -> ModalResult<SelectorPart> {
    terminated(
        alt((
            preceded('#', rest1).map(|s: &str| SelectorPart::Id(s.to_string())),
            preceded('.', rest1).map(|s: &str| SelectorPart::Name(s.to_string())),
            type_name.map(|s: &str| SelectorPart::Type(s.to_string())),
        )),
        eof,
    )
    .parse_next(input)
}

fn rest1<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c != ',').parse_next(input)
}

fn type_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_uppercase()),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fake {
        id: Option<&'static str>,
        names: &'static str,
        class: &'static str,
        ty: &'static str,
    }

    impl Selectable for Fake {
        fn selector_id(&self) -> Option<&str> {
            self.id
        }
        fn has_name(&self, name: &str) -> bool {
            self.names.split_whitespace().any(|n| n == name)
        }
        fn class_name(&self) -> &str {
            self.class
        }
        fn node_type(&self) -> &str {
            self.ty
        }
    }

    const RECT: Fake = Fake {
        id: Some("hero"),
        names: "card selected",
        class: "Rect",
        ty: "Shape",
    };

    #[test]
    fn parses_alternatives() {
        let sel = Selector::parse("#hero, .card ,Group");
        assert_eq!(
            sel.parts,
            vec![
                SelectorPart::Id("hero".into()),
                SelectorPart::Name("card".into()),
                SelectorPart::Type("Group".into()),
            ]
        );
    }

    #[test]
    fn invalid_parts_are_skipped() {
        let sel = Selector::parse("rect, #, .ok");
        assert_eq!(sel.parts, vec![SelectorPart::Name("ok".into())]);
        assert!(Selector::parse("lowercase").is_empty());
    }

    #[test]
    fn matches_id_name_class_and_type() {
        assert!(Selector::parse("#hero").matches(&RECT));
        assert!(Selector::parse(".selected").matches(&RECT));
        assert!(Selector::parse("Rect").matches(&RECT));
        assert!(Selector::parse("Shape").matches(&RECT));
        assert!(!Selector::parse("Circle, #villain, .card2").matches(&RECT));
    }
}
