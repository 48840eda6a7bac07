//! Selector model for locating storefront elements.
//!
//! Selectors are predicates over elements rather than CSS strings: role and
//! accessible name, attribute equality, own text, and structural relations
//! (has a descendant, sits inside an ancestor). Drivers evaluate them however
//! suits the backend.
//!
//! The storefront's markup is volatile, so page objects address each logical
//! target through a [`SelectorPolicy`]: a ranked list of selectors tried in
//! order, where the first strategy producing a usable match wins.

use crate::result::{StoreError, StoreResult};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ARIA-ish role of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// `<button>` or `role="button"`
    Button,
    /// `<input type="checkbox">` or `role="checkbox"`
    Checkbox,
    /// `<img>` or `role="img"`
    Img,
}

impl Role {
    /// Role name as used in `role` attributes
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Checkbox => "checkbox",
            Self::Img => "img",
        }
    }
}

/// Text predicate, applied to whitespace-normalized text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TextMatch {
    /// Whole text equals
    Exact(String),
    /// Text contains
    Contains(String),
    /// Regular expression (Rust/JS compatible subset)
    Pattern {
        /// Regex source
        pattern: String,
        /// Case-insensitive match
        ignore_case: bool,
    },
}

impl TextMatch {
    /// Exact text
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Substring
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    /// Case-insensitive regular expression
    #[must_use]
    pub fn pattern_ci(pattern: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            ignore_case: true,
        }
    }

    /// Test a piece of text
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = normalize_text(text);
        match self {
            Self::Exact(expected) => text == normalize_text(expected),
            Self::Contains(needle) => text.contains(&normalize_text(needle)),
            Self::Pattern {
                pattern,
                ignore_case,
            } => match RegexBuilder::new(pattern)
                .case_insensitive(*ignore_case)
                .build()
            {
                Ok(re) => re.is_match(&text),
                Err(e) => {
                    tracing::warn!(%pattern, error = %e, "invalid text pattern never matches");
                    false
                }
            },
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(t) => write!(f, "{t:?}"),
            Self::Contains(t) => write!(f, "*{t:?}*"),
            Self::Pattern {
                pattern,
                ignore_case,
            } => write!(f, "/{pattern}/{}", if *ignore_case { "i" } else { "" }),
        }
    }
}

/// Trim and collapse runs of whitespace
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the first capture group of `pattern` from `text` as a count.
///
/// Fails with [`StoreError::Parse`] naming `what` and the raw text when the
/// pattern is absent.
pub fn capture_count(pattern: &str, what: &str, text: &str) -> StoreResult<u32> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| StoreError::Config {
            message: format!("invalid pattern for {what}: {e}"),
        })?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| StoreError::parse(what, text))
}

/// Element predicate
///
/// Serializes as `{"kind": ..., "arg": ...}` so backends outside the process
/// can evaluate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "arg", rename_all = "snake_case")]
pub enum Selector {
    /// Tag name (lowercase)
    Tag(String),
    /// Attribute equals value
    Attr {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Attribute present, any value
    AttrPresent(String),
    /// Role, optionally with accessible name (aria-label, else text content)
    Role {
        /// Role
        role: Role,
        /// Accessible name predicate
        name: Option<TextMatch>,
    },
    /// Element's own text (direct text children only)
    Text(TextMatch),
    /// All predicates hold on the same element
    All(Vec<Selector>),
    /// Element matching `base` with some descendant matching `descendant`
    Has {
        /// Predicate on the element itself
        base: Box<Selector>,
        /// Predicate some descendant must satisfy
        descendant: Box<Selector>,
    },
    /// Element matching `base` with a direct child matching `child`
    HasChild {
        /// Predicate on the element itself
        base: Box<Selector>,
        /// Predicate some child must satisfy
        child: Box<Selector>,
    },
    /// Element matching `inner` with some ancestor matching `ancestor`
    Within {
        /// Predicate some ancestor must satisfy
        ancestor: Box<Selector>,
        /// Predicate on the element itself
        inner: Box<Selector>,
    },
}

impl Selector {
    /// Tag selector
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into().to_ascii_lowercase())
    }

    /// Attribute equality selector
    #[must_use]
    pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attr {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Attribute presence selector
    #[must_use]
    pub fn attr_present(name: impl Into<String>) -> Self {
        Self::AttrPresent(name.into())
    }

    /// Role with accessible name
    #[must_use]
    pub const fn role(role: Role, name: TextMatch) -> Self {
        Self::Role {
            role,
            name: Some(name),
        }
    }

    /// Any element with the role
    #[must_use]
    pub const fn any_role(role: Role) -> Self {
        Self::Role { role, name: None }
    }

    /// Own-text selector
    #[must_use]
    pub const fn text(text: TextMatch) -> Self {
        Self::Text(text)
    }

    /// Combine with another predicate on the same element
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::All(mut parts) => {
                parts.push(other);
                Self::All(parts)
            }
            first => Self::All(vec![first, other]),
        }
    }

    /// Require a matching descendant
    #[must_use]
    pub fn has(self, descendant: Self) -> Self {
        Self::Has {
            base: Box::new(self),
            descendant: Box::new(descendant),
        }
    }

    /// Require a matching direct child
    #[must_use]
    pub fn has_child(self, child: Self) -> Self {
        Self::HasChild {
            base: Box::new(self),
            child: Box::new(child),
        }
    }

    /// Restrict to elements inside `ancestor`
    #[must_use]
    pub fn inside(self, ancestor: Self) -> Self {
        Self::Within {
            ancestor: Box::new(ancestor),
            inner: Box::new(self),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(t) => write!(f, "{t}"),
            Self::Attr { name, value } => write!(f, "[{name}={value:?}]"),
            Self::AttrPresent(name) => write!(f, "[{name}]"),
            Self::Role { role, name: None } => write!(f, "role={}", role.as_str()),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role={}[name={name}]", role.as_str()),
            Self::Text(m) => write!(f, "text={m}"),
            Self::All(parts) => {
                for part in parts {
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            Self::Has { base, descendant } => write!(f, "{base}:has({descendant})"),
            Self::HasChild { base, child } => write!(f, "{base}:has(> {child})"),
            Self::Within { ancestor, inner } => write!(f, "{ancestor} >> {inner}"),
        }
    }
}

/// Ranked locator strategies for one logical target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPolicy {
    target: String,
    strategies: Vec<Selector>,
}

impl SelectorPolicy {
    /// Create a policy with its first-choice strategy
    #[must_use]
    pub fn new(target: impl Into<String>, primary: Selector) -> Self {
        Self {
            target: target.into(),
            strategies: vec![primary],
        }
    }

    /// Append a lower-ranked fallback
    #[must_use]
    pub fn or(mut self, fallback: Selector) -> Self {
        self.strategies.push(fallback);
        self
    }

    /// Narrow every strategy to elements inside `ancestor`
    #[must_use]
    pub fn inside(&self, ancestor: &Self) -> Self {
        let strategies = self
            .strategies
            .iter()
            .flat_map(|inner| {
                ancestor
                    .strategies
                    .iter()
                    .map(move |outer| inner.clone().inside(outer.clone()))
            })
            .collect();
        Self {
            target: format!("{} in {}", self.target, ancestor.target),
            strategies,
        }
    }

    /// Logical target name, used in error messages
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Strategies in rank order
    #[must_use]
    pub fn strategies(&self) -> &[Selector] {
        &self.strategies
    }
}

impl fmt::Display for SelectorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_exact_normalizes_whitespace() {
            assert!(TextMatch::exact("Add to cart").matches("  Add   to\ncart "));
            assert!(!TextMatch::exact("Add to cart").matches("Add to cart now"));
        }

        #[test]
        fn test_contains() {
            assert!(TextMatch::contains("Product(s) found").matches("16 Product(s) found"));
        }

        #[test]
        fn test_pattern_case_insensitive() {
            let m = TextMatch::pattern_ci(r"^add to cart$");
            assert!(m.matches("Add to cart"));
            assert!(!m.matches("Added to cart"));
        }

        #[test]
        fn test_invalid_pattern_never_matches() {
            assert!(!TextMatch::pattern_ci("(").matches("("));
        }
    }

    mod capture_tests {
        use super::*;

        #[test]
        fn test_capture_count() {
            let n = capture_count(r"(\d+)\s*Product\(s\)\s*found", "found label", "7 Product(s) found")
                .unwrap();
            assert_eq!(n, 7);
            let q = capture_count(r"Quantity:\s*(\d+)", "quantity", "L | Wine Quantity: 12").unwrap();
            assert_eq!(q, 12);
        }

        #[test]
        fn test_capture_missing_is_parse_error() {
            let err = capture_count(r"Quantity:\s*(\d+)", "quantity of \"Grey T-shirt\"", "Qty ?")
                .unwrap_err();
            match err {
                StoreError::Parse { what, text } => {
                    assert!(what.contains("Grey T-shirt"));
                    assert_eq!(text, "Qty ?");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    mod selector_tests {
        use super::*;

        #[test]
        fn test_and_flattens() {
            let s = Selector::tag("input")
                .and(Selector::attr("type", "checkbox"))
                .and(Selector::attr("value", "XS"));
            match s {
                Selector::All(parts) => assert_eq!(parts.len(), 3),
                other => panic!("expected All, got {other:?}"),
            }
        }

        #[test]
        fn test_display() {
            let s = Selector::tag("div")
                .and(Selector::attr("tabindex", "1"))
                .has(Selector::role(Role::Button, TextMatch::exact("Add to cart")));
            assert_eq!(
                s.to_string(),
                "div[tabindex=\"1\"]:has(role=button[name=\"Add to cart\"])"
            );
        }

        #[test]
        fn test_wire_shape() {
            let s = Selector::role(Role::Button, TextMatch::pattern_ci("^add to cart$"))
                .inside(Selector::attr("tabindex", "1"));
            let json = serde_json::to_value(&s).unwrap();
            assert_eq!(json["kind"], "within");
            assert_eq!(json["arg"]["ancestor"]["kind"], "attr");
            assert_eq!(json["arg"]["inner"]["arg"]["role"], "button");
            assert_eq!(json["arg"]["inner"]["arg"]["name"]["mode"], "pattern");
            assert_eq!(json["arg"]["inner"]["arg"]["name"]["value"]["ignore_case"], true);
            let back: Selector = serde_json::from_value(json).unwrap();
            assert_eq!(back, s);
        }

        #[test]
        fn test_child_and_presence_wire_shape() {
            let s = Selector::tag("div")
                .has_child(Selector::attr_present("alt"))
                .has(Selector::text(TextMatch::contains("Quantity:")));
            assert_eq!(s.to_string(), "div:has(> [alt]):has(text=*\"Quantity:\"*)");
            let json = serde_json::to_value(&s).unwrap();
            assert_eq!(json["kind"], "has");
            assert_eq!(json["arg"]["base"]["kind"], "has_child");
            assert_eq!(json["arg"]["base"]["arg"]["child"]["kind"], "attr_present");
            assert_eq!(json["arg"]["base"]["arg"]["child"]["arg"], "alt");
        }

        #[test]
        fn test_tag_lowercased() {
            assert_eq!(Selector::tag("DIV"), Selector::Tag("div".into()));
        }
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn test_strategies_keep_rank_order() {
            let policy = SelectorPolicy::new("close button", Selector::attr("title", "close"))
                .or(Selector::role(Role::Button, TextMatch::exact("X")));
            assert_eq!(policy.strategies().len(), 2);
            assert_eq!(policy.strategies()[0], Selector::attr("title", "close"));
            assert_eq!(policy.target(), "close button");
        }

        #[test]
        fn test_inside_is_cartesian_in_rank_order() {
            let row = SelectorPolicy::new("row", Selector::tag("li")).or(Selector::tag("div"));
            let plus = SelectorPolicy::new("plus", Selector::attr("title", "+"));
            let scoped = plus.inside(&row);
            assert_eq!(scoped.strategies().len(), 2);
            assert_eq!(
                scoped.strategies()[0],
                Selector::attr("title", "+").inside(Selector::tag("li"))
            );
            assert_eq!(scoped.target(), "plus in row");
        }
    }
}
