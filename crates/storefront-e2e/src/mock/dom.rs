//! Minimal DOM arena with selector evaluation.

use crate::locator::{normalize_text, Role, Selector};
use crate::sizes::Size;
use std::collections::BTreeMap;

/// What a click on a node does to the storefront
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClickAction {
    ToggleSize(Size),
    AddToCart(String),
    Increment(String),
    Decrement(String),
    Remove(String),
    OpenCart,
    CloseCart,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    /// Own text, excluding descendants
    pub text: String,
    pub checked: Option<bool>,
    pub on_click: Option<ClickAction>,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            text: String::new(),
            checked: None,
            on_click: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn on_click(mut self, action: ClickAction) -> Self {
        self.on_click = Some(action);
        self
    }

    fn role(&self) -> Option<Role> {
        match self.attrs.get("role").map(String::as_str) {
            Some("button") => return Some(Role::Button),
            Some("checkbox") => return Some(Role::Checkbox),
            Some("img") => return Some(Role::Img),
            _ => {}
        }
        match self.tag.as_str() {
            "button" => Some(Role::Button),
            "img" => Some(Role::Img),
            "input" if self.attrs.get("type").map(String::as_str) == Some("checkbox") => {
                Some(Role::Checkbox)
            }
            _ => None,
        }
    }
}

/// Nodes in document order; index 0 is the root
#[derive(Debug, Clone, Default)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node; parents must be pushed before their children
    pub fn push(&mut self, parent: Option<usize>, mut node: Node) -> usize {
        let idx = self.nodes.len();
        node.parent = parent;
        if let Some(p) = parent {
            self.nodes[p].children.push(idx);
        }
        self.nodes.push(node);
        idx
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    /// Own text plus descendants, whitespace-normalized
    pub fn text_content(&self, idx: usize) -> String {
        let mut parts = Vec::new();
        self.collect_text(idx, &mut parts);
        normalize_text(&parts.join(" "))
    }

    fn collect_text<'a>(&'a self, idx: usize, out: &mut Vec<&'a str>) {
        let node = &self.nodes[idx];
        if !node.text.is_empty() {
            out.push(&node.text);
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// Click handler for a node, bubbling up through its ancestors
    pub fn action_for(&self, idx: usize) -> Option<&ClickAction> {
        let mut cursor = Some(idx);
        while let Some(i) = cursor {
            let node = self.nodes.get(i)?;
            if let Some(action) = &node.on_click {
                return Some(action);
            }
            cursor = node.parent;
        }
        None
    }

    fn accessible_name(&self, idx: usize) -> String {
        self.nodes[idx]
            .attrs
            .get("aria-label")
            .cloned()
            .unwrap_or_else(|| self.text_content(idx))
    }

    fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[idx].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    pub fn matches(&self, idx: usize, selector: &Selector) -> bool {
        let node = &self.nodes[idx];
        match selector {
            Selector::Tag(tag) => node.tag == *tag,
            Selector::Attr { name, value } => node.attrs.get(name) == Some(value),
            Selector::AttrPresent(name) => node.attrs.contains_key(name),
            Selector::Role { role, name } => {
                node.role() == Some(*role)
                    && name
                        .as_ref()
                        .map_or(true, |m| m.matches(&self.accessible_name(idx)))
            }
            Selector::Text(m) => !node.text.is_empty() && m.matches(&node.text),
            Selector::All(parts) => parts.iter().all(|p| self.matches(idx, p)),
            Selector::Has { base, descendant } => {
                self.matches(idx, base)
                    && self
                        .descendants(idx)
                        .into_iter()
                        .any(|d| self.matches(d, descendant))
            }
            Selector::HasChild { base, child } => {
                self.matches(idx, base)
                    && node.children.iter().any(|&c| self.matches(c, child))
            }
            Selector::Within { ancestor, inner } => {
                if !self.matches(idx, inner) {
                    return false;
                }
                let mut cursor = node.parent;
                while let Some(p) = cursor {
                    if self.matches(p, ancestor) {
                        return true;
                    }
                    cursor = self.nodes[p].parent;
                }
                false
            }
        }
    }

    /// Matching node indices in document order
    pub fn query(&self, selector: &Selector) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&idx| self.matches(idx, selector))
            .collect()
    }
}
