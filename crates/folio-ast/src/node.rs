//! The renderable body tree.

use crate::expr::Expr;
use crate::{Duration, Pos, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `body { ... }` block: the tree of renderable nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyDecl {
    pub nodes: Vec<DocumentNode>,
}

/// One node in the body tree: `<kind> <id> { props and children }`.
///
/// Node kinds are open strings (`page`, `text`, `slot`, `inline_slot`,
/// `grid`, ...); the core never exhaustively matches on them, renderers do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    pub kind: String,
    /// Property map in declaration order.
    pub props: IndexMap<String, PropValue>,
    pub children: Vec<DocumentNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshPolicy>,
    /// Slot layout hints; only meaningful on `slot` / `inline_slot` kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<SlotConfig>,
    #[serde(skip, default)]
    pub pos: Pos,
}

impl DocumentNode {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            props: IndexMap::new(),
            children: Vec::new(),
            refresh: None,
            slot: None,
            pos: Pos::default(),
        }
    }

    /// The node's `label` property, if it is a literal string.
    pub fn label(&self) -> Option<&str> {
        match self.props.get("label") {
            Some(PropValue::Literal { value: Value::Str(s) }) => Some(s),
            _ => None,
        }
    }
}

/// A node property: a literal value, or an expression computed at render
/// time (`prop = @expr`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropValue {
    Literal { value: Value },
    Dynamic { expr: Expr },
}

/// When a node's dynamic content is re-resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshPolicy {
    OnLoad,
    OnDocstep,
    Never,
    Every(Duration),
}

/// Slot layout hints, passed through to the (external) layout renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve: Option<SlotReserve>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<SlotFit>,
}

/// Reserved space for a slot's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SlotReserve {
    Fixed {
        width: f64,
        height: f64,
        units: String,
    },
    FixedWidth {
        width: f64,
        units: String,
    },
}

/// How slot content behaves when it overflows its reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotFit {
    Clip,
    Ellipsis,
    Shrink,
    ScaleDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_reads_literal_string_props_only() {
        let mut node = DocumentNode::new("text", "t1");
        node.props.insert(
            "label".into(),
            PropValue::Literal {
                value: Value::Str("intro".into()),
            },
        );
        assert_eq!(node.label(), Some("intro"));

        node.props.insert(
            "label".into(),
            PropValue::Literal {
                value: Value::Int(3),
            },
        );
        assert_eq!(node.label(), None);
    }

    #[test]
    fn refresh_policy_json() {
        assert_eq!(
            serde_json::to_string(&RefreshPolicy::OnDocstep).unwrap(),
            r#""onDocstep""#
        );
        let every = RefreshPolicy::Every(Duration {
            amount: 2.0,
            unit: crate::TimeUnit::S,
        });
        assert_eq!(
            serde_json::to_string(&every).unwrap(),
            r#"{"every":{"amount":2.0,"unit":"s"}}"#
        );
    }
}
