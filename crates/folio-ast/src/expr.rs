//! Expression trees.
//!
//! One expression grammar serves three consumers: rule conditions and
//! bodies (runtime kernel), dynamic node properties (render compiler) and
//! `visibleIf` checks (static checker). Calls through the `neighbors`
//! namespace are reified into a dedicated variant at parse time so the
//! runtime can special-case neighbor aggregation without sniffing callee
//! shapes.

use crate::value::Value;
use crate::Pos;
use serde::{Deserialize, Serialize};

/// An expression with its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(skip, default)]
    pub pos: Pos,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    /// View this expression as a dotted identifier path, if it is one.
    pub fn as_path(&self) -> Option<Vec<String>> {
        match &self.kind {
            ExprKind::Ident { name } => Some(vec![name.clone()]),
            ExprKind::Member { object, field } => {
                let mut path = object.as_path()?;
                path.push(field.clone());
                Some(path)
            }
            _ => None,
        }
    }
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExprKind {
    Literal {
        value: Value,
    },
    Ident {
        name: String,
    },
    List {
        items: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `object.field` member access.
    Member {
        object: Box<Expr>,
        field: String,
    },
    /// Generic call: `callee(args...)`.
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    /// Reified `neighbors.<method>(args...)` call.
    #[serde(rename = "neighborsCall")]
    NeighborsCall {
        method: String,
        args: Vec<Arg>,
    },
}

/// A call argument, optionally named (`tags = [...]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: Expr,
}

/// Unary operators: `not` and numeric negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Binary operators, lowest to highest precedence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Walk an expression tree, calling `visit` on every node (pre-order).
pub fn walk_expr(expr: &Expr, visit: &mut dyn FnMut(&Expr)) {
    visit(expr);
    match &expr.kind {
        ExprKind::Literal { .. } | ExprKind::Ident { .. } => {}
        ExprKind::List { items } => {
            for item in items {
                walk_expr(item, visit);
            }
        }
        ExprKind::Unary { operand, .. } => walk_expr(operand, visit),
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, visit);
            walk_expr(right, visit);
        }
        ExprKind::Member { object, .. } => walk_expr(object, visit),
        ExprKind::Call { callee, args } => {
            walk_expr(callee, visit);
            for arg in args {
                walk_expr(&arg.value, visit);
            }
        }
        ExprKind::NeighborsCall { args, .. } => {
            for arg in args {
                walk_expr(&arg.value, visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expr {
        Expr::new(
            ExprKind::Ident {
                name: name.to_string(),
            },
            Pos::default(),
        )
    }

    #[test]
    fn as_path_flattens_member_chains() {
        let expr = Expr::new(
            ExprKind::Member {
                object: Box::new(Expr::new(
                    ExprKind::Member {
                        object: Box::new(ident("a")),
                        field: "b".into(),
                    },
                    Pos::default(),
                )),
                field: "c".into(),
            },
            Pos::default(),
        );
        assert_eq!(expr.as_path().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn as_path_rejects_non_paths() {
        let expr = Expr::new(
            ExprKind::Literal {
                value: Value::Int(1),
            },
            Pos::default(),
        );
        assert!(expr.as_path().is_none());
    }

    #[test]
    fn walk_visits_all_nodes() {
        let expr = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(ident("a")),
                right: Box::new(ident("b")),
            },
            Pos::default(),
        );
        let mut count = 0;
        walk_expr(&expr, &mut |_| count += 1);
        assert_eq!(count, 3);
    }
}
