//! Static checker for parsed documents.
//!
//! Accumulative and non-fatal: [`check_document`] walks the whole AST and
//! returns every diagnostic it finds, never stopping at the first. The
//! runtime kernel and render compiler rely on the invariants enforced
//! here (grid references, label uniqueness, neighbor method names), so a
//! host should refuse to run a document with error-severity diagnostics.

use folio_ast::expr::{walk_expr, BinaryOp, Expr, ExprKind, UnaryOp};
use folio_ast::node::{DocumentNode, PropValue};
use folio_ast::{AdvanceSpec, Document, Pos, Stmt, Value};
use std::collections::HashMap;
use std::fmt;

/// Diagnostic severity. Any `Error` entry should make a host refuse the
/// document; warnings are advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One checker finding. Renders as `<file>:<line>:<column>: <severity>:
/// <message>`, the format editor integrations regex line/column out of.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file,
            self.line,
            self.column,
            self.severity.as_str(),
            self.message
        )
    }
}

/// True when any diagnostic is error severity (CLI exit-code logic).
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Run every check over `doc`, labeling diagnostics with `file`.
pub fn check_document(file: &str, doc: &Document) -> Vec<Diagnostic> {
    let mut checker = Checker {
        file,
        doc,
        diagnostics: Vec::new(),
    };
    checker.check_meta();
    checker.check_unique_names();
    checker.check_rules();
    checker.check_timers();
    checker.check_body();
    checker.diagnostics
}

/// Randomness/sequencing helpers banned inside `visibleIf`.
const ENTROPY_CALLS: &[&str] = &[
    "random",
    "choose",
    "chooseStep",
    "cycle",
    "shuffle",
    "sample",
    "phase",
    "hashpick",
];

/// Identifiers that change between renders, banned inside `visibleIf`.
const ENTROPY_IDENTS: &[&str] = &["time", "timeSeconds", "docstep"];

const NEIGHBOR_METHODS: &[&str] = &["all", "orth"];

struct Checker<'a> {
    file: &'a str,
    doc: &'a Document,
    diagnostics: Vec<Diagnostic>,
}

impl Checker<'_> {
    fn push(&mut self, severity: Severity, pos: Pos, message: String) {
        self.diagnostics.push(Diagnostic {
            file: self.file.to_string(),
            line: pos.line.max(1),
            column: pos.column.max(1),
            severity,
            message,
        });
    }

    fn error(&mut self, pos: Pos, message: String) {
        self.push(Severity::Error, pos, message);
    }

    fn warning(&mut self, pos: Pos, message: String) {
        self.push(Severity::Warning, pos, message);
    }

    fn check_meta(&mut self) {
        if !self.doc.meta.contains_key("version") {
            self.error(
                Pos::new(1, 1),
                "meta is missing the mandatory 'version' field".to_string(),
            );
        }
    }

    fn check_unique_names(&mut self) {
        let doc = self.doc;
        let mut seen = HashMap::new();
        for param in &doc.state.params {
            if seen.insert(param.name.as_str(), ()).is_some() {
                let pos = param.pos;
                self.error(pos, format!("duplicate param name '{}'", param.name));
            }
        }
        let mut seen = HashMap::new();
        for grid in &doc.grids {
            if seen.insert(grid.name.as_str(), ()).is_some() {
                let pos = grid.pos;
                self.error(pos, format!("duplicate grid name '{}'", grid.name));
            }
        }
    }

    fn check_rules(&mut self) {
        let doc = self.doc;
        for rule in &doc.rules {
            if let Some(grid) = &rule.scope.grid {
                if doc.grid(grid).is_none() {
                    self.error(
                        rule.pos,
                        format!("rule '{}' references unknown grid '{}'", rule.name, grid),
                    );
                }
            }

            for branch in &rule.branches {
                if let Some(cond) = &branch.condition {
                    if matches!(
                        cond.kind,
                        ExprKind::Literal {
                            value: Value::Bool(false)
                        }
                    ) {
                        self.warning(
                            cond.pos,
                            format!("condition in rule '{}' is always false", rule.name),
                        );
                    }
                    self.check_expr(cond);
                }
                for stmt in &branch.body {
                    match stmt {
                        Stmt::Assign { target, value } => {
                            if target.path.first().map(String::as_str) == Some("cell")
                                && rule.scope.grid.is_none()
                            {
                                self.error(
                                    rule.pos,
                                    format!(
                                        "rule '{}' assigns to '{}' but has no grid scope",
                                        rule.name, target
                                    ),
                                );
                            }
                            self.check_expr(value);
                        }
                        Stmt::Let { value, .. } => {
                            self.check_expr(value);
                        }
                        Stmt::AdvanceDocstep => {}
                    }
                }
            }
        }
    }

    /// Neighbor method names, in any rule expression.
    fn check_expr(&mut self, expr: &Expr) {
        let mut found = Vec::new();
        walk_expr(expr, &mut |e| {
            if let ExprKind::NeighborsCall { method, .. } = &e.kind {
                if !NEIGHBOR_METHODS.contains(&method.as_str()) {
                    found.push((e.pos, method.clone()));
                }
            }
        });
        for (pos, method) in found {
            self.error(
                pos,
                format!("unknown neighbors method '{method}' (expected 'all' or 'orth')"),
            );
        }
    }

    fn check_timers(&mut self) {
        let doc = self.doc;
        for spec in &doc.runtime.docstep_advance {
            let AdvanceSpec::Timer { amount, pos, .. } = spec;
            if *amount <= 0.0 {
                self.error(*pos, "timer amount must be positive".to_string());
            }
        }
    }

    fn check_body(&mut self) {
        let doc = self.doc;
        // First pass: collect declared labels document-wide.
        let mut labels: HashMap<&str, Pos> = HashMap::new();
        let mut duplicates = Vec::new();
        visit_nodes(&doc.body.nodes, &mut |node| {
            if let Some(label) = node.label() {
                if labels.insert(label, node.pos).is_some() {
                    duplicates.push((node.pos, label.to_string()));
                }
            }
        });
        for (pos, label) in duplicates {
            self.error(pos, format!("duplicate label '{label}'"));
        }

        // Second pass: dynamic expressions.
        let mut findings: Vec<(Pos, Severity, String)> = Vec::new();
        visit_nodes(&doc.body.nodes, &mut |node| {
            for (prop, value) in &node.props {
                let PropValue::Dynamic { expr } = value else {
                    continue;
                };
                collect_ref_findings(expr, &labels, &mut findings);
                collect_neighbor_findings(expr, &mut findings);
                if prop == "visibleIf" {
                    collect_visible_if_findings(expr, &mut findings);
                }
            }
            // A literal visibleIf that is not a bool can never be honored.
            if let Some(PropValue::Literal { value }) = node.props.get("visibleIf") {
                if !matches!(value, Value::Bool(_)) {
                    findings.push((
                        node.pos,
                        Severity::Error,
                        format!(
                            "visibleIf must be a boolean expression, got {}",
                            value.type_name()
                        ),
                    ));
                }
            }
        });
        for (pos, severity, message) in findings {
            self.push(severity, pos, message);
        }
    }
}

fn visit_nodes<'a>(nodes: &'a [DocumentNode], visit: &mut dyn FnMut(&'a DocumentNode)) {
    for node in nodes {
        visit(node);
        visit_nodes(&node.children, visit);
    }
}

/// `ref("label")` calls must resolve to a declared label.
fn collect_ref_findings(
    expr: &Expr,
    labels: &HashMap<&str, Pos>,
    findings: &mut Vec<(Pos, Severity, String)>,
) {
    walk_expr(expr, &mut |e| {
        let ExprKind::Call { callee, args } = &e.kind else {
            return;
        };
        if !matches!(&callee.kind, ExprKind::Ident { name } if name == "ref") {
            return;
        }
        let target = args.first().and_then(|arg| match &arg.value.kind {
            ExprKind::Literal {
                value: Value::Str(s),
            } => Some(s.as_str()),
            _ => None,
        });
        match target {
            Some(label) if labels.contains_key(label) => {}
            Some(label) => findings.push((
                e.pos,
                Severity::Error,
                format!("ref('{label}') does not resolve to any declared label"),
            )),
            None => findings.push((
                e.pos,
                Severity::Error,
                "ref() requires a string literal label argument".to_string(),
            )),
        }
    });
}

/// Neighbor calls only make sense inside grid-scoped rules.
fn collect_neighbor_findings(expr: &Expr, findings: &mut Vec<(Pos, Severity, String)>) {
    walk_expr(expr, &mut |e| {
        if let ExprKind::NeighborsCall { method, .. } = &e.kind {
            if !NEIGHBOR_METHODS.contains(&method.as_str()) {
                findings.push((
                    e.pos,
                    Severity::Error,
                    format!("unknown neighbors method '{method}' (expected 'all' or 'orth')"),
                ));
            }
        }
    });
}

/// `visibleIf` must be boolean-shaped and entropy-free: a node whose
/// visibility is driven by live entropy cannot honor a `never` / `onLoad`
/// refresh contract.
fn collect_visible_if_findings(expr: &Expr, findings: &mut Vec<(Pos, Severity, String)>) {
    if let Some(shape) = non_boolean_shape(expr) {
        findings.push((
            expr.pos,
            Severity::Error,
            format!("visibleIf must be a boolean expression, got {shape}"),
        ));
    }

    walk_expr(expr, &mut |e| match &e.kind {
        ExprKind::Ident { name } if ENTROPY_IDENTS.contains(&name.as_str()) => {
            findings.push((
                e.pos,
                Severity::Error,
                format!("visibleIf must not depend on '{name}'"),
            ));
        }
        ExprKind::Call { callee, .. } => {
            if let Some(path) = callee.as_path() {
                let head = path[0].as_str();
                if path.len() == 1 && ENTROPY_CALLS.contains(&head) {
                    findings.push((
                        e.pos,
                        Severity::Error,
                        format!("visibleIf must not call randomness helper '{head}'"),
                    ));
                } else if head == "assets" {
                    findings.push((
                        e.pos,
                        Severity::Error,
                        format!("visibleIf must not depend on 'assets.{}'", path[1..].join(".")),
                    ));
                }
            }
        }
        _ => {}
    });
}

/// Top-level shapes that can never produce a boolean. Conservative:
/// idents, calls, member access and logical/comparison operators pass
/// because their result type is only known at evaluation time.
fn non_boolean_shape(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Literal { value } if !matches!(value, Value::Bool(_)) => {
            Some(format!("a {} literal", value.type_name()))
        }
        ExprKind::List { .. } => Some("a list".to_string()),
        ExprKind::Unary {
            op: UnaryOp::Neg, ..
        } => Some("a negated number".to_string()),
        ExprKind::Binary { op, .. } => match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                Some(format!("an arithmetic '{}' result", op.symbol()))
            }
            _ => None,
        },
        _ => None,
    }
}
