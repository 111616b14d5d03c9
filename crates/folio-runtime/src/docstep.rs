//! Docstep execution: evaluate every docstep rule against the previous
//! state, then commit the buffered writes into a new state.
//!
//! The two phases are the core determinism guarantee: every expression in
//! a docstep observes the previous state only, so rule order and cell
//! order cannot leak into reads. Writes buffer as patches and apply in
//! emission order, so the last writer wins on conflict.

use crate::error::RuntimeError;
use crate::eval::{eval, eval_condition, CellScope, EvalContext, NoHost};
use crate::state::RuntimeState;
use folio_ast::{Document, ParamType, Rule, RuleBranch, RuleMode, Stmt, Value};
use tracing::{debug, trace};

/// One buffered write.
#[derive(Debug, Clone)]
enum Patch {
    Param {
        name: String,
        value: Value,
    },
    Cell {
        grid: String,
        index: usize,
        field: CellField,
        value: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellField {
    Content,
    Dynamic,
}

/// Advance the state by one docstep. `prev` is never mutated; on error the
/// caller keeps it unchanged.
pub fn run_docstep_once(doc: &Document, prev: &RuntimeState) -> Result<RuntimeState, RuntimeError> {
    let mut patches = Vec::new();

    for rule in &doc.rules {
        if rule.mode != RuleMode::Docstep {
            continue;
        }
        match &rule.scope.grid {
            Some(grid_name) => {
                let Some(grid) = prev.grids.get(grid_name) else {
                    // Checker territory; an unknown grid fires nothing.
                    debug!(rule = %rule.name, grid = %grid_name, "skipping rule with unknown grid");
                    continue;
                };
                for row in 0..grid.rows {
                    for col in 0..grid.cols {
                        let scope = format!("{}/{}:{}", rule.name, row, col);
                        let ctx = EvalContext {
                            params: &prev.params,
                            seed: prev.seed,
                            docstep: prev.docstep_index,
                            time_ms: None,
                            cell: Some(CellScope { grid, row, col }),
                            scope: &scope,
                            host: &NoHost,
                        };
                        evaluate_rule(rule, &ctx, Some((grid_name, row, col)), &mut patches)?;
                    }
                }
            }
            None => {
                let ctx = EvalContext {
                    params: &prev.params,
                    seed: prev.seed,
                    docstep: prev.docstep_index,
                    time_ms: None,
                    cell: None,
                    scope: &rule.name,
                    host: &NoHost,
                };
                evaluate_rule(rule, &ctx, None, &mut patches)?;
            }
        }
    }

    debug!(
        docstep = prev.docstep_index + 1,
        patches = patches.len(),
        "committing docstep"
    );
    commit(doc, prev, patches)
}

/// Deliver an external event.
///
/// Accepted and logged, but a no-op at this kernel version: event-mode
/// rules are declared and validated, and delivery semantics (queued
/// against the next docstep versus immediate) are reserved to the host
/// loop. The state comes back unchanged.
pub fn handle_event(doc: &Document, state: &RuntimeState, event: &str) -> RuntimeState {
    let handlers = doc
        .rules
        .iter()
        .filter(|r| r.mode == RuleMode::Event && r.on.as_deref() == Some(event))
        .count();
    debug!(event, handlers, "event received (no-op)");
    state.clone()
}

fn evaluate_rule(
    rule: &Rule,
    ctx: &EvalContext,
    cell_target: Option<(&str, u32, u32)>,
    patches: &mut Vec<Patch>,
) -> Result<(), RuntimeError> {
    let Some(branch) = select_branch(rule, ctx)? else {
        return Ok(());
    };

    for stmt in &branch.body {
        match stmt {
            Stmt::Assign { target, value } => {
                let value = eval(value, ctx)?;
                patches.push(make_patch(rule, ctx, cell_target, &target.path, value)?);
            }
            // Local bindings are accepted but inert at this kernel version.
            Stmt::Let { name, .. } => {
                trace!(rule = %rule.name, binding = %name, "let is a no-op");
            }
            // Docsteps advance only through the runtime's advance sources.
            Stmt::AdvanceDocstep => {
                trace!(rule = %rule.name, "advanceDocstep() is a no-op");
            }
        }
    }
    Ok(())
}

/// First branch whose condition holds; the unconditional `else` branch
/// always holds.
fn select_branch<'r>(
    rule: &'r Rule,
    ctx: &EvalContext,
) -> Result<Option<&'r RuleBranch>, RuntimeError> {
    for branch in &rule.branches {
        match &branch.condition {
            None => return Ok(Some(branch)),
            Some(cond) => {
                if eval_condition(cond, ctx, &rule.name)? {
                    return Ok(Some(branch));
                }
            }
        }
    }
    Ok(None)
}

fn make_patch(
    rule: &Rule,
    ctx: &EvalContext,
    cell_target: Option<(&str, u32, u32)>,
    path: &[String],
    value: Value,
) -> Result<Patch, RuntimeError> {
    match path {
        [name] if ctx.params.contains_key(name) => Ok(Patch::Param {
            name: name.clone(),
            value,
        }),
        [head, field] if head.as_str() == "cell" => {
            let Some((grid_name, row, col)) = cell_target else {
                return Err(RuntimeError::UnsupportedAssignTarget(path.join(".")));
            };
            let field = match field.as_str() {
                "content" => CellField::Content,
                "dynamic" => CellField::Dynamic,
                _ => return Err(RuntimeError::UnsupportedAssignTarget(path.join("."))),
            };
            let index = ctx
                .cell
                .as_ref()
                .map(|scope| scope.grid.index_of(row, col))
                .unwrap_or_default();
            trace!(rule = %rule.name, grid = grid_name, row, col, "cell patch");
            Ok(Patch::Cell {
                grid: grid_name.to_string(),
                index,
                field,
                value,
            })
        }
        _ => Err(RuntimeError::UnsupportedAssignTarget(path.join("."))),
    }
}

fn commit(
    doc: &Document,
    prev: &RuntimeState,
    patches: Vec<Patch>,
) -> Result<RuntimeState, RuntimeError> {
    let mut next = prev.clone();
    next.docstep_index = prev.docstep_index + 1;

    for patch in patches {
        match patch {
            Patch::Param { name, value } => {
                let coerced = coerce_param(doc, &name, value)?;
                next.params.insert(name, coerced);
            }
            Patch::Cell {
                grid,
                index,
                field,
                value,
            } => {
                let Some(grid_state) = next.grids.get_mut(&grid) else {
                    continue;
                };
                let Some(cell) = grid_state.cells.get_mut(index) else {
                    continue;
                };
                match field {
                    CellField::Content => cell.content = value.display_string(),
                    CellField::Dynamic => {
                        cell.dynamic = value.as_f64().ok_or(RuntimeError::TypeMismatch {
                            context: "cell.dynamic".to_string(),
                            expected: "number",
                            got: value.type_name(),
                        })?;
                    }
                }
            }
        }
    }
    Ok(next)
}

/// Coerce a committed value onto the declared parameter type, clamping
/// numeric params onto their declared bounds.
fn coerce_param(doc: &Document, name: &str, value: Value) -> Result<Value, RuntimeError> {
    let Some(param) = doc.param(name) else {
        // Params are validated at patch creation; a missing declaration
        // here means the document changed under us.
        return Err(RuntimeError::UnknownIdentifier(name.to_string()));
    };

    match param.ty {
        ParamType::Int => {
            let f = value.as_f64().ok_or(RuntimeError::TypeMismatch {
                context: format!("param '{name}'"),
                expected: "number",
                got: value.type_name(),
            })?;
            let clamped = clamp_bounds(f.round(), param.min, param.max);
            Ok(Value::Int(clamped as i64))
        }
        ParamType::Float => {
            let f = value.as_f64().ok_or(RuntimeError::TypeMismatch {
                context: format!("param '{name}'"),
                expected: "number",
                got: value.type_name(),
            })?;
            Ok(Value::Float(clamp_bounds(f, param.min, param.max)))
        }
        ParamType::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            other => Err(RuntimeError::TypeMismatch {
                context: format!("param '{name}'"),
                expected: "bool",
                got: other.type_name(),
            }),
        },
        ParamType::String => Ok(Value::Str(value.display_string())),
        ParamType::Enum => {
            let s = value.display_string();
            if param.variants.iter().any(|v| *v == s) {
                Ok(Value::Str(s))
            } else {
                Err(RuntimeError::InvalidEnumValue {
                    param: name.to_string(),
                    value: s,
                })
            }
        }
    }
}

fn clamp_bounds(v: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let v = match min {
        Some(lo) => v.max(lo),
        None => v,
    };
    match max {
        Some(hi) => v.min(hi),
        None => v,
    }
}
