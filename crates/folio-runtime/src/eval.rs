//! Tree-walking expression evaluator.
//!
//! Shared by rule execution (docstep kernel) and dynamic property
//! resolution (render compiler); both build an [`EvalContext`] over the
//! same value model. Host-specific calls (`ref(...)`, `assets.pick(...)`)
//! go through the [`EvalHost`] seam so the kernel stays free of document
//! body and asset concerns.

use crate::error::RuntimeError;
use crate::state::GridRuntimeState;
use folio_ast::expr::{Arg, BinaryOp, Expr, ExprKind, UnaryOp};
use folio_ast::Value;
use folio_foundation::rng::RngStream;
use folio_foundation::stable_hash::fnv1a64_str;
use indexmap::IndexMap;

/// Host-provided resolution for calls the core evaluator cannot answer.
pub trait EvalHost {
    /// Resolve `ref("label")`. `None` means the label is unknown.
    fn resolve_ref(&self, label: &str) -> Option<Value> {
        let _ = label;
        None
    }

    /// Resolve `assets.pick(...)`. `None` means no asset matched.
    fn pick_asset(&self, args: &PickArgs) -> Option<Value> {
        let _ = args;
        None
    }
}

/// Host with no document body or asset catalog: rule bodies evaluate with
/// this during docsteps.
pub struct NoHost;

impl EvalHost for NoHost {}

/// Evaluated arguments of an `assets.pick(...)` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickArgs {
    pub tags: Vec<String>,
    pub bank: Option<String>,
}

/// Per-cell scope for grid rules: `cell.*`, `row`, `col` and the
/// `neighbors` namespace resolve against this.
#[derive(Clone, Copy)]
pub struct CellScope<'a> {
    pub grid: &'a GridRuntimeState,
    pub row: u32,
    pub col: u32,
}

/// Everything an expression may observe.
pub struct EvalContext<'a> {
    pub params: &'a IndexMap<String, Value>,
    pub seed: u64,
    pub docstep: u64,
    /// Milliseconds since load; only render contexts carry one.
    pub time_ms: Option<f64>,
    pub cell: Option<CellScope<'a>>,
    /// Stable entropy scope label (rule + cell, or node path + prop) so
    /// seeded helpers at different sites draw independent streams.
    pub scope: &'a str,
    pub host: &'a dyn EvalHost,
}

impl<'a> EvalContext<'a> {
    /// Stream for one seeded helper at this scope.
    fn rng(&self, salt: &str, mix_docstep: bool) -> RngStream {
        let stream = RngStream::derive(self.seed, self.scope).substream(fnv1a64_str(salt));
        if mix_docstep {
            stream.substream(self.docstep)
        } else {
            stream
        }
    }
}

/// Evaluate `expr` to a value.
pub fn eval(expr: &Expr, ctx: &EvalContext) -> Result<Value, RuntimeError> {
    match &expr.kind {
        ExprKind::Literal { value } => Ok(value.clone()),
        ExprKind::Ident { name } => eval_ident(name, ctx),
        ExprKind::List { items } => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval(item, ctx)?);
            }
            Ok(Value::List(values))
        }
        ExprKind::Unary { op, operand } => eval_unary(*op, operand, ctx),
        ExprKind::Binary { op, left, right } => eval_binary(*op, left, right, ctx),
        ExprKind::Member { object, field } => eval_member(object, field, ctx),
        ExprKind::Call { callee, args } => eval_call(callee, args, ctx),
        ExprKind::NeighborsCall { method, .. } => eval_neighbors(method, ctx),
    }
}

/// Evaluate a rule condition, requiring a boolean.
pub fn eval_condition(expr: &Expr, ctx: &EvalContext, rule: &str) -> Result<bool, RuntimeError> {
    match eval(expr, ctx)? {
        Value::Bool(b) => Ok(b),
        other => Err(RuntimeError::NonBooleanCondition {
            rule: rule.to_string(),
            got: other.type_name(),
        }),
    }
}

fn eval_ident(name: &str, ctx: &EvalContext) -> Result<Value, RuntimeError> {
    match name {
        "docstep" => return Ok(Value::Int(ctx.docstep as i64)),
        "time" => {
            if let Some(ms) = ctx.time_ms {
                return Ok(Value::Float(ms));
            }
        }
        "timeSeconds" => {
            if let Some(ms) = ctx.time_ms {
                return Ok(Value::Float(ms / 1000.0));
            }
        }
        "row" => {
            if let Some(cell) = &ctx.cell {
                return Ok(Value::Int(cell.row as i64));
            }
        }
        "col" => {
            if let Some(cell) = &ctx.cell {
                return Ok(Value::Int(cell.col as i64));
            }
        }
        _ => {}
    }
    ctx.params
        .get(name)
        .cloned()
        .ok_or_else(|| RuntimeError::UnknownIdentifier(name.to_string()))
}

fn eval_member(object: &Expr, field: &str, ctx: &EvalContext) -> Result<Value, RuntimeError> {
    // `cell.*` resolves against the current grid scope, not a value.
    if matches!(&object.kind, ExprKind::Ident { name } if name == "cell") {
        let Some(scope) = &ctx.cell else {
            return Err(RuntimeError::UnknownIdentifier("cell".to_string()));
        };
        let Some(cell) = scope.grid.cell(scope.row, scope.col) else {
            return Err(RuntimeError::UnknownIdentifier("cell".to_string()));
        };
        return match field {
            "content" => Ok(Value::Str(cell.content.clone())),
            "dynamic" => Ok(Value::Float(cell.dynamic)),
            "id" => Ok(Value::Str(cell.id.clone())),
            "row" => Ok(Value::Int(scope.row as i64)),
            "col" => Ok(Value::Int(scope.col as i64)),
            "tags" => Ok(Value::List(
                cell.tags.iter().cloned().map(Value::Str).collect(),
            )),
            other => Err(RuntimeError::UnknownMember {
                on: "cell".to_string(),
                field: other.to_string(),
            }),
        };
    }

    // The aggregate a neighbors call produces exposes `.dynamic` as itself.
    if let ExprKind::NeighborsCall { method, .. } = &object.kind {
        if field == "dynamic" {
            return eval_neighbors(method, ctx);
        }
        return Err(RuntimeError::UnknownMember {
            on: format!("neighbors.{method}()"),
            field: field.to_string(),
        });
    }

    let value = eval(object, ctx)?;
    Err(RuntimeError::UnknownMember {
        on: value.type_name().to_string(),
        field: field.to_string(),
    })
}

/// Mean of the in-bounds neighbors' `dynamic`. Out-of-grid positions are
/// silently clipped; an isolated cell (no neighbors) aggregates to 0.
fn eval_neighbors(method: &str, ctx: &EvalContext) -> Result<Value, RuntimeError> {
    let Some(scope) = &ctx.cell else {
        return Err(RuntimeError::NeighborsOutsideGrid(method.to_string()));
    };

    const MOORE: [(i64, i64); 8] = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ];
    const VON_NEUMANN: [(i64, i64); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

    let offsets: &[(i64, i64)] = match method {
        "all" => &MOORE,
        "orth" => &VON_NEUMANN,
        other => {
            return Err(RuntimeError::UnknownFunction(format!("neighbors.{other}")));
        }
    };

    let mut sum = 0.0;
    let mut count = 0u32;
    for (dr, dc) in offsets {
        let row = scope.row as i64 + dr;
        let col = scope.col as i64 + dc;
        if row < 0 || col < 0 {
            continue;
        }
        if let Some(cell) = scope.grid.cell(row as u32, col as u32) {
            sum += cell.dynamic;
            count += 1;
        }
    }
    if count == 0 {
        Ok(Value::Float(0.0))
    } else {
        Ok(Value::Float(sum / count as f64))
    }
}

fn eval_unary(op: UnaryOp, operand: &Expr, ctx: &EvalContext) -> Result<Value, RuntimeError> {
    let value = eval(operand, ctx)?;
    match op {
        UnaryOp::Not => match value {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(RuntimeError::TypeMismatch {
                context: "'not'".to_string(),
                expected: "bool",
                got: other.type_name(),
            }),
        },
        UnaryOp::Neg => match value {
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or(RuntimeError::IntegerOverflow("-")),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(RuntimeError::TypeMismatch {
                context: "unary '-'".to_string(),
                expected: "number",
                got: other.type_name(),
            }),
        },
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvalContext,
) -> Result<Value, RuntimeError> {
    // Short-circuit logical operators before evaluating the right side.
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let l = expect_bool(eval(left, ctx)?, op)?;
        return match (op, l) {
            (BinaryOp::And, false) => Ok(Value::Bool(false)),
            (BinaryOp::Or, true) => Ok(Value::Bool(true)),
            _ => Ok(Value::Bool(expect_bool(eval(right, ctx)?, op)?)),
        };
    }

    let l = eval(left, ctx)?;
    let r = eval(right, ctx)?;
    match op {
        BinaryOp::Eq => Ok(Value::Bool(l.loose_eq(&r))),
        BinaryOp::Ne => Ok(Value::Bool(!l.loose_eq(&r))),
        BinaryOp::StrictEq => Ok(Value::Bool(l.strict_eq(&r))),
        BinaryOp::StrictNe => Ok(Value::Bool(!l.strict_eq(&r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (a, b) = expect_numbers(&l, &r, op)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                _ => a >= b,
            }))
        }
        BinaryOp::Add => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => int_arith(a.checked_add(*b), op),
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Ok(Value::Str(format!("{}{}", l.display_string(), r.display_string())))
            }
            _ => {
                let (a, b) = expect_numbers(&l, &r, op)?;
                Ok(Value::Float(a + b))
            }
        },
        BinaryOp::Sub | BinaryOp::Mul => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                let out = if op == BinaryOp::Sub {
                    a.checked_sub(*b)
                } else {
                    a.checked_mul(*b)
                };
                int_arith(out, op)
            }
            _ => {
                let (a, b) = expect_numbers(&l, &r, op)?;
                Ok(Value::Float(if op == BinaryOp::Sub { a - b } else { a * b }))
            }
        },
        // Division is always floating; IEEE semantics for zero divisors.
        BinaryOp::Div => {
            let (a, b) = expect_numbers(&l, &r, op)?;
            Ok(Value::Float(a / b))
        }
        BinaryOp::Mod => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(RuntimeError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.rem_euclid(*b)))
                }
            }
            _ => {
                let (a, b) = expect_numbers(&l, &r, op)?;
                Ok(Value::Float(a.rem_euclid(b)))
            }
        },
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// Overflowing int arithmetic is a fatal evaluation error, not a wrap.
fn int_arith(out: Option<i64>, op: BinaryOp) -> Result<Value, RuntimeError> {
    out.map(Value::Int)
        .ok_or(RuntimeError::IntegerOverflow(op.symbol()))
}

fn expect_bool(value: Value, op: BinaryOp) -> Result<bool, RuntimeError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(RuntimeError::TypeMismatch {
            context: format!("'{}'", op.symbol()),
            expected: "bool",
            got: other.type_name(),
        }),
    }
}

fn expect_numbers(l: &Value, r: &Value, op: BinaryOp) -> Result<(f64, f64), RuntimeError> {
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::TypeMismatch {
            context: format!("'{}'", op.symbol()),
            expected: "number",
            got: if l.as_f64().is_none() {
                l.type_name()
            } else {
                r.type_name()
            },
        }),
    }
}

fn eval_call(callee: &Expr, args: &[Arg], ctx: &EvalContext) -> Result<Value, RuntimeError> {
    let Some(path) = callee.as_path() else {
        return Err(RuntimeError::UnknownFunction("<expression>".to_string()));
    };

    if path.len() == 2 && path[0] == "assets" && path[1] == "pick" {
        return eval_assets_pick(args, ctx);
    }
    if path.len() != 1 {
        return Err(RuntimeError::UnknownFunction(path.join(".")));
    }

    let name = path[0].as_str();
    if name == "ref" {
        return eval_ref(args, ctx);
    }

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval(&arg.value, ctx)?);
    }
    eval_builtin(name, &values, ctx)
}

fn eval_ref(args: &[Arg], ctx: &EvalContext) -> Result<Value, RuntimeError> {
    let label = match args.first().map(|a| &a.value.kind) {
        Some(ExprKind::Literal {
            value: Value::Str(s),
        }) => s,
        _ => {
            return Err(RuntimeError::WrongArgCount {
                function: "ref".to_string(),
                expected: "1 string literal",
                got: args.len(),
            })
        }
    };
    ctx.host
        .resolve_ref(label)
        .ok_or_else(|| RuntimeError::UnresolvedRef(label.clone()))
}

fn eval_assets_pick(args: &[Arg], ctx: &EvalContext) -> Result<Value, RuntimeError> {
    let mut pick = PickArgs::default();
    for arg in args {
        match arg.name.as_deref() {
            Some("tags") | None => {
                pick.tags = eval_tag_names(&arg.value, ctx)?;
            }
            Some("bank") => {
                pick.bank = match eval(&arg.value, ctx)? {
                    Value::Str(s) => Some(s),
                    other => {
                        return Err(RuntimeError::TypeMismatch {
                            context: "assets.pick bank".to_string(),
                            expected: "string",
                            got: other.type_name(),
                        })
                    }
                };
            }
            Some(other) => {
                return Err(RuntimeError::UnknownFunction(format!(
                    "assets.pick({other}=...)"
                )))
            }
        }
    }
    ctx.host
        .pick_asset(&pick)
        .ok_or(RuntimeError::NoAssetMatched)
}

/// A `tags` argument follows the literal tag grammar, so a bare identifier
/// inside the list is a tag name (`tags = [mask]`), not a parameter read.
/// Anything else evaluates as an expression and coerces to a string.
fn eval_tag_names(expr: &Expr, ctx: &EvalContext) -> Result<Vec<String>, RuntimeError> {
    match &expr.kind {
        ExprKind::Ident { name } if !ctx.params.contains_key(name) => Ok(vec![name.clone()]),
        ExprKind::List { items } => {
            let mut tags = Vec::with_capacity(items.len());
            for item in items {
                match &item.kind {
                    ExprKind::Ident { name } if !ctx.params.contains_key(name) => {
                        tags.push(name.clone());
                    }
                    _ => tags.push(eval(item, ctx)?.display_string()),
                }
            }
            Ok(tags)
        }
        _ => match eval(expr, ctx)? {
            Value::List(items) => Ok(items.iter().map(Value::display_string).collect()),
            Value::Str(s) => Ok(vec![s]),
            other => Err(RuntimeError::TypeMismatch {
                context: "assets.pick tags".to_string(),
                expected: "list or string",
                got: other.type_name(),
            }),
        },
    }
}

fn eval_builtin(name: &str, args: &[Value], ctx: &EvalContext) -> Result<Value, RuntimeError> {
    match name {
        "min" | "max" => fold_numeric(name, args),
        "abs" => {
            let [v] = one(name, args)?;
            match v {
                Value::Int(i) => Ok(Value::Int(i.abs())),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => num_error(name, other),
            }
        }
        "floor" | "ceil" | "round" => {
            let [v] = one(name, args)?;
            let f = v
                .as_f64()
                .ok_or_else(|| num_error_raw(name, v.type_name()))?;
            let out = match name {
                "floor" => f.floor(),
                "ceil" => f.ceil(),
                _ => f.round(),
            };
            Ok(Value::Int(out as i64))
        }
        "clamp" => {
            let [v, lo, hi] = three(name, args)?;
            let (v, lo, hi) = match (v.as_f64(), lo.as_f64(), hi.as_f64()) {
                (Some(a), Some(b), Some(c)) => (a, b, c),
                _ => return Err(num_error_raw(name, "non-number")),
            };
            Ok(Value::Float(v.clamp(lo, hi.max(lo))))
        }
        "len" => {
            let [v] = one(name, args)?;
            match v {
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(RuntimeError::TypeMismatch {
                    context: "len".to_string(),
                    expected: "list or string",
                    got: other.type_name(),
                }),
            }
        }
        "concat" => Ok(Value::Str(
            args.iter().map(Value::display_string).collect::<String>(),
        )),
        "random" => {
            if !args.is_empty() {
                return Err(RuntimeError::WrongArgCount {
                    function: name.to_string(),
                    expected: "0",
                    got: args.len(),
                });
            }
            Ok(Value::Float(ctx.rng("random", true).uniform()))
        }
        // Stable pick: same seed and scope give the same element at every
        // docstep.
        "choose" => {
            let items = list_arg(name, args)?;
            let mut rng = ctx.rng("choose", false);
            match rng.pick_index(items.len()) {
                Some(i) => Ok(items[i].clone()),
                None => Err(RuntimeError::EmptyListArgument(name.to_string())),
            }
        }
        // Re-picked each docstep.
        "chooseStep" => {
            let items = list_arg(name, args)?;
            let mut rng = ctx.rng("chooseStep", true);
            match rng.pick_index(items.len()) {
                Some(i) => Ok(items[i].clone()),
                None => Err(RuntimeError::EmptyListArgument(name.to_string())),
            }
        }
        // Deterministic rotation through the list, one step per docstep.
        "cycle" => {
            let items = list_arg(name, args)?;
            if items.is_empty() {
                return Err(RuntimeError::EmptyListArgument(name.to_string()));
            }
            Ok(items[(ctx.docstep % items.len() as u64) as usize].clone())
        }
        "shuffle" => {
            let items = list_arg(name, args)?;
            let mut rng = ctx.rng("shuffle", false);
            let order = rng.permutation(items.len());
            Ok(Value::List(order.into_iter().map(|i| items[i].clone()).collect()))
        }
        "sample" => {
            let [list, n] = two(name, args)?;
            let Value::List(items) = list else {
                return Err(RuntimeError::TypeMismatch {
                    context: name.to_string(),
                    expected: "list",
                    got: list.type_name(),
                });
            };
            let Some(n) = n.as_f64().map(|f| f.max(0.0) as usize) else {
                return Err(num_error_raw(name, n.type_name()));
            };
            let mut rng = ctx.rng("sample", false);
            let order = rng.permutation(items.len());
            Ok(Value::List(
                order
                    .into_iter()
                    .take(n)
                    .map(|i| items[i].clone())
                    .collect(),
            ))
        }
        // Fraction of the way through a period of `n` docsteps: [0, 1).
        "phase" => {
            let [v] = one(name, args)?;
            let period = v
                .as_f64()
                .ok_or_else(|| num_error_raw(name, v.type_name()))?;
            if period <= 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Float((ctx.docstep as f64).rem_euclid(period) / period))
        }
        // Hash-addressed pick: stable under list reordering of other keys.
        "hashpick" => {
            let [list, key] = two(name, args)?;
            let Value::List(items) = list else {
                return Err(RuntimeError::TypeMismatch {
                    context: name.to_string(),
                    expected: "list",
                    got: list.type_name(),
                });
            };
            if items.is_empty() {
                return Err(RuntimeError::EmptyListArgument(name.to_string()));
            }
            let idx = fnv1a64_str(&key.display_string()) % items.len() as u64;
            Ok(items[idx as usize].clone())
        }
        other => Err(RuntimeError::UnknownFunction(other.to_string())),
    }
}

fn fold_numeric(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.is_empty() {
        return Err(RuntimeError::WrongArgCount {
            function: name.to_string(),
            expected: "at least 1",
            got: 0,
        });
    }
    let mut all_int = true;
    let mut best: Option<f64> = None;
    for v in args {
        if !matches!(v, Value::Int(_)) {
            all_int = false;
        }
        let f = v.as_f64().ok_or_else(|| num_error_raw(name, v.type_name()))?;
        best = Some(match best {
            None => f,
            Some(b) if name == "min" => b.min(f),
            Some(b) => b.max(f),
        });
    }
    let best = best.unwrap_or(0.0);
    if all_int {
        Ok(Value::Int(best as i64))
    } else {
        Ok(Value::Float(best))
    }
}

fn list_arg<'v>(name: &str, args: &'v [Value]) -> Result<&'v [Value], RuntimeError> {
    match args {
        [Value::List(items)] => Ok(items),
        [other] => Err(RuntimeError::TypeMismatch {
            context: name.to_string(),
            expected: "list",
            got: other.type_name(),
        }),
        _ => Err(RuntimeError::WrongArgCount {
            function: name.to_string(),
            expected: "1",
            got: args.len(),
        }),
    }
}

fn one<'v>(name: &str, args: &'v [Value]) -> Result<[&'v Value; 1], RuntimeError> {
    match args {
        [a] => Ok([a]),
        _ => Err(RuntimeError::WrongArgCount {
            function: name.to_string(),
            expected: "1",
            got: args.len(),
        }),
    }
}

fn two<'v>(name: &str, args: &'v [Value]) -> Result<[&'v Value; 2], RuntimeError> {
    match args {
        [a, b] => Ok([a, b]),
        _ => Err(RuntimeError::WrongArgCount {
            function: name.to_string(),
            expected: "2",
            got: args.len(),
        }),
    }
}

fn three<'v>(name: &str, args: &'v [Value]) -> Result<[&'v Value; 3], RuntimeError> {
    match args {
        [a, b, c] => Ok([a, b, c]),
        _ => Err(RuntimeError::WrongArgCount {
            function: name.to_string(),
            expected: "3",
            got: args.len(),
        }),
    }
}

fn num_error(name: &str, value: &Value) -> Result<Value, RuntimeError> {
    Err(num_error_raw(name, value.type_name()))
}

fn num_error_raw(name: &str, got: &'static str) -> RuntimeError {
    RuntimeError::TypeMismatch {
        context: name.to_string(),
        expected: "number",
        got,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_lexer::tokenize;
    use folio_parser::parse_expression;

    fn ctx_params() -> IndexMap<String, Value> {
        let mut params = IndexMap::new();
        params.insert("count".to_string(), Value::Int(3));
        params.insert("bias".to_string(), Value::Float(0.25));
        params.insert("on".to_string(), Value::Bool(true));
        params.insert("name".to_string(), Value::Str("folio".to_string()));
        params
    }

    fn run(src: &str, params: &IndexMap<String, Value>) -> Result<Value, RuntimeError> {
        let tokens = tokenize(src).unwrap();
        let expr = parse_expression(&tokens).unwrap();
        let ctx = EvalContext {
            params,
            seed: 42,
            docstep: 5,
            time_ms: Some(1500.0),
            cell: None,
            scope: "test",
            host: &NoHost,
        };
        eval(&expr, &ctx)
    }

    fn ok(src: &str) -> Value {
        run(src, &ctx_params()).unwrap()
    }

    #[test]
    fn arithmetic_preserves_ints_where_possible() {
        assert_eq!(ok("2 + 3"), Value::Int(5));
        assert_eq!(ok("2 * 3 - 1"), Value::Int(5));
        assert_eq!(ok("2 + 0.5"), Value::Float(2.5));
        assert_eq!(ok("7 % 3"), Value::Int(1));
        // Division is always floating.
        assert_eq!(ok("7 / 2"), Value::Float(3.5));
    }

    #[test]
    fn string_concatenation_with_plus() {
        assert_eq!(ok("name + \"!\""), Value::Str("folio!".into()));
        assert_eq!(ok("\"n=\" + count"), Value::Str("n=3".into()));
    }

    #[test]
    fn loose_vs_strict_equality() {
        assert_eq!(ok("1 == 1.0"), Value::Bool(true));
        assert_eq!(ok("1 === 1.0"), Value::Bool(false));
        assert_eq!(ok("1 !== 1.0"), Value::Bool(true));
    }

    #[test]
    fn logic_is_short_circuit_and_strict() {
        assert_eq!(ok("on && count > 2"), Value::Bool(true));
        // Right side would fail, but the left decides.
        assert_eq!(ok("false && missing > 0"), Value::Bool(false));
        assert_eq!(ok("true || missing > 0"), Value::Bool(true));
        assert!(matches!(
            run("1 && true", &ctx_params()),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn context_identifiers() {
        assert_eq!(ok("docstep"), Value::Int(5));
        assert_eq!(ok("time"), Value::Float(1500.0));
        assert_eq!(ok("timeSeconds"), Value::Float(1.5));
        assert!(matches!(
            run("nonesuch", &ctx_params()),
            Err(RuntimeError::UnknownIdentifier(n)) if n == "nonesuch"
        ));
    }

    #[test]
    fn numeric_builtins() {
        assert_eq!(ok("min(3, 1, 2)"), Value::Int(1));
        assert_eq!(ok("max(3, 1.5)"), Value::Float(3.0));
        assert_eq!(ok("abs(-4)"), Value::Int(4));
        assert_eq!(ok("floor(2.9)"), Value::Int(2));
        assert_eq!(ok("ceil(2.1)"), Value::Int(3));
        assert_eq!(ok("round(2.5)"), Value::Int(3));
        assert_eq!(ok("clamp(5, 0, 3)"), Value::Float(3.0));
        assert_eq!(ok("len([1, 2, 3])"), Value::Int(3));
        assert_eq!(ok("len(\"ab\")"), Value::Int(2));
        assert_eq!(ok("concat(\"a\", 1, true)"), Value::Str("a1true".into()));
    }

    #[test]
    fn seeded_helpers_are_deterministic() {
        let params = ctx_params();
        assert_eq!(run("random()", &params), run("random()", &params));
        assert_eq!(
            run("choose([\"a\", \"b\", \"c\"])", &params),
            run("choose([\"a\", \"b\", \"c\"])", &params)
        );
        assert_eq!(
            run("shuffle([1, 2, 3, 4])", &params),
            run("shuffle([1, 2, 3, 4])", &params)
        );
    }

    #[test]
    fn cycle_and_phase_follow_the_docstep() {
        // docstep = 5 in the test context.
        assert_eq!(ok("cycle([\"a\", \"b\", \"c\"])"), Value::Str("c".into()));
        assert_eq!(ok("phase(4)"), Value::Float(0.25));
    }

    #[test]
    fn hashpick_is_key_addressed() {
        let a = ok("hashpick([\"x\", \"y\", \"z\"], \"k1\")");
        let b = ok("hashpick([\"x\", \"y\", \"z\"], \"k1\")");
        assert_eq!(a, b);
    }

    #[test]
    fn int_overflow_is_an_error_not_a_wrap() {
        let params = ctx_params();
        assert!(matches!(
            run("9223372036854775807 + 1", &params),
            Err(RuntimeError::IntegerOverflow("+"))
        ));
        assert!(matches!(
            run("-9223372036854775807 - 2", &params),
            Err(RuntimeError::IntegerOverflow("-"))
        ));
        assert!(matches!(
            run("9223372036854775807 * 2", &params),
            Err(RuntimeError::IntegerOverflow("*"))
        ));
        // Negating the minimum has no i64 representation.
        assert!(matches!(
            run("-(-9223372036854775807 - 1)", &params),
            Err(RuntimeError::IntegerOverflow("-"))
        ));
    }

    #[test]
    fn bare_identifier_tags_are_tag_names() {
        // The tags argument follows the tag grammar, so `mask` is a tag
        // string and must reach the host, not fail identifier resolution.
        assert!(matches!(
            run("assets.pick(tags = [mask])", &ctx_params()),
            Err(RuntimeError::NoAssetMatched)
        ));
        assert!(matches!(
            run("assets.pick(tags = [mask, \"wash\"])", &ctx_params()),
            Err(RuntimeError::NoAssetMatched)
        ));
    }

    #[test]
    fn neighbors_outside_grid_scope_fails() {
        assert!(matches!(
            run("neighbors.all()", &ctx_params()),
            Err(RuntimeError::NeighborsOutsideGrid(_))
        ));
    }

    #[test]
    fn unresolved_ref_without_host() {
        assert!(matches!(
            run("ref(\"intro\")", &ctx_params()),
            Err(RuntimeError::UnresolvedRef(label)) if label == "intro"
        ));
    }
}
