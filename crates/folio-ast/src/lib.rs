//! Abstract Syntax Tree for the Folio document language.
//!
//! These types represent the parsed structure of a `document { ... }` source
//! unit. A `Document` is immutable once parsed; the runtime kernel and the
//! Render IR compiler both read it without mutation.
//!
//! The serde shapes here are an external contract: CLI "parse" output and
//! editor tooling consume the AST as JSON, so field names and nesting
//! (`meta`, `state.params[]`, `grids[].cells[]`, `rules[].branches[]`,
//! `body.nodes[]`) must stay exactly as declared.

pub mod expr;
pub mod node;
pub mod value;

pub use expr::{Arg, BinaryOp, Expr, ExprKind, UnaryOp};
pub use node::{BodyDecl, DocumentNode, PropValue, RefreshPolicy, SlotConfig, SlotFit, SlotReserve};
pub use value::Value;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 1-based source position of a syntactic element.
///
/// Carried for diagnostics only; not part of the JSON contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A complete parsed document. Root of the AST.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Free-form string map. `version` is mandatory (checker-enforced).
    pub meta: IndexMap<String, String>,
    pub state: StateDecl,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_config: Option<PageConfig>,
    pub grids: Vec<GridDecl>,
    /// Declaration order is significant: it is the tie-break for
    /// conflicting writes within one docstep.
    pub rules: Vec<Rule>,
    pub runtime: RuntimeSpec,
    pub materials: Vec<AssetEntry>,
    pub assets: AssetsDecl,
    pub body: BodyDecl,
}

impl Document {
    /// Look up a declared grid by name.
    pub fn grid(&self, name: &str) -> Option<&GridDecl> {
        self.grids.iter().find(|g| g.name == name)
    }

    /// Look up a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.state.params.iter().find(|p| p.name == name)
    }
}

/// `state { ... }` block: the document's parametric state declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDecl {
    /// Ordered list of typed parameters.
    pub params: Vec<Param>,
}

/// A single typed parameter declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    /// Lower bound; `None` means open (`inf` in source).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound; `None` means open (`inf` in source).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Enum variants; empty unless `ty` is `Enum`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    /// Mandatory initial value.
    pub initial: Value,
    #[serde(skip, default)]
    pub pos: Pos,
}

/// Declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Float,
    Bool,
    String,
    Enum,
}

/// `pageConfig { ... }` block: page geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    pub width: f64,
    pub height: f64,
    /// Unit tag for width/height, e.g. `"pt"` or `"mm"`.
    #[serde(default = "default_page_units")]
    pub units: String,
}

fn default_page_units() -> String {
    "pt".to_string()
}

/// `grid <name> { ... }` block: a named rectangular cell array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDecl {
    pub name: String,
    /// Topology tag, e.g. `"rect"`. Opaque to the core.
    pub topology: String,
    /// Page index the grid is bound to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,
    /// Declared cells. May be fewer than `rows*cols`; the runtime pads.
    pub cells: Vec<CellDecl>,
    #[serde(skip, default)]
    pub pos: Pos,
}

/// A single `cell { ... }` definition inside a grid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellDecl {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<f64>,
}

/// A `rule <name>(header) { body }` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    pub mode: RuleMode,
    pub scope: RuleScope,
    /// Event name for `mode=event` rules (parser-enforced presence).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
    /// Flattened `when / else when / else` chain.
    pub branches: Vec<RuleBranch>,
    /// Mirror of `branches[0].condition` for backward-compatible consumers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
    /// Mirror of `branches[0].body`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then_branch: Vec<Stmt>,
    #[serde(skip, default)]
    pub pos: Pos,
}

/// Rule execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMode {
    #[default]
    Docstep,
    Event,
    Timer,
}

/// Rule scope: grid-scoped rules run once per cell, row-major.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<String>,
}

/// One `when <cond> then { ... }` arm. The trailing `else { ... }` arm has
/// no condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleBranch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// Rule-body statement. Intentionally not a general-purpose language:
/// assignment, a local binding form, and an advance marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Stmt {
    Assign {
        target: AssignTarget,
        value: Expr,
    },
    Let {
        name: String,
        value: Expr,
    },
    AdvanceDocstep,
}

/// Left-hand side of an assignment: a dotted path. The grammar admits any
/// path; the runtime kernel restricts it to a declared parameter name or
/// `cell.content` / `cell.dynamic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignTarget {
    pub path: Vec<String>,
}

impl std::fmt::Display for AssignTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.join("."))
    }
}

/// `runtime { ... }` block: event policy and docstep advance sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    pub events_apply: EventsApply,
    pub docstep_advance: Vec<AdvanceSpec>,
}

/// Policy for applying delivered events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventsApply {
    #[default]
    Queued,
    Immediate,
}

/// One docstep advance source. Currently only `timer(amount unit)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AdvanceSpec {
    Timer {
        amount: f64,
        unit: TimeUnit,
        #[serde(skip, default)]
        pos: Pos,
    },
}

/// Normalized duration unit. The parser folds the accepted spellings
/// (`sec`, `secs`, `seconds`, ...) into these canonical tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Ms,
    S,
    M,
    H,
    Beats,
    Bars,
    Subs,
    Ticks,
}

impl TimeUnit {
    /// Canonical spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
            TimeUnit::M => "m",
            TimeUnit::H => "h",
            TimeUnit::Beats => "beats",
            TimeUnit::Bars => "bars",
            TimeUnit::Subs => "subs",
            TimeUnit::Ticks => "ticks",
        }
    }
}

/// A duration literal, e.g. `every(2 s)` refresh policies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    pub amount: f64,
    pub unit: TimeUnit,
}

/// `assets { ... }` block contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetsDecl {
    pub entries: Vec<AssetEntry>,
    pub banks: Vec<AssetBank>,
}

/// A named catalog entry (asset or material).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Selection weight for `weighted` picks. Defaults to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// A bank enumerating asset files by glob, with a pick strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetBank {
    pub name: String,
    pub glob: String,
    pub strategy: PickStrategy,
}

/// Bank selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStrategy {
    #[default]
    Uniform,
    Weighted,
}
