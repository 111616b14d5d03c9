//! The render pass: AST plus optional runtime state into Render IR.

use crate::assets::{pick_from_bank, pick_from_catalog, AssetResolver, NoAssets};
use crate::error::RenderError;
use crate::ir::{
    RenderCellData, RenderDocumentIR, RenderGridData, RenderNodeIR, ResolvedAsset, SlotMeta,
};
use folio_ast::node::{DocumentNode, PropValue, RefreshPolicy};
use folio_ast::{Document, PickStrategy, Value};
use folio_foundation::rng::RngStream;
use folio_foundation::stable_hash::StableHasher;
use folio_runtime::{eval, EvalContext, EvalHost, GridRuntimeState, PickArgs, RuntimeState};
use indexmap::IndexMap;
use std::cell::RefCell;
use tracing::debug;

/// Static resolver instance for the no-banks default.
const NO_ASSETS: NoAssets = NoAssets;

/// Inputs of one render pass.
pub struct RenderOptions<'a> {
    pub seed: u64,
    /// Milliseconds since load.
    pub time_ms: f64,
    pub docstep: u64,
    /// Runtime snapshot; grids and params fall back to their declared
    /// initial values when absent.
    pub runtime: Option<&'a RuntimeState>,
    pub assets: &'a dyn AssetResolver,
}

impl<'a> RenderOptions<'a> {
    pub fn new(seed: u64, time_ms: f64, docstep: u64) -> Self {
        Self {
            seed,
            time_ms,
            docstep,
            runtime: None,
            assets: &NO_ASSETS,
        }
    }

    pub fn with_runtime(mut self, runtime: &'a RuntimeState) -> Self {
        self.runtime = runtime.into();
        self.docstep = runtime.docstep_index;
        self
    }

    pub fn with_assets(mut self, assets: &'a dyn AssetResolver) -> Self {
        self.assets = assets;
        self
    }
}

/// Compile `doc` (and an optional runtime snapshot) into Render IR.
///
/// Pure read of both inputs; identical inputs produce an identical IR,
/// asset picks included.
pub fn render(doc: &Document, options: &RenderOptions) -> Result<RenderDocumentIR, RenderError> {
    let params = match options.runtime {
        Some(runtime) => runtime.params.clone(),
        None => doc
            .state
            .params
            .iter()
            .map(|p| (p.name.clone(), p.initial.clone()))
            .collect(),
    };

    let mut pass = RenderPass {
        doc,
        options,
        params,
        resolved_assets: RefCell::new(Vec::new()),
        slot_meta: IndexMap::new(),
    };

    let mut body = Vec::new();
    for (index, node) in doc.body.nodes.iter().enumerate() {
        if let Some(ir) = pass.render_node(node, "", index)? {
            body.push(ir);
        }
    }

    debug!(
        docstep = options.docstep,
        nodes = body.len(),
        slots = pass.slot_meta.len(),
        "render pass complete"
    );

    Ok(RenderDocumentIR {
        meta: doc.meta.clone(),
        seed: options.seed,
        time: options.time_ms,
        docstep: options.docstep,
        page_config: doc.page_config.clone(),
        body,
        assets: pass.resolved_assets.into_inner(),
        slot_meta: pass.slot_meta,
    })
}

struct RenderPass<'a> {
    doc: &'a Document,
    options: &'a RenderOptions<'a>,
    params: IndexMap<String, Value>,
    resolved_assets: RefCell<Vec<ResolvedAsset>>,
    slot_meta: IndexMap<String, SlotMeta>,
}

impl RenderPass<'_> {
    /// Render one node. `None` means the node resolved invisible.
    fn render_node(
        &mut self,
        node: &DocumentNode,
        parent_path: &str,
        sibling_index: usize,
    ) -> Result<Option<RenderNodeIR>, RenderError> {
        let node_id = if parent_path.is_empty() {
            format!("{}:{}:{}", node.kind, node.id, sibling_index)
        } else {
            format!("{parent_path}/{}:{}:{}", node.kind, node.id, sibling_index)
        };

        let mut props = IndexMap::new();
        for (name, prop) in &node.props {
            let value = match prop {
                PropValue::Literal { value } => value.clone(),
                PropValue::Dynamic { expr } => {
                    let scope = format!("{node_id}/{name}");
                    let host = RenderHost {
                        pass: self,
                        node_id: &node_id,
                        prop: name,
                        refresh: node.refresh,
                    };
                    let ctx = EvalContext {
                        params: &self.params,
                        seed: self.options.seed,
                        docstep: self.options.docstep,
                        time_ms: Some(self.options.time_ms),
                        cell: None,
                        scope: &scope,
                        host: &host,
                    };
                    eval(expr, &ctx)?
                }
            };
            props.insert(name.clone(), value);
        }

        // An invisible node drops out of the IR entirely.
        match props.get("visibleIf") {
            Some(Value::Bool(false)) => return Ok(None),
            Some(Value::Bool(true)) | None => {}
            Some(other) => {
                return Err(RenderError::VisibleIfNotBoolean {
                    node: node_id,
                    got: other.type_name(),
                })
            }
        }

        let mut children = Vec::new();
        for (index, child) in node.children.iter().enumerate() {
            if let Some(ir) = self.render_node(child, &node_id, index)? {
                children.push(ir);
            }
        }

        let grid = if node.kind == "grid" {
            self.resolve_grid(node, &props)
        } else {
            None
        };

        let ir = RenderNodeIR {
            node_id,
            kind: node.kind.clone(),
            id: node.id.clone(),
            props,
            children,
            refresh: node.refresh,
            slot: node.slot.clone(),
            grid,
        };

        if ir.kind == "slot" || ir.kind == "inline_slot" {
            self.slot_meta.insert(
                ir.node_id.clone(),
                SlotMeta {
                    value_hash: format!("{:016x}", hash_subtree(&ir)),
                },
            );
        }
        Ok(Some(ir))
    }

    /// Grid data comes from the runtime snapshot when one is supplied,
    /// otherwise from the static cell declarations.
    fn resolve_grid(
        &self,
        node: &DocumentNode,
        props: &IndexMap<String, Value>,
    ) -> Option<RenderGridData> {
        let name = match props.get("grid") {
            Some(Value::Str(s)) => s.as_str(),
            _ => node.id.as_str(),
        };

        let snapshot;
        let grid: &GridRuntimeState = match self.options.runtime.and_then(|r| r.grids.get(name)) {
            Some(grid) => grid,
            None => {
                snapshot = GridRuntimeState::from_decl(self.doc.grid(name)?);
                &snapshot
            }
        };

        let max = grid
            .cells
            .iter()
            .map(|c| c.dynamic)
            .fold(f64::NEG_INFINITY, f64::max);
        let cells = grid
            .cells
            .iter()
            .map(|cell| RenderCellData {
                id: cell.id.clone(),
                tags: cell.tags.clone(),
                content: cell.content.clone(),
                dynamic: cell.dynamic,
                density: cell.dynamic.clamp(0.0, 1.0),
                salience: if max > 0.0 { cell.dynamic / max } else { 0.0 },
            })
            .collect();

        Some(RenderGridData {
            rows: grid.rows,
            cols: grid.cols,
            cells,
        })
    }
}

/// Evaluation host wiring `ref(...)` and `assets.pick(...)` to the
/// document being rendered.
struct RenderHost<'a, 'p> {
    pass: &'p RenderPass<'a>,
    node_id: &'p str,
    prop: &'p str,
    refresh: Option<RefreshPolicy>,
}

impl EvalHost for RenderHost<'_, '_> {
    /// `ref("label")` resolves to the labeled node's literal `text`
    /// property, or its id when it has none.
    fn resolve_ref(&self, label: &str) -> Option<Value> {
        let node = find_labeled(&self.pass.doc.body.nodes, label)?;
        match node.props.get("text") {
            Some(PropValue::Literal {
                value: Value::Str(s),
            }) => Some(Value::Str(s.clone())),
            _ => Some(Value::Str(node.id.clone())),
        }
    }

    fn pick_asset(&self, args: &PickArgs) -> Option<Value> {
        // One stream per (seed, node, prop) site; docstep joins the
        // derivation only when the node re-resolves each docstep.
        let label = format!("assets/{}/{}", self.node_id, self.prop);
        let mut rng = RngStream::derive(self.pass.options.seed, &label);
        if self.refresh == Some(RefreshPolicy::OnDocstep) {
            rng = rng.substream(self.pass.options.docstep);
        }

        let picked = match &args.bank {
            Some(bank) => pick_from_bank(self.pass.doc, self.pass.options.assets, bank, &mut rng)?,
            None => pick_from_catalog(
                self.pass.doc,
                &args.tags,
                PickStrategy::Weighted,
                &mut rng,
            )?,
        };

        self.pass.resolved_assets.borrow_mut().push(ResolvedAsset {
            node_id: self.node_id.to_string(),
            prop: self.prop.to_string(),
            value: picked.clone(),
        });
        Some(Value::Str(picked))
    }
}

fn find_labeled<'n>(nodes: &'n [DocumentNode], label: &str) -> Option<&'n DocumentNode> {
    for node in nodes {
        if node.label() == Some(label) {
            return Some(node);
        }
        if let Some(found) = find_labeled(&node.children, label) {
            return Some(found);
        }
    }
    None
}

/// Stable content hash over a resolved subtree. Field order is fixed, so
/// two renders producing the same resolved values hash identically.
fn hash_subtree(node: &RenderNodeIR) -> u64 {
    let mut hasher = StableHasher::new();
    hash_node(node, &mut hasher);
    hasher.finish()
}

fn hash_node(node: &RenderNodeIR, hasher: &mut StableHasher) {
    hasher.write_str(&node.node_id);
    hasher.write_str(&node.kind);
    hasher.write_str(&node.id);
    for (name, value) in &node.props {
        hasher.write_str(name);
        hash_value(value, hasher);
    }
    for child in &node.children {
        hash_node(child, hasher);
    }
}

fn hash_value(value: &Value, hasher: &mut StableHasher) {
    match value {
        Value::Bool(b) => hasher.write_u64(*b as u64),
        Value::Int(v) => hasher.write_u64(*v as u64),
        Value::Float(v) => hasher.write_f64(*v),
        Value::Str(s) => hasher.write_str(s),
        Value::List(items) => {
            hasher.write_u64(items.len() as u64);
            for item in items {
                hash_value(item, hasher);
            }
        }
    }
}
