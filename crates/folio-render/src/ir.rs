//! Render IR data model.
//!
//! The IR is the engine's output contract: a fully resolved, serializable
//! tree that arbitrary renderers (HTML layout, PDF typesetting, viewers)
//! consume as opaque data. Node ids are path-derived and stable across
//! re-renders of the same structural position, which is what lets an
//! external diff layer correlate nodes between two snapshots.

use folio_ast::node::{RefreshPolicy, SlotConfig};
use folio_ast::{PageConfig, Value};
use indexmap::IndexMap;
use serde::Serialize;

/// A complete rendered document at one (seed, time, docstep) triple.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDocumentIR {
    pub meta: IndexMap<String, String>,
    pub seed: u64,
    /// Milliseconds since load the render was taken at.
    pub time: f64,
    pub docstep: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_config: Option<PageConfig>,
    pub body: Vec<RenderNodeIR>,
    /// Asset bindings resolved during this render, in resolution order.
    pub assets: Vec<ResolvedAsset>,
    /// Per-slot content hashes, keyed by node id. A viewer re-renders
    /// only the slots whose hash changed between two IRs.
    pub slot_meta: IndexMap<String, SlotMeta>,
}

/// One node of the rendered tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNodeIR {
    /// Path-derived id: ancestor `kind:id:siblingIndex` segments joined
    /// with `/`.
    pub node_id: String,
    pub kind: String,
    pub id: String,
    /// Fully resolved properties; dynamic expressions are gone.
    pub props: IndexMap<String, Value>,
    pub children: Vec<RenderNodeIR>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<SlotConfig>,
    /// Resolved grid data; present only on grid nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<RenderGridData>,
}

/// Change-detection metadata for a slot node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMeta {
    /// FNV-1a hash over the slot's resolved subtree, as 16 hex digits.
    pub value_hash: String,
}

/// An asset binding resolved during the render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAsset {
    /// Node id of the node whose property resolved the asset.
    pub node_id: String,
    pub prop: String,
    /// The resolved file path (or asset name when the entry has no file).
    pub value: String,
}

/// Resolved cells for a grid node.
#[derive(Debug, Clone, Serialize)]
pub struct RenderGridData {
    pub rows: u32,
    pub cols: u32,
    /// Row-major, exactly `rows * cols` entries.
    pub cells: Vec<RenderCellData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderCellData {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub content: String,
    pub dynamic: f64,
    /// `dynamic` clamped onto [0, 1]; renderers map it to opacity-like
    /// channels without range checks.
    pub density: f64,
    /// `dynamic` relative to the grid's maximum (0 when the grid is flat).
    pub salience: f64,
}
