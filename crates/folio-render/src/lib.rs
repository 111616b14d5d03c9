//! Render IR compiler.
//!
//! [`render`] compiles a document plus an optional runtime snapshot into
//! [`RenderDocumentIR`]: a fully resolved tree with path-derived stable
//! node ids, resolved dynamic properties and asset bindings, grid cell
//! data, and per-slot content hashes for incremental re-render. The pass
//! is a pure read of both inputs.

mod assets;
mod compile;
mod error;
mod ir;

pub use assets::{AssetResolver, NoAssets};
pub use compile::{render, RenderOptions};
pub use error::RenderError;
pub use ir::{
    RenderCellData, RenderDocumentIR, RenderGridData, RenderNodeIR, ResolvedAsset, SlotMeta,
};
