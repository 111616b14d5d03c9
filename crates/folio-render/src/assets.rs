//! Asset catalog resolution for `assets.pick(...)`.
//!
//! Bank file enumeration is the one place I/O can happen during a render,
//! so it is delegated to an injectable [`AssetResolver`]; the compiler
//! itself stays a pure function of its inputs.

use folio_ast::{AssetEntry, Document, PickStrategy};
use folio_foundation::rng::RngStream;

/// Host-side file enumeration for asset banks. Expected synchronous and
/// side-effect-free from the compiler's point of view; caching is the
/// resolver's business.
pub trait AssetResolver {
    /// Files matching a bank's glob, in a stable order.
    fn enumerate(&self, glob: &str) -> Vec<String>;
}

/// Resolver for documents without banks (or tests): every glob is empty.
pub struct NoAssets;

impl AssetResolver for NoAssets {
    fn enumerate(&self, _glob: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Pick from a named bank using its declared strategy. Weighted banks
/// have no per-file weights, so both strategies pick uniformly; the
/// distinction matters for catalog entries.
pub fn pick_from_bank(
    doc: &Document,
    resolver: &dyn AssetResolver,
    bank: &str,
    rng: &mut RngStream,
) -> Option<String> {
    let bank = doc.assets.banks.iter().find(|b| b.name == bank)?;
    let files = resolver.enumerate(&bank.glob);
    let index = rng.pick_index(files.len())?;
    files.into_iter().nth(index)
}

/// Pick from catalog entries (assets and materials) carrying every
/// requested tag.
pub fn pick_from_catalog(
    doc: &Document,
    tags: &[String],
    strategy: PickStrategy,
    rng: &mut RngStream,
) -> Option<String> {
    let candidates: Vec<&AssetEntry> = doc
        .assets
        .entries
        .iter()
        .chain(doc.materials.iter())
        .filter(|entry| tags.iter().all(|t| entry.tags.contains(t)))
        .collect();

    let index = match strategy {
        PickStrategy::Uniform => rng.pick_index(candidates.len())?,
        PickStrategy::Weighted => {
            let weights: Vec<f64> = candidates
                .iter()
                .map(|entry| entry.weight.unwrap_or(1.0))
                .collect();
            rng.pick_weighted(&weights)?
        }
    };
    let entry = candidates[index];
    Some(entry.file.clone().unwrap_or_else(|| entry.name.clone()))
}
