//! Runtime state: parameter values and grid cell arrays.

use crate::error::RuntimeError;
use folio_ast::{Document, GridDecl, ParamType, Value};
use indexmap::IndexMap;
use serde::Serialize;

/// Mutable document state at a docstep. Produced whole by
/// `init_runtime_state` / `run_docstep_once`, never mutated in place by
/// the kernel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    pub docstep_index: u64,
    /// Entropy root for seeded helpers in rule bodies.
    pub seed: u64,
    pub params: IndexMap<String, Value>,
    pub grids: IndexMap<String, GridRuntimeState>,
}

/// One grid's runtime cells, row-major, always exactly `rows * cols` long.
#[derive(Debug, Clone, Serialize)]
pub struct GridRuntimeState {
    pub rows: u32,
    pub cols: u32,
    pub cells: Vec<RuntimeCellState>,
}

impl GridRuntimeState {
    /// Materialize a grid declaration: exactly `rows * cols` cells,
    /// padded with blank `r{row}c{col}` cells or truncated.
    pub fn from_decl(grid: &GridDecl) -> Self {
        init_grid(grid)
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&RuntimeCellState> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(self.index_of(row, col))
    }

    /// Row-major index, in usize so `rows * cols` near `u32::MAX` cannot
    /// wrap.
    pub fn index_of(&self, row: u32, col: u32) -> usize {
        row as usize * self.cols as usize + col as usize
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeCellState {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub content: String,
    pub dynamic: f64,
}

/// Build the docstep-zero state from a document's declarations.
///
/// Grid cell lists are padded with blank `r{row}c{col}` cells or truncated
/// so every grid holds exactly `rows * cols` cells. Enum params must start
/// on a declared variant.
pub fn init_runtime_state(doc: &Document, seed: u64) -> Result<RuntimeState, RuntimeError> {
    let mut params = IndexMap::new();
    for param in &doc.state.params {
        let value = match (param.ty, &param.initial) {
            (ParamType::Int, Value::Int(v)) => Value::Int(*v),
            (ParamType::Float, v) => match v.as_f64() {
                Some(f) => Value::Float(f),
                None => {
                    return Err(RuntimeError::InvalidInitialValue {
                        param: param.name.clone(),
                        ty: "float",
                    })
                }
            },
            (ParamType::Bool, Value::Bool(v)) => Value::Bool(*v),
            (ParamType::String, Value::Str(v)) => Value::Str(v.clone()),
            (ParamType::Enum, Value::Str(v)) => {
                if !param.variants.iter().any(|variant| variant == v) {
                    return Err(RuntimeError::InvalidEnumValue {
                        param: param.name.clone(),
                        value: v.clone(),
                    });
                }
                Value::Str(v.clone())
            }
            (ty, _) => {
                return Err(RuntimeError::InvalidInitialValue {
                    param: param.name.clone(),
                    ty: match ty {
                        ParamType::Int => "int",
                        ParamType::Float => "float",
                        ParamType::Bool => "bool",
                        ParamType::String => "string",
                        ParamType::Enum => "enum",
                    },
                })
            }
        };
        params.insert(param.name.clone(), value);
    }

    let mut grids = IndexMap::new();
    for grid in &doc.grids {
        grids.insert(grid.name.clone(), init_grid(grid));
    }

    Ok(RuntimeState {
        docstep_index: 0,
        seed,
        params,
        grids,
    })
}

fn init_grid(grid: &GridDecl) -> GridRuntimeState {
    let rows = grid.rows.unwrap_or(1).max(1);
    let cols = grid
        .cols
        .unwrap_or_else(|| (grid.cells.len().max(1) as u32).div_ceil(rows))
        .max(1);
    let total = rows as usize * cols as usize;

    let mut cells = Vec::with_capacity(total);
    for decl in grid.cells.iter().take(total) {
        cells.push(RuntimeCellState {
            id: decl.id.clone(),
            tags: decl.tags.clone(),
            content: decl.content.clone().unwrap_or_default(),
            dynamic: decl.dynamic.unwrap_or(0.0),
        });
    }
    // Pad: declared cells fill row-major from the start, synthesized blank
    // cells take the remaining positions.
    for i in cells.len()..total {
        let row = i / cols as usize;
        let col = i % cols as usize;
        cells.push(RuntimeCellState {
            id: format!("r{row}c{col}"),
            tags: Vec::new(),
            content: String::new(),
            dynamic: 0.0,
        });
    }

    GridRuntimeState { rows, cols, cells }
}
