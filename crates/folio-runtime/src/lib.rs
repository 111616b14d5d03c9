//! Runtime kernel for Folio documents.
//!
//! Owns the mutable side of the engine: parameter values and grid cell
//! state, evolved in discrete docsteps. [`run_docstep_once`] is the whole
//! public surface of evolution: it reads the previous [`RuntimeState`]
//! immutably and returns a new one, with every write buffered across an
//! evaluate/commit barrier so all expressions in a docstep observe the
//! same previous state.
//!
//! The expression evaluator lives here ([`eval`]) and is reused by the
//! render compiler for dynamic node properties.

pub mod error;
pub mod eval;

mod docstep;
mod state;

pub use docstep::{handle_event, run_docstep_once};
pub use error::RuntimeError;
pub use eval::{eval, eval_condition, CellScope, EvalContext, EvalHost, NoHost, PickArgs};
pub use state::{init_runtime_state, GridRuntimeState, RuntimeCellState, RuntimeState};
