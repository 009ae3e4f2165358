mod engine;
mod grid;

pub use engine::{Ledger, Removed};
pub use grid::{column_index, Grid};
