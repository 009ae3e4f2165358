//! The ledger engine: row scanning and additive-formula mutation.
//!
//! Every operation parses the document fresh from bytes, mutates it in
//! memory, and serializes it back; nothing is cached across calls. The
//! value cell of a row is one of: empty, a legacy numeric or
//! currency-formatted string, the literal `0`, or an additive formula of
//! two-decimal terms. The formula is a deliberate audit trail, so it is
//! composed and split textually; the engine only does arithmetic when a
//! total has to be reported.

use crate::config::SheetSource;
use crate::ledger::grid::{column_index, Grid};
use crate::model::{Amount, Entry};
use crate::{Error, Result};
use anyhow::{anyhow, Context};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::warn;

/// Recognizes the numeric magnitude inside a legacy (pre-formula) value
/// cell, e.g. `£1,234.00` or `12.34`. Tuned to the known document layout;
/// kept in one place so it can be adjusted without touching the scan.
static LEGACY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:,\d{3})*(?:\.\d+)?").expect("legacy value pattern"));

/// Where to find categories and values inside the grid.
#[derive(Debug, Clone, Copy)]
struct Layout {
    name_col: usize,
    value_col: usize,
    start_row: u32,
    blank_run_limit: u32,
}

/// The result of removing the most recent addend from a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    /// The re-serialized document.
    pub bytes: Vec<u8>,
    /// The computed value before removal.
    pub old_value: String,
    /// The removed term, currency-formatted.
    pub removed_value: String,
    /// The computed value after removal.
    pub new_value: String,
}

/// Ledger operations over one configured source. Construction only
/// resolves the column letters; each operation opens the document from the
/// bytes it is given.
#[derive(Debug, Clone)]
pub struct Ledger {
    layout: Layout,
}

impl Ledger {
    pub fn new(source: &SheetSource) -> Result<Self> {
        Ok(Self {
            layout: Layout {
                name_col: column_index(&source.name_column)?,
                value_col: column_index(&source.value_column)?,
                start_row: source.start_row.max(1),
                blank_run_limit: source.blank_run_limit,
            },
        })
    }

    /// Scans the name column from the start row and returns every
    /// populated row with its computed value. A run of `blank_run_limit`
    /// consecutive blank name cells is the end-of-table signal; blank rows
    /// inside the table are skipped.
    pub fn list_entries(&self, bytes: &[u8]) -> Result<Vec<Entry>> {
        let grid = Grid::parse(bytes)?;
        let mut entries = Vec::new();
        let mut blank_run = 0;
        let mut row = self.layout.start_row;
        while blank_run < self.layout.blank_run_limit {
            let name = grid.cell(row, self.layout.name_col);
            if is_blank(name) {
                blank_run += 1;
                row += 1;
                continue;
            }
            blank_run = 0;
            let value = self.computed_value(&grid, row)?;
            entries.push(Entry::new(name, value));
            row += 1;
        }
        Ok(entries)
    }

    /// Appends `amount` to the row's additive formula. Three cases, in
    /// priority order: an existing formula gets `+amount`; a non-zero
    /// legacy value is repaired into `existing+amount`; an empty or zero
    /// cell receives the bare two-decimal literal, deferring formula form
    /// to the next addition so untouched legacy rows are never rewritten.
    /// Returns the re-serialized document and the new computed total.
    pub fn add_value(&self, bytes: &[u8], category: &str, amount: Amount) -> Result<(Vec<u8>, String)> {
        let mut grid = Grid::parse(bytes)?;
        let row = self.locate_row(&grid, category)?;
        let col = self.layout.value_col;
        let term = format!("{:.2}", amount.value());

        match grid.formula(row, col).map(str::to_string) {
            Some(formula) => grid.set_formula(row, col, &format!("{formula}+{term}")),
            None => match legacy_magnitude(grid.cell(row, col))? {
                Some(existing) => grid.set_formula(row, col, &format!("{existing}+{term}")),
                None => grid.set_cell(row, col, term),
            },
        }

        let total = self.computed_value(&grid, row)?;
        Ok((grid.to_bytes()?, total))
    }

    /// Returns the row's value. With `details` set the raw formula text is
    /// returned when one exists, so the user sees the individual addends;
    /// otherwise the computed value, with any currency symbol stripped in
    /// the details case so both paths read like a sum.
    pub fn read_value(&self, bytes: &[u8], category: &str, details: bool) -> Result<String> {
        let grid = Grid::parse(bytes)?;
        let row = self.locate_row(&grid, category)?;
        if details {
            if let Some(formula) = grid.formula(row, self.layout.value_col) {
                return Ok(formula.to_string());
            }
            return Ok(self.computed_value(&grid, row)?.replace('£', ""));
        }
        self.computed_value(&grid, row)
    }

    /// Removes the most recent addend from the row. With no formula, or a
    /// single-term formula, the entire value is the "last" term: the cell
    /// is zeroed and the new value reported as the zero-currency string.
    /// Otherwise the formula is split at its last `+`.
    pub fn remove_last(&self, bytes: &[u8], category: &str) -> Result<Removed> {
        let mut grid = Grid::parse(bytes)?;
        let row = self.locate_row(&grid, category)?;
        let col = self.layout.value_col;
        let old_value = self.computed_value(&grid, row)?;

        let formula = grid.formula(row, col).map(str::to_string);
        match formula.as_deref().and_then(|f| f.rsplit_once('+')) {
            Some((prefix, suffix)) => {
                let removed_value = format!("£{suffix}");
                grid.set_formula(row, col, prefix);
                let new_value = self.computed_value(&grid, row)?;
                Ok(Removed {
                    bytes: grid.to_bytes()?,
                    old_value,
                    removed_value,
                    new_value,
                })
            }
            None => {
                grid.set_cell(row, col, "0");
                Ok(Removed {
                    bytes: grid.to_bytes()?,
                    removed_value: old_value.clone(),
                    old_value,
                    new_value: "£0".to_string(),
                })
            }
        }
    }

    /// Scans the name column for `category`, comparing normalized
    /// (lowercased, space-stripped) names. The same blank-run rule as
    /// `list_entries` terminates the scan.
    fn locate_row(&self, grid: &Grid, category: &str) -> Result<u32> {
        let target = normalize(category);
        let mut blank_run = 0;
        let mut row = self.layout.start_row;
        while blank_run < self.layout.blank_run_limit {
            let name = normalize(grid.cell(row, self.layout.name_col));
            if name == target {
                return Ok(row);
            }
            if name.is_empty() {
                blank_run += 1;
            } else {
                blank_run = 0;
            }
            row += 1;
        }
        warn!(category, "Category not found, quitting");
        Err(Error::CategoryNotFound(category.to_string()))
    }

    /// The value of a cell as shown to the user: the sum of the formula's
    /// terms formatted to two decimals, or the raw cell text when there is
    /// no formula.
    fn computed_value(&self, grid: &Grid, row: u32) -> Result<String> {
        match grid.formula(row, self.layout.value_col) {
            Some(formula) => Ok(format!("{:.2}", sum_terms(formula)?)),
            None => Ok(grid.cell(row, self.layout.value_col).to_string()),
        }
    }
}

fn is_blank(name: &str) -> bool {
    name.chars().all(|c| c == ' ')
}

fn normalize(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

fn sum_terms(formula: &str) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for term in formula.split('+') {
        let term = term.trim();
        let parsed = Decimal::from_str(term)
            .with_context(|| format!("Invalid formula term '{term}'"))?;
        total += parsed;
    }
    Ok(total)
}

/// Extracts the numeric magnitude from a legacy value cell, discarding the
/// currency symbol and separators. Empty and zero cells yield `None`; a
/// populated cell with no recognizable number is an error rather than a
/// corrupted formula.
fn legacy_magnitude(text: &str) -> Result<Option<String>> {
    let norm = text.replace('£', "").replace(' ', "");
    if norm.is_empty() || norm == "0" {
        return Ok(None);
    }
    let found = LEGACY_VALUE
        .find(&norm)
        .ok_or_else(|| anyhow!("Cell value '{text}' is not numeric"))?;
    Ok(Some(found.as_str().replace(',', "")))
}
