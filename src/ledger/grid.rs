//! The in-memory document: a grid of cells parsed from CSV bytes.
//!
//! The remote document collaborator only moves opaque bytes; this module
//! gives those bytes shape. A cell is plain text unless it starts with
//! `=`, in which case the remainder is a formula. Rows and columns are
//! addressed the way the configuration is written: 1-based rows, column
//! letters ("A", "B", ... "AA").

use crate::Result;
use anyhow::{anyhow, Context};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Parses a document from CSV bytes. Ragged rows are accepted; missing
    /// cells read as empty.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("Failed to read ledger document")?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { rows })
    }

    /// Serializes the document back to CSV bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in &self.rows {
            writer
                .write_record(row)
                .context("Failed to write ledger document row")?;
        }
        writer
            .into_inner()
            .context("Failed to serialize ledger document")
            .map_err(Into::into)
    }

    /// Returns the text of a cell, empty if the cell does not exist.
    /// `row` is 1-based.
    pub fn cell(&self, row: u32, col: usize) -> &str {
        self.rows
            .get(row as usize - 1)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Returns the formula text of a cell (without the leading `=`), or
    /// `None` when the cell holds a plain value.
    pub fn formula(&self, row: u32, col: usize) -> Option<&str> {
        self.cell(row, col).strip_prefix('=')
    }

    /// Sets a cell to plain text, growing the grid as needed.
    pub fn set_cell(&mut self, row: u32, col: usize, text: impl Into<String>) {
        let row = row as usize - 1;
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, String::new);
        }
        cells[col] = text.into();
    }

    /// Sets a cell to a formula (stored with a leading `=`).
    pub fn set_formula(&mut self, row: u32, col: usize, formula: &str) {
        self.set_cell(row, col, format!("={formula}"));
    }
}

/// Converts a spreadsheet column letter ("A", "B", ..., "AA") to a
/// zero-based index.
pub fn column_index(letters: &str) -> Result<usize> {
    if letters.is_empty() {
        return Err(anyhow!("Column letter must not be empty").into());
    }
    let mut index: usize = 0;
    for c in letters.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return Err(anyhow!("Invalid column letter '{letters}'").into());
        }
        index = index * 26 + (c as usize - 'A' as usize + 1);
    }
    Ok(index - 1)
}
