use crate::types::NdArray;
use derive_more::From;
use serde::{Deserialize, Serialize};

/// A single tabular cell: plain scalars only. Anything richer than these
/// cannot live in a column and routes a table to the opaque fallback.
#[derive(From, PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum Cell {
    #[from(ignore)]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Str(s.to_string())
    }
}

/// One column of a [`Series`] or [`Frame`].
///
/// `Numeric` is a dense 1-D buffer with a fixed dtype; `Mixed` holds
/// arbitrary cells, possibly with nulls. The columnar codec reads a dense
/// uniformly-numeric column back as `Numeric` even when it was written
/// from `Mixed` cells; only values, not the representation, are promised
/// to round-trip for such columns.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum Column {
    Numeric(NdArray),
    Mixed(Vec<Cell>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(arr) => arr.len(),
            Column::Mixed(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A labeled 1-D column: index labels, cell values, and an optional name.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct Series {
    pub name: Option<String>,
    pub index: Vec<Cell>,
    pub values: Column,
}

/// A row-indexed table of named columns, kept in insertion order.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct Frame {
    pub index: Vec<Cell>,
    pub columns: Vec<(String, Column)>,
}

impl Frame {
    /// True when the labels are the defaults a bare numeric buffer decodes
    /// to: index `0..n`, column names `"0".."k"`. Only such frames may take
    /// the label-less numeric wire path.
    pub(crate) fn has_default_labels(&self) -> bool {
        let index_ok = self
            .index
            .iter()
            .enumerate()
            .all(|(i, cell)| matches!(cell, Cell::Int(v) if *v == i as i64));
        let columns_ok = self
            .columns
            .iter()
            .enumerate()
            .all(|(i, (name, _))| *name == i.to_string());
        index_ok && columns_ok
    }

    pub(crate) fn default_index(rows: usize) -> Vec<Cell> {
        (0..rows).map(|i| Cell::Int(i as i64)).collect()
    }
}
