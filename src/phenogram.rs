//! Phenograms: per-character matrices of the syntax nodes enclosing each cell.
//!
//! `cells[line - 1][column]` lists every node whose range covers that
//! character, outermost first. Matrices can be resampled to a fixed grid and
//! projected to `{type, loc}` for transport.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::syntax::{self, NodeId, SourceLocation, SyntaxTree};

// ============ Sample Size ============

/// Target grid for [`NodeMatrix::resample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSize {
    pub columns: usize,
    pub rows: usize,
}

impl SampleSize {
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(AnalysisError::InvalidSampleSize { columns, rows });
        }
        Ok(Self { columns, rows })
    }
}

impl fmt::Display for SampleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

/// `"40x20"` -> 40 columns, 20 rows.
impl FromStr for SampleSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (columns, rows) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected <columns>x<rows>, got `{}`", s))?;
        let columns = columns
            .trim()
            .parse()
            .map_err(|e| format!("invalid column count `{}`: {}", columns, e))?;
        let rows = rows
            .trim()
            .parse()
            .map_err(|e| format!("invalid row count `{}`: {}", rows, e))?;
        SampleSize::new(columns, rows).map_err(|e| e.to_string())
    }
}

// ============ Matrix ============

pub type Cell = Vec<NodeId>;

#[derive(Debug, Clone)]
pub struct NodeMatrix<'t> {
    tree: &'t SyntaxTree,
    cells: Vec<Vec<Cell>>,
}

/// Node payload kept for transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransmissionNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub loc: SourceLocation,
}

pub type TransmissionMatrix = Vec<Vec<Vec<TransmissionNode>>>;

impl<'t> NodeMatrix<'t> {
    /// Matrix of every real node of `tree` (the synthetic `File` wrapper is left out).
    pub fn encode(tree: &'t SyntaxTree) -> Self {
        let nodes = tree.real_nodes();

        let columns = nodes
            .iter()
            .map(|&id| {
                let loc = tree.node(id).loc;
                (loc.start.column + 1).max(loc.end.column)
            })
            .max()
            .unwrap_or(0);
        let rows = nodes
            .iter()
            .map(|&id| {
                let loc = tree.node(id).loc;
                loc.start.line.max(loc.end.line)
            })
            .max()
            .unwrap_or(0);

        let mut cells = vec![vec![Cell::new(); columns]; rows];
        for &id in &nodes {
            let SourceLocation { start, end } = tree.node(id).loc;
            for line in start.line..=end.line {
                let from = if line == start.line { start.column } else { 0 };
                let to = if line == end.line { end.column } else { columns };
                let row = &mut cells[line - 1];
                for cell in row.iter_mut().take(to.min(columns)).skip(from) {
                    cell.push(id);
                }
            }
        }

        Self { tree, cells }
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn columns(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn cells(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    /// Nodes covering `cells[row][column]`, both 0-based.
    pub fn cell(&self, row: usize, column: usize) -> &[NodeId] {
        self.cells
            .get(row)
            .and_then(|line| line.get(column))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Nearest-index resampling to `size`.
    ///
    /// Columns always sample the nearest source column. When more rows are
    /// requested than exist, the extra rows are padded with empty cells
    /// instead of repeating source rows.
    pub fn resample(&self, size: SampleSize) -> Result<NodeMatrix<'t>> {
        let size = SampleSize::new(size.columns, size.rows)?;
        let source_rows = self.rows();
        let column_index = sample_indices(self.columns(), size.columns);
        let row_index = sample_indices(source_rows, size.rows);
        let pad_rows = size.rows > source_rows;

        let cells = (0..size.rows)
            .map(|i| {
                let source_row = if pad_rows {
                    self.cells.get(i)
                } else {
                    row_index.get(i).copied().flatten().and_then(|r| self.cells.get(r))
                };
                match source_row {
                    Some(line) => column_index
                        .iter()
                        .map(|&j| j.and_then(|j| line.get(j)).cloned().unwrap_or_default())
                        .collect(),
                    None => vec![Cell::new(); size.columns],
                }
            })
            .collect();

        Ok(NodeMatrix {
            tree: self.tree,
            cells,
        })
    }

    pub fn to_transmission(&self) -> TransmissionMatrix {
        self.cells
            .iter()
            .map(|line| {
                line.iter()
                    .map(|cell| {
                        cell.iter()
                            .map(|&id| {
                                let node = self.tree.node(id);
                                TransmissionNode {
                                    node_type: node.node_type.clone(),
                                    loc: node.loc,
                                }
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Source index for each of `target` outputs: `floor(scale * i + scale / 2)`.
fn sample_indices(source: usize, target: usize) -> Vec<Option<usize>> {
    if source == 0 {
        return vec![None; target];
    }
    let scale = source as f64 / target as f64;
    (0..target)
        .map(|i| {
            let index = (scale * i as f64 + scale * 0.5).floor() as usize;
            Some(index.min(source - 1))
        })
        .collect()
}

/// Parse `source`, build its matrix, optionally resample, and project for transport.
pub fn phenogram(source: &str, sample: Option<SampleSize>) -> Result<TransmissionMatrix> {
    let tree = syntax::parse(source)?;
    let matrix = NodeMatrix::encode(&tree);
    match sample {
        Some(size) => Ok(matrix.resample(size)?.to_transmission()),
        None => Ok(matrix.to_transmission()),
    }
}
