//! Structural analyses of JavaScript functions.
//!
//! The functions in this module are the entry points a host (the `codeshape`
//! CLI, or any transport layered on top) calls with raw source text. Each one
//! parses, runs one analysis, and returns plain serializable data.
//!
//! ## Layout
//!
//! ```text
//! src/
//! ├── lib.rs        - boundary operations (this file)
//! ├── main.rs       - codeshape CLI
//! ├── error.rs      - AnalysisError
//! ├── syntax/       - tree-sitter parsing lowered to Babel-style trees
//! ├── ast/          - functions, binding patterns, normalization, identifier trees
//! ├── lifecycle.rs  - node nesting trees
//! ├── phenogram.rs  - per-character node matrices
//! └── var_flow/     - per-character color blending
//! ```

pub mod ast;
pub mod error;
pub mod lifecycle;
pub mod phenogram;
pub mod syntax;
pub mod var_flow;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

pub use error::{AnalysisError, Result};
pub use lifecycle::LifecycleNode;
pub use phenogram::{SampleSize, TransmissionMatrix};
pub use syntax::EditorRange;
pub use var_flow::{Mixer, RangeClassColor};

use ast::{SourceFile, Summary, TreeFilter};

// ============ Result Types ============

/// Rendered functions of a file in their three views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionList {
    pub functions: Vec<String>,
    pub available: Vec<String>,
    pub normalized: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarList {
    /// Declared names of the function, rest names prefixed with `...`.
    pub var_list: Vec<String>,
    /// Occurrence ranges per declared name, top to bottom and right to left.
    pub loc_list: IndexMap<String, Vec<EditorRange>>,
}

// ============ Boundary Operations ============

fn logged<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        warn!(operation, error = %err, "analysis failed");
    }
    result
}

/// Every function in `source`, the available ones, and their normalized forms.
pub fn function_list(source: &str) -> Result<FunctionList> {
    debug!(bytes = source.len(), "function_list");
    logged("function_list", build_function_list(source))
}

fn build_function_list(source: &str) -> Result<FunctionList> {
    let file = SourceFile::parse(source)?;
    let functions = file.functions()?;

    let mut available = Vec::new();
    let mut normalized = Vec::new();
    for function in &functions {
        if function.is_available()? {
            available.push(function.render().to_string());
        }
        normalized.push(function.normalized()?.render().to_string());
    }

    Ok(FunctionList {
        functions: functions.iter().map(|f| f.render().to_string()).collect(),
        available,
        normalized,
    })
}

/// Declared names and their sorted occurrences in the first normalized function.
pub fn var_list(source: &str) -> Result<VarList> {
    debug!(bytes = source.len(), "var_list");
    logged("var_list", build_var_list(source))
}

fn build_var_list(source: &str) -> Result<VarList> {
    let file = SourceFile::parse(source)?;
    let first = file
        .functions()?
        .into_iter()
        .next()
        .ok_or(AnalysisError::NoFunction)?;
    let function = first.normalized()?;
    let bindings = function.bindings()?;
    let var_list = bindings.declaration_names();
    let loc_list = bindings.occurrences_by_name(&var_list, true);
    Ok(VarList { var_list, loc_list })
}

pub fn lifecycle_data(source: &str) -> Result<LifecycleNode> {
    debug!(bytes = source.len(), "lifecycle_data");
    logged("lifecycle_data", lifecycle::lifecycle_data(source))
}

/// Phenogram of `source` in transport form, resampled when `sample` is given.
pub fn phenogram(source: &str, sample: Option<SampleSize>) -> Result<TransmissionMatrix> {
    debug!(bytes = source.len(), sample = ?sample, "phenogram");
    logged("phenogram", phenogram::phenogram(source, sample))
}

/// [`phenogram`] of several sources, computed in parallel; output order follows input order.
pub fn multi_phenogram<S>(sources: &[S], sample: Option<SampleSize>) -> Result<Vec<TransmissionMatrix>>
where
    S: AsRef<str> + Sync,
{
    debug!(count = sources.len(), sample = ?sample, "multi_phenogram");
    let result = sources
        .par_iter()
        .map(|source| phenogram::phenogram(source.as_ref(), sample))
        .collect::<Result<Vec<_>>>();
    logged("multi_phenogram", result)
}

/// Var-flow ranges of `source`, `overrides` laid over the default palette.
pub fn heat_map(
    source: &str,
    mixer: Mixer,
    overrides: &IndexMap<String, String>,
) -> Result<Vec<RangeClassColor>> {
    debug!(bytes = source.len(), %mixer, overrides = overrides.len(), "heat_map");
    logged("heat_map", var_flow::colorize(source, mixer, overrides))
}

/// Identifier names at the leaves of the merged identifier tree.
pub fn identifier_tree(source: &str, filter: &TreeFilter) -> Result<Summary<String>> {
    debug!(bytes = source.len(), "identifier_tree");
    let result = syntax::parse(source).map(|tree| ast::IdentifierTree::build(&tree, filter).names());
    logged("identifier_tree", result)
}
