//! Python bindings.
//!
//! Values cross the boundary as JSON strings so the Python side can keep
//! using its own classification models.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::sync::Arc;

use crate::compiler::RoadmapCompiler;
use crate::config::CompilerConfig;
use crate::library::RuleLibrary;
use crate::models::Classification;

fn load_library(library_json: Option<&str>) -> PyResult<RuleLibrary> {
    let library = match library_json {
        Some(json) => RuleLibrary::from_json(json),
        None => RuleLibrary::embedded(),
    };
    library.map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Compile a testing roadmap.
///
/// # Arguments
/// * `classification_json` - Classification record as JSON
/// * `library_json` - Rule library JSON; the embedded catalog when omitted
///
/// # Returns
/// * The roadmap as a JSON string
///
/// # Raises
/// * ValueError if either document is malformed or the library fails validation
#[pyfunction]
#[pyo3(signature = (classification_json, library_json=None))]
fn compile_roadmap(classification_json: &str, library_json: Option<&str>) -> PyResult<String> {
    let classification: Classification = serde_json::from_str(classification_json)
        .map_err(|e| PyValueError::new_err(format!("invalid classification: {e}")))?;
    let compiler = RoadmapCompiler::new(Arc::new(load_library(library_json)?));
    let result = compiler.compile(&classification);
    serde_json::to_string(&result).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Validate a rule library, returning its non-fatal warnings.
///
/// # Raises
/// * ValueError on any fatal integrity problem
#[pyfunction]
fn validate_rule_library(library_json: &str) -> PyResult<Vec<String>> {
    let library = load_library(Some(library_json))?;
    Ok(library.warnings().iter().map(ToString::to_string).collect())
}

/// The biocompat_roadmap Python module. Logging follows `ROADMAP_VERBOSITY`.
#[pymodule]
fn biocompat_roadmap(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let config = CompilerConfig::from_env().map_err(|e| PyValueError::new_err(e.to_string()))?;
    config.init_logging();
    m.add_function(wrap_pyfunction!(compile_roadmap, m)?)?;
    m.add_function(wrap_pyfunction!(validate_rule_library, m)?)?;
    Ok(())
}
