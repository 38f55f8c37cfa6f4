//! Regulatory testing-roadmap compiler for medical devices.
//!
//! Given a device classification, the compiler selects the applicable test
//! obligations from a versioned rule library, resolves which ones existing
//! material data may waive, orders them by prerequisite, and reports the
//! critical path, parallel groups and cost/schedule totals.
//!
//! ```no_run
//! use biocompat_roadmap::{Classification, RoadmapCompiler};
//!
//! let compiler = RoadmapCompiler::embedded()?;
//! let classification: Classification = serde_json::from_str(r#"{
//!     "regulatory_pathway": "510k",
//!     "product_profile": {"contact_category": "surface", "intended_use": "wound dressing"}
//! }"#)?;
//! let roadmap = compiler.compile(&classification);
//! println!("{:?}", roadmap.critical_path);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compiler;
pub mod config;
pub mod contact;
pub mod flags;
pub mod graph;
pub mod grouping;
pub mod library;
pub mod logging;
pub mod models;
pub mod narrative;
mod node_index;
pub mod nodes;
pub mod rollup;
pub mod selection;
pub mod variant;
pub mod waiver;

#[cfg(feature = "python")]
mod python;

pub use compiler::{RoadmapCompiler, RoadmapResult, VariantOutcome};
pub use config::{CompilerConfig, ConfigError};
pub use contact::{resolve_slots, ContactProfile, MatrixSlot};
pub use flags::DeviceFlags;
pub use graph::{CriticalPath, DependencyGraph, GraphError};
pub use library::{
    CostEstimate, EmbeddedSource, FileSource, JsonSource, LibraryError, LibraryWarning, MatrixKey,
    RuleLibrary, RuleSource, TestSpec, WaiverToken, WeekEstimate,
};
pub use models::{
    Classification, ContactCategory, ContactDuration, LeadCenter, MechanismOfAction,
    ProductCategory, ProductProfile, RegulatoryPathway,
};
pub use narrative::{NarrativeError, NarrativeGenerator, NarrativeRequest};
pub use nodes::TestNode;
pub use rollup::Rollup;
pub use selection::{Selection, Track};
pub use variant::{RoadmapDiff, Savings};
pub use waiver::WaiverSet;
