//! `asset-recon`: assessment results reconciliation engine.
//!
//! Pure engine crate: receives pre-extracted source sheets, returns the
//! school aggregate plus a data-quality report. No filesystem access.

pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fidelity;
pub mod groups;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod skills;
pub mod stats;
pub mod validate;

pub use config::ReconConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Severity};
pub use engine::run;
pub use error::ReconError;
pub use matcher::NameOverrides;
pub use model::{
    ClassReport, ReconInput, ReconResult, ResponseRow, ResponseSheet, SchoolAggregate, SkillRow,
    SkillSheet, StudentResult, TotalsRow, TotalsSheet,
};
