//! Report generation: hint aggregation and templated HTML output.
//!
//! ## Module Structure
//!
//! - `summary`: folds persisted hints into per-maintainer and per-package
//!   summaries and drives page rendering
//! - `templates`: the template-engine contract, the built-in mustache-subset
//!   engine and the `partial`/`block` inheritance lambdas

pub mod summary;
pub mod templates;

pub use summary::{DataSummary, HintEntry, PkgSummary, ReportGenerator};
pub use templates::{Context, CtxValue, SimpleEngine, TemplateEngine};
