//! Code generation for smithygen
//!
//! Drives end-to-end generation: directory scan → parse → symbol
//! projection → per-service writers, with typed override hooks and
//! policy-driven skip/abort semantics. The structured writer and the
//! endpoint-resolver generator live here too.

mod endpoint;
mod error;
mod lower;
mod pipeline;
mod service;
mod templates;
mod writer;

pub use endpoint::{generate_endpoint_module, Condition, Param, ParamType, Rule, RuleSet};
pub use error::{CodegenError, Result};
pub use lower::{Lowering, Protocol};
pub use pipeline::{Hooks, Pipeline, RunSummary, SmithyOptions, SmithyTask};
pub use service::generate_service;
pub use templates::render_readme;
pub use writer::{quoted, Document, EnumBuilder, FnBuilder, SourceWriter, StructBuilder};
