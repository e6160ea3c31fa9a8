//! Graph translation engine.
//!
//! Converts a source dataflow graph (operations wired by named edges, plus a
//! library of body graphs for loops and branches) into a typed IR graph.
//! Operation types are mapped through a [`TranslatorRegistry`]; types without
//! a translator survive as framework nodes, and body graphs are translated
//! once per input signature and spliced in wherever they are referenced.

pub mod batch;
pub mod config;
pub mod core;
pub mod error;
pub mod ir;
pub mod session;
pub mod source;
pub mod translator;

pub use config::SessionConfig;
pub use error::{TranslateError, TranslateResult};
pub use ir::{IrGraph, IrModel, Output};
pub use session::TranslateSession;
pub use source::SourceGraph;
pub use translator::{NamedOutput, NodeContext, TranslatorRegistry};
