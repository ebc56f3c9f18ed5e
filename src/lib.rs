//! Layered IR and semantic graph engine for multi-language code
//! intelligence: structural IR generation, semantic layers, a
//! content-addressed IR cache, cross-file resolution, and dependency/
//! semantic graph indexes with impact analysis and scope expansion for
//! incremental rebuilds.

pub mod arena;
pub mod cache;
pub mod config;
pub mod depgraph;
pub mod error;
pub mod generator;
pub mod impact;
pub mod intern;
pub mod irdoc;
pub mod logging;
pub mod oracle;
pub mod orchestrator;
pub mod parsing;
pub mod resolver;
pub mod scope;
pub mod semantic;
pub mod semgraph;
pub mod source;
pub mod types;

pub use config::BuildConfig;
pub use error::BuildError;
pub use irdoc::IRDocument;
pub use orchestrator::{BuildReport, SnapshotHandle};
pub use types::{Edge, EdgeKind, Id, Node, NodeKind, Span};
