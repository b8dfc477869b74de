//! Agentic retrieval core over page-addressable regulatory documents:
//! the page store (C1), hybrid lexical/vector search (C2-C4), cross-page
//! table stitching (C5), annotation and reference resolution (C6), the
//! chapter/TOC navigator (C7), and the tool surface that exposes all of it
//! to reasoning agents (C8).

pub mod config;
pub mod embed;
pub mod error;
pub mod hybrid;
pub mod lexical;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod reference;
pub mod store;
pub mod tables;
pub mod toc;
pub mod tools;
pub mod vector;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use store::PageStore;
pub use tools::{PageContent, ToolSurface};
