/// Line-oriented manifest parsing.
pub mod manifest;
pub use manifest::{LineKind, ManifestFile, ManifestLine};

/// Recursive manifest loading and linting.
pub mod loader;
pub use loader::{ManifestSet, Role, SourcedRequirement};

/// Table-of-contents directive extraction.
pub mod toctree;
pub use toctree::{TocEntry, Toctree};

/// The documentation corpus and its reference graph.
pub mod corpus;
pub use corpus::{Corpus, Document, OutlineNode};
