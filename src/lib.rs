//! Linting for pinned dependency manifests and documentation outlines.
//!
//! Manifests are line-oriented requirement files; outlines are toctree
//! directives embedded in reStructuredText sources.

pub mod domain;
pub use domain::{Config, Marker, MarkerEnvironment, PackageName, Requirement, Version};

/// File formats and the documentation corpus.
pub mod storage;
pub use storage::{Corpus, ManifestFile, ManifestSet, Toctree};

pub mod diagnostics;
pub use diagnostics::{Diagnostic, Severity};
