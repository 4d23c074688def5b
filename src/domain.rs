//! Domain models for requirement specifiers.
//!
//! This module contains the parsing model for requirement lines: package
//! names, versions, version specifiers, environment markers, and the linter
//! configuration.

/// Validated package name types.
pub mod package;
pub use package::PackageName;

/// Version parsing and ordering.
pub mod version;
pub use version::Version;

/// Version comparators and specifier sets.
pub mod specifier;
pub use specifier::{Comparator, SpecifierSet, VersionSpecifier};

/// Environment marker expressions.
pub mod marker;
pub use marker::{Marker, MarkerEnvironment};

/// Requirement specifier lines.
pub mod requirement;
pub use requirement::Requirement;

mod config;
pub use config::Config;
