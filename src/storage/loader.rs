//! Recursive manifest loading.
//!
//! A manifest composes others through `-r`/`-c` directives. Loading
//! resolves those includes depth-first, relative to the including file.
//! Missing includes and include cycles are reported as diagnostics rather
//! than aborting the walk; only an unreadable root file is a hard error.

use std::{
    collections::{BTreeMap, HashSet},
    io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    diagnostics::Diagnostic,
    domain::{Config, Requirement},
    storage::manifest::{LineKind, ManifestFile},
};

/// Whether a file was reached as a manifest or a constraints file.
///
/// Constraints files legitimately re-list names pinned elsewhere, so the
/// duplicate and unpinned checks skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A manifest (the root file, or reached via `-r`).
    Manifest,
    /// A constraints file (reached via `-c`).
    Constraint,
}

/// A root manifest plus everything it includes, in depth-first order.
#[derive(Debug)]
pub struct ManifestSet {
    files: Vec<(Role, ManifestFile)>,
    load_diagnostics: Vec<Diagnostic>,
}

/// A requirement with the file and line it came from.
#[derive(Debug, Clone, Copy)]
pub struct SourcedRequirement<'a> {
    /// The file the requirement was read from.
    pub path: &'a Path,
    /// One-based line number.
    pub line: usize,
    /// The parsed requirement.
    pub requirement: &'a Requirement,
}

impl ManifestSet {
    /// Loads `root` and, recursively, everything it includes.
    ///
    /// # Errors
    ///
    /// Returns an error when the root file cannot be read. Problems in
    /// included files become diagnostics, reported by [`Self::lint`].
    pub fn load(root: &Path) -> io::Result<Self> {
        let mut loader = Loader {
            files: Vec::new(),
            load_diagnostics: Vec::new(),
            stack: Vec::new(),
            seen: HashSet::new(),
        };
        loader.load_file(root, Role::Manifest)?;
        Ok(Self {
            files: loader.files,
            load_diagnostics: loader.load_diagnostics,
        })
    }

    /// Iterates over the loaded files in depth-first order.
    pub fn files(&self) -> impl Iterator<Item = &ManifestFile> {
        self.files.iter().map(|(_, file)| file)
    }

    /// Iterates over every requirement in manifest-role files, with its
    /// source location.
    pub fn requirements(&self) -> impl Iterator<Item = SourcedRequirement<'_>> {
        self.files
            .iter()
            .filter(|(role, _)| *role == Role::Manifest)
            .flat_map(|(_, file)| {
                file.requirements().map(|(line, requirement)| SourcedRequirement {
                    path: file.path(),
                    line,
                    requirement,
                })
            })
    }

    /// Runs the manifest checks and returns every finding.
    ///
    /// Checks: load problems (missing includes, include cycles), per-line
    /// syntax errors, unpinned requirements (unless allowed by config), and
    /// the same package listed twice under the same marker.
    #[must_use]
    pub fn lint(&self, config: &Config) -> Vec<Diagnostic> {
        let mut diagnostics = self.load_diagnostics.clone();

        for (role, file) in &self.files {
            for line in file.lines() {
                match &line.kind {
                    LineKind::Invalid(error) => {
                        diagnostics.push(
                            Diagnostic::error(
                                file.path().to_path_buf(),
                                "manifest/syntax",
                                error.to_string(),
                            )
                            .at_line(line.number),
                        );
                    }
                    LineKind::Requirement(req)
                        if *role == Role::Manifest
                            && !config.allow_unpinned
                            && !req.is_pinned() =>
                    {
                        diagnostics.push(
                            Diagnostic::warning(
                                file.path().to_path_buf(),
                                "manifest/unpinned",
                                format!(
                                    "'{}' is not pinned to an exact version",
                                    req.name()
                                ),
                            )
                            .at_line(line.number),
                        );
                    }
                    _ => {}
                }
            }
        }

        diagnostics.extend(self.duplicate_diagnostics());
        diagnostics
    }

    /// The same package listed twice under the same marker is almost always
    /// a merge artefact.
    fn duplicate_diagnostics(&self) -> Vec<Diagnostic> {
        let mut first_seen: BTreeMap<(String, String), (&Path, usize)> = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for entry in self.requirements() {
            let marker = entry
                .requirement
                .marker()
                .map(ToString::to_string)
                .unwrap_or_default();
            let key = (entry.requirement.name().normalised().to_string(), marker);

            match first_seen.get(&key) {
                Some((path, line)) => {
                    diagnostics.push(
                        Diagnostic::warning(
                            entry.path.to_path_buf(),
                            "manifest/duplicate",
                            format!(
                                "'{}' already listed at {}:{line}",
                                entry.requirement.name(),
                                path.display(),
                            ),
                        )
                        .at_line(entry.line),
                    );
                }
                None => {
                    first_seen.insert(key, (entry.path, entry.line));
                }
            }
        }

        diagnostics
    }
}

struct Loader {
    files: Vec<(Role, ManifestFile)>,
    load_diagnostics: Vec<Diagnostic>,
    stack: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl Loader {
    fn load_file(&mut self, path: &Path, role: Role) -> io::Result<()> {
        debug!(path = %path.display(), "loading manifest");

        let file = ManifestFile::read(path)?;
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        self.stack.push(canonical.clone());
        self.seen.insert(canonical);

        let includes: Vec<(usize, PathBuf, Role)> = file
            .lines()
            .iter()
            .filter_map(|line| match &line.kind {
                LineKind::Include(target) => Some((line.number, target.clone(), role)),
                LineKind::Constraint(target) => {
                    Some((line.number, target.clone(), Role::Constraint))
                }
                _ => None,
            })
            .collect();

        let base = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
        let source = file.path().to_path_buf();
        self.files.push((role, file));

        for (line, target, target_role) in includes {
            let resolved = base.join(&target);
            self.include(&source, line, &resolved, target_role);
        }

        self.stack.pop();
        Ok(())
    }

    fn include(&mut self, source: &Path, line: usize, target: &Path, role: Role) {
        let canonical = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());

        if self.stack.contains(&canonical) {
            let mut chain: Vec<String> = self
                .stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(canonical.display().to_string());
            self.load_diagnostics.push(
                Diagnostic::error(
                    source.to_path_buf(),
                    "manifest/include-cycle",
                    format!("include cycle: {}", chain.join(" -> ")),
                )
                .at_line(line),
            );
            return;
        }

        // Diamond includes are tolerated but only loaded once.
        if self.seen.contains(&canonical) {
            debug!(path = %target.display(), "skipping already-loaded include");
            return;
        }

        if let Err(error) = self.load_file(target, role) {
            self.load_diagnostics.push(
                Diagnostic::error(
                    source.to_path_buf(),
                    "manifest/missing-include",
                    format!("cannot read included file '{}': {error}", target.display()),
                )
                .at_line(line),
            );
        }
    }
}
