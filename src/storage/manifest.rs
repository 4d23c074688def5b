//! Line-oriented parsing for dependency manifests.
//!
//! The format is the one consumed by the external package-installation
//! tool: one requirement per line, `#` comments, blank lines, backslash
//! continuations, environment markers after `;`, and include directives
//! (`-r other-file.txt`) for composing multiple manifest files.
//!
//! Parsing is total: a malformed line becomes [`LineKind::Invalid`] rather
//! than aborting the file, so a single manifest read reports every problem
//! it contains.

use std::{
    io,
    path::{Path, PathBuf},
};

use crate::domain::{requirement, Requirement};

/// A parsed manifest file.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
    lines: Vec<ManifestLine>,
}

/// One significant (non-blank, non-comment) logical line.
///
/// A logical line may span several physical lines via backslash
/// continuations; `number` is the first physical line.
#[derive(Debug, Clone)]
pub struct ManifestLine {
    /// One-based number of the first physical line.
    pub number: usize,
    /// The logical line as written, comments stripped.
    pub raw: String,
    /// What the line turned out to be.
    pub kind: LineKind,
}

/// Classification of a manifest line.
#[derive(Debug, Clone)]
pub enum LineKind {
    /// A requirement specifier.
    Requirement(Requirement),
    /// `-r FILE` / `--requirement FILE`: include another manifest.
    Include(PathBuf),
    /// `-c FILE` / `--constraint FILE`: include a constraints file.
    Constraint(PathBuf),
    /// `-e TARGET` / `--editable TARGET`: an editable install target,
    /// passed through unparsed.
    Editable(String),
    /// Any other `-`/`--` option line, passed through to the consuming
    /// tool unchecked.
    GlobalOption(String),
    /// A line that failed to parse.
    Invalid(LineError),
}

/// Why a line failed to parse.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LineError {
    /// The line looked like a requirement but was not one.
    #[error(transparent)]
    Requirement(#[from] requirement::Error),

    /// An option that needs a value had none.
    #[error("Option '{0}' requires a value")]
    MissingValue(String),
}

impl ManifestFile {
    /// Reads and parses the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the file cannot be read; malformed
    /// content is captured per line.
    pub fn read(path: &Path) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(path.to_path_buf(), &content))
    }

    /// Parses manifest content.
    #[must_use]
    pub fn parse(path: PathBuf, content: &str) -> Self {
        let mut lines = Vec::new();

        let mut pending = String::new();
        let mut pending_start = 0usize;

        for (index, physical) in content.lines().enumerate() {
            let stripped = strip_comment(physical);

            let continued = stripped.trim_end().ends_with('\\');
            let fragment = if continued {
                stripped.trim_end().trim_end_matches('\\')
            } else {
                stripped
            };

            if pending.is_empty() {
                pending_start = index + 1;
            }
            pending.push_str(fragment);

            if continued {
                continue;
            }

            let logical = pending.trim().to_string();
            pending.clear();

            if logical.is_empty() {
                continue;
            }

            lines.push(ManifestLine {
                number: pending_start,
                kind: classify(&logical),
                raw: logical,
            });
        }

        // A trailing backslash on the last line: parse what we have.
        let logical = pending.trim().to_string();
        if !logical.is_empty() {
            lines.push(ManifestLine {
                number: pending_start,
                kind: classify(&logical),
                raw: logical,
            });
        }

        Self { path, lines }
    }

    /// Returns the path this manifest was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the significant logical lines.
    #[must_use]
    pub fn lines(&self) -> &[ManifestLine] {
        &self.lines
    }

    /// Iterates over the successfully parsed requirements with their line
    /// numbers.
    pub fn requirements(&self) -> impl Iterator<Item = (usize, &Requirement)> {
        self.lines.iter().filter_map(|line| match &line.kind {
            LineKind::Requirement(req) => Some((line.number, req)),
            _ => None,
        })
    }
}

/// Removes a trailing comment.
///
/// `#` starts a comment at the beginning of a line or when preceded by
/// whitespace. A bare `#` inside a token is data (URL fragments such as
/// `#egg=name` must survive).
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }

    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

fn classify(logical: &str) -> LineKind {
    if logical.starts_with('-') {
        return classify_option(logical);
    }

    match logical.parse::<Requirement>() {
        Ok(req) => LineKind::Requirement(req),
        Err(error) => LineKind::Invalid(error.into()),
    }
}

fn classify_option(logical: &str) -> LineKind {
    let (option, value) = split_option(logical);

    match option {
        "-r" | "--requirement" => value.map_or_else(
            || LineKind::Invalid(LineError::MissingValue(option.to_string())),
            |v| LineKind::Include(PathBuf::from(v)),
        ),
        "-c" | "--constraint" => value.map_or_else(
            || LineKind::Invalid(LineError::MissingValue(option.to_string())),
            |v| LineKind::Constraint(PathBuf::from(v)),
        ),
        "-e" | "--editable" => value.map_or_else(
            || LineKind::Invalid(LineError::MissingValue(option.to_string())),
            |v| LineKind::Editable(v.to_string()),
        ),
        _ => LineKind::GlobalOption(logical.to_string()),
    }
}

/// Splits `--opt value` or `--opt=value` into option and value.
fn split_option(logical: &str) -> (&str, Option<&str>) {
    if let Some((option, value)) = logical.split_once('=') {
        // Avoid treating `--hash=sha256:...` values containing '=' oddly:
        // only the first '=' separates.
        return (option.trim(), Some(value.trim()).filter(|v| !v.is_empty()));
    }
    match logical.split_once(char::is_whitespace) {
        Some((option, value)) => (option, Some(value.trim()).filter(|v| !v.is_empty())),
        None => (logical, None),
    }
}
