//! The documentation corpus and its reference graph.
//!
//! A corpus is every documentation source file under the configured root,
//! keyed by document name (the suffix-free path relative to the root, with
//! `/` separators). Toctree entries form a directed graph over document
//! names; validation checks that the graph is complete (no dangling
//! entries), covering (no orphans) and acyclic.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    io,
    path::{Path, PathBuf},
};

use petgraph::{graph::DiGraph, prelude::NodeIndex};
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    diagnostics::Diagnostic,
    storage::toctree::Toctree,
};

/// One documentation source file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Suffix-free path relative to the documentation root, `/`-separated.
    pub docname: String,
    /// Path the document was read from.
    pub path: PathBuf,
    /// First section title, when the document has one.
    pub title: Option<String>,
    /// Toctree directives in the document, in order.
    pub toctrees: Vec<Toctree>,
}

/// Every document under a documentation root.
#[derive(Debug)]
pub struct Corpus {
    root_doc: String,
    documents: BTreeMap<String, Document>,
}

/// A node of the rendered outline tree.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OutlineNode {
    /// Document name.
    pub docname: String,
    /// Document title, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Documents reachable through this document's toctrees.
    pub children: Vec<OutlineNode>,
}

impl Corpus {
    /// Scans `docs_root` for sources ending in `suffix` and parses them.
    ///
    /// # Errors
    ///
    /// Returns an error when the root does not exist or a source file
    /// cannot be read.
    pub fn scan(docs_root: &Path, suffix: &str, root_doc: &str) -> io::Result<Self> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(docs_root) {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_file()
                && entry.file_name().to_string_lossy().ends_with(suffix)
            {
                paths.push(entry.into_path());
            }
        }
        debug!(count = paths.len(), root = %docs_root.display(), "scanning documentation sources");

        let documents = paths
            .into_par_iter()
            .map(|path| {
                let content = std::fs::read_to_string(&path)?;
                let docname = docname(docs_root, &path, suffix);
                Ok(Document {
                    title: extract_title(&content),
                    toctrees: Toctree::extract(&content),
                    docname,
                    path,
                })
            })
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self {
            root_doc: root_doc.to_string(),
            documents: documents
                .into_iter()
                .map(|doc| (doc.docname.clone(), doc))
                .collect(),
        })
    }

    /// Returns the documents, ordered by document name.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Looks a document up by name.
    #[must_use]
    pub fn get(&self, docname: &str) -> Option<&Document> {
        self.documents.get(docname)
    }

    /// Runs the outline checks and returns every finding.
    ///
    /// Checks: entries that resolve to no document, documents pulled into
    /// the outline more than once, documents no toctree references,
    /// reference cycles, glob patterns matching nothing, and malformed
    /// directive options.
    #[must_use]
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if !self.documents.contains_key(&self.root_doc) {
            diagnostics.push(Diagnostic::error(
                PathBuf::from(&self.root_doc),
                "toc/missing",
                format!("root document '{}' not found", self.root_doc),
            ));
            return diagnostics;
        }

        let mut graph = DiGraph::<&str, ()>::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        for name in self.documents.keys() {
            nodes.insert(name, graph.add_node(name));
        }

        // First reference wins; later ones are reported as duplicates.
        let mut referenced: BTreeMap<&str, (&Path, usize)> = BTreeMap::new();

        for document in self.documents.values() {
            for tree in &document.toctrees {
                for issue in &tree.issues {
                    diagnostics.push(
                        Diagnostic::warning(
                            document.path.clone(),
                            "toc/directive",
                            issue.message.clone(),
                        )
                        .at_line(issue.line),
                    );
                }

                for (line, target) in self.resolve_entries(document, tree, &mut diagnostics) {
                    let Some((name, _)) = self.documents.get_key_value(target.as_str()) else {
                        diagnostics.push(
                            Diagnostic::error(
                                document.path.clone(),
                                "toc/missing",
                                format!("toctree entry '{target}' matches no document"),
                            )
                            .at_line(line),
                        );
                        continue;
                    };

                    graph.add_edge(nodes[document.docname.as_str()], nodes[name.as_str()], ());

                    match referenced.get(name.as_str()) {
                        Some((path, first_line)) => {
                            diagnostics.push(
                                Diagnostic::warning(
                                    document.path.clone(),
                                    "toc/duplicate",
                                    format!(
                                        "'{name}' already referenced at {}:{first_line}",
                                        path.display(),
                                    ),
                                )
                                .at_line(line),
                            );
                        }
                        None => {
                            referenced.insert(name.as_str(), (&document.path, line));
                        }
                    }
                }
            }
        }

        for document in self.documents.values() {
            if document.docname != self.root_doc
                && !referenced.contains_key(document.docname.as_str())
            {
                diagnostics.push(Diagnostic::warning(
                    document.path.clone(),
                    "toc/orphan",
                    "document is not referenced by any toctree".to_string(),
                ));
            }
        }

        for component in petgraph::algo::tarjan_scc(&graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| graph.contains_edge(n, n));
            if cyclic {
                let names: Vec<&str> = component.iter().map(|&n| graph[n]).collect();
                let first = &self.documents[names[0]];
                diagnostics.push(Diagnostic::error(
                    first.path.clone(),
                    "toc/cycle",
                    format!("toctree reference cycle: {}", names.join(" -> ")),
                ));
            }
        }

        diagnostics
    }

    /// Builds the outline tree rooted at the configured root document.
    #[must_use]
    pub fn outline(&self) -> Option<OutlineNode> {
        let mut visited = BTreeSet::new();
        self.outline_node(&self.root_doc, &mut visited)
    }

    fn outline_node(&self, docname: &str, visited: &mut BTreeSet<String>) -> Option<OutlineNode> {
        let document = self.documents.get(docname)?;
        if !visited.insert(docname.to_string()) {
            // A cycle; validation reports it, the outline just stops here.
            return None;
        }

        let mut children = Vec::new();
        let mut sink = Vec::new();
        for tree in &document.toctrees {
            for (_, target) in self.resolve_entries(document, tree, &mut sink) {
                if let Some(child) = self.outline_node(&target, visited) {
                    children.push(child);
                }
            }
        }

        Some(OutlineNode {
            docname: document.docname.clone(),
            title: document.title.clone(),
            children,
        })
    }

    /// Resolves one toctree's entries to document names.
    ///
    /// Glob trees expand each pattern over the corpus; literal trees
    /// resolve each target relative to the containing document. `self`
    /// entries refer to the containing document and are dropped. Patterns
    /// matching nothing are reported into `diagnostics`.
    fn resolve_entries(
        &self,
        document: &Document,
        tree: &Toctree,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<(usize, String)> {
        let mut resolved = Vec::new();

        for entry in &tree.entries {
            if entry.target == "self" {
                continue;
            }

            if tree.glob {
                let pattern = resolve_target(&document.docname, &entry.target);
                let regex = glob_to_regex(&pattern);
                let mut matched = false;
                for name in self.documents.keys() {
                    // A glob never pulls in the document it appears in.
                    if *name != document.docname && regex.is_match(name) {
                        resolved.push((entry.line, name.clone()));
                        matched = true;
                    }
                }
                if !matched {
                    diagnostics.push(
                        Diagnostic::warning(
                            document.path.clone(),
                            "toc/glob",
                            format!("glob pattern '{}' matches no documents", entry.target),
                        )
                        .at_line(entry.line),
                    );
                }
            } else {
                resolved.push((entry.line, resolve_target(&document.docname, &entry.target)));
            }
        }

        resolved
    }
}

/// Derives the document name from a source path.
fn docname(docs_root: &Path, path: &Path, suffix: &str) -> String {
    let relative = path.strip_prefix(docs_root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    joined.strip_suffix(suffix).unwrap_or(&joined).to_string()
}

/// Resolves a toctree target against the directory of the containing
/// document. A leading `/` means relative to the documentation root.
fn resolve_target(docname: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    match docname.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{target}"),
        None => target.to_string(),
    }
}

/// Compiles a shell-style pattern over document names. `*` does not cross
/// `/`, `**` does.
fn glob_to_regex(pattern: &str) -> Regex {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    // The pattern is built from escaped text and fixed fragments.
    Regex::new(&regex).unwrap()
}

/// A run of one repeated ASCII punctuation character.
fn is_adornment(line: &str) -> bool {
    let trimmed = line.trim_end();
    let mut chars = trimmed.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_punctuation() && chars.all(|c| c == first))
}

/// Finds the first section title.
///
/// A section title is a non-blank line underlined by a run of one repeated
/// punctuation character at least as long as the title. The overlined form
/// is covered by the same scan since the underline still follows the text.
fn extract_title(content: &str) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    for window in lines.windows(2) {
        let [text, underline] = window else { continue };
        let text = text.trim_end();
        if text.is_empty() || is_adornment(text) {
            continue;
        }
        if is_adornment(underline) && underline.trim_end().len() >= text.trim().len() {
            return Some(text.trim().to_string());
        }
    }
    None
}
