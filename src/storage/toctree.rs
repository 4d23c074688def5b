//! `toctree` directive extraction from documentation sources.
//!
//! A toctree block names the documents that sit below the containing
//! document in the outline:
//!
//! ```text
//! .. toctree::
//!    :maxdepth: 2
//!    :caption: User guide
//!
//!    installation
//!    Configuration <config/index>
//! ```
//!
//! Options precede the entry list. An entry is a document name relative to
//! the documentation root (no file suffix), optionally with an explicit
//! title. Extraction is purely syntactic; resolving entries against the
//! actual document tree happens in [`crate::storage::corpus`].

use std::sync::LazyLock;

use regex::Regex;

/// One `toctree` directive.
#[derive(Debug, Clone, Default)]
pub struct Toctree {
    /// One-based line number of the directive itself.
    pub line: usize,
    /// `:caption:` text, shown above the entries when rendered.
    pub caption: Option<String>,
    /// `:maxdepth:` rendering depth limit.
    pub maxdepth: Option<u32>,
    /// `:name:` label for cross-referencing the tree itself.
    pub name: Option<String>,
    /// `:hidden:` trees still define structure but render nothing in place.
    pub hidden: bool,
    /// `:glob:` entries are shell-style patterns rather than literal names.
    pub glob: bool,
    /// `:titlesonly:` limits rendering to document titles.
    pub titles_only: bool,
    /// The listed entries, in order.
    pub entries: Vec<TocEntry>,
    /// Option lines that did not parse.
    pub issues: Vec<OptionIssue>,
}

/// One entry line of a toctree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// One-based line number of the entry.
    pub line: usize,
    /// Explicit title, when written as `Title <target>`.
    pub title: Option<String>,
    /// Document name (or glob pattern) the entry points at.
    pub target: String,
}

/// A malformed option line inside a directive body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionIssue {
    /// One-based line number of the option.
    pub line: usize,
    /// What was wrong with it.
    pub message: String,
}

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)\.\.\s+toctree::\s*$").unwrap());

static OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z][A-Za-z-]*):\s*(.*)$").unwrap());

static TITLED_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*<([^<>]+)>$").unwrap());

impl Toctree {
    /// Extracts every toctree directive from reStructuredText content.
    #[must_use]
    pub fn extract(content: &str) -> Vec<Self> {
        let lines: Vec<&str> = content.lines().collect();
        let mut trees = Vec::new();

        let mut index = 0;
        while index < lines.len() {
            let Some(captures) = DIRECTIVE_RE.captures(lines[index]) else {
                index += 1;
                continue;
            };
            let indent = captures[1].len();

            let mut tree = Self {
                line: index + 1,
                ..Self::default()
            };

            index += 1;
            while index < lines.len() {
                let line = lines[index];
                if line.trim().is_empty() {
                    index += 1;
                    continue;
                }
                if indentation(line) <= indent {
                    break;
                }
                tree.parse_body_line(index + 1, line.trim());
                index += 1;
            }

            trees.push(tree);
        }

        trees
    }

    fn parse_body_line(&mut self, number: usize, trimmed: &str) {
        if let Some(captures) = OPTION_RE.captures(trimmed) {
            self.parse_option(number, &captures[1], captures[2].trim());
            return;
        }

        // A stray `:something` that is not a well-formed option would
        // otherwise be mistaken for an entry named `:something`.
        if trimmed.starts_with(':') {
            self.issues.push(OptionIssue {
                line: number,
                message: format!("malformed option line '{trimmed}'"),
            });
            return;
        }

        let (title, target) = TITLED_ENTRY_RE.captures(trimmed).map_or_else(
            || (None, trimmed.to_string()),
            |captures| {
                let title = captures[1].trim();
                (
                    (!title.is_empty()).then(|| title.to_string()),
                    captures[2].trim().to_string(),
                )
            },
        );

        self.entries.push(TocEntry {
            line: number,
            title,
            target,
        });
    }

    fn parse_option(&mut self, number: usize, name: &str, value: &str) {
        match name {
            "caption" => self.caption = Some(value.to_string()),
            "name" => self.name = Some(value.to_string()),
            "maxdepth" => match value.parse() {
                Ok(depth) => self.maxdepth = Some(depth),
                Err(_) => self.issues.push(OptionIssue {
                    line: number,
                    message: format!("':maxdepth:' expects a number, got '{value}'"),
                }),
            },
            "hidden" => self.hidden = true,
            "glob" => self.glob = true,
            "titlesonly" => self.titles_only = true,
            // Rendering-only options with no structural meaning.
            "numbered" | "reversed" | "includehidden" => {}
            _ => self.issues.push(OptionIssue {
                line: number,
                message: format!("unknown option ':{name}:'"),
            }),
        }
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_entries() {
        let trees = Toctree::extract(
            "Intro text.\n\n.. toctree::\n\n   installation\n   usage\n\nTrailing text.\n",
        );

        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].line, 3);
        let targets: Vec<_> = trees[0].entries.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, ["installation", "usage"]);
        assert!(trees[0].entries.iter().all(|e| e.title.is_none()));
    }

    #[test]
    fn extracts_titled_entries() {
        let trees = Toctree::extract(".. toctree::\n\n   Getting started <guide/start>\n");

        assert_eq!(trees[0].entries.len(), 1);
        let entry = &trees[0].entries[0];
        assert_eq!(entry.title.as_deref(), Some("Getting started"));
        assert_eq!(entry.target, "guide/start");
    }

    #[test]
    fn parses_options() {
        let trees = Toctree::extract(
            ".. toctree::\n   :maxdepth: 2\n   :caption: User guide\n   :hidden:\n\n   intro\n",
        );

        let tree = &trees[0];
        assert_eq!(tree.maxdepth, Some(2));
        assert_eq!(tree.caption.as_deref(), Some("User guide"));
        assert!(tree.hidden);
        assert!(!tree.glob);
        assert_eq!(tree.entries.len(), 1);
        assert!(tree.issues.is_empty());
    }

    #[test]
    fn glob_flag() {
        let trees = Toctree::extract(".. toctree::\n   :glob:\n\n   reference/*\n");
        assert!(trees[0].glob);
        assert_eq!(trees[0].entries[0].target, "reference/*");
    }

    #[test]
    fn bad_maxdepth_is_an_issue() {
        let trees = Toctree::extract(".. toctree::\n   :maxdepth: lots\n\n   intro\n");
        assert_eq!(trees[0].maxdepth, None);
        assert_eq!(trees[0].issues.len(), 1);
        assert_eq!(trees[0].issues[0].line, 2);
        // The entry after the bad option still parses.
        assert_eq!(trees[0].entries.len(), 1);
    }

    #[test]
    fn unknown_option_is_an_issue() {
        let trees = Toctree::extract(".. toctree::\n   :colour: blue\n\n   intro\n");
        assert_eq!(trees[0].issues.len(), 1);
        assert!(trees[0].issues[0].message.contains(":colour:"));
    }

    #[test]
    fn body_ends_at_dedent() {
        let trees = Toctree::extract(".. toctree::\n\n   intro\n\nNot an entry.\n");
        assert_eq!(trees[0].entries.len(), 1);
    }

    #[test]
    fn multiple_directives_in_one_document() {
        let trees = Toctree::extract(
            ".. toctree::\n   :caption: One\n\n   a\n\n.. toctree::\n   :caption: Two\n\n   b\n",
        );

        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].caption.as_deref(), Some("One"));
        assert_eq!(trees[1].caption.as_deref(), Some("Two"));
        assert_eq!(trees[1].entries[0].target, "b");
    }

    #[test]
    fn indented_directive_inside_another_block() {
        let trees = Toctree::extract(".. note::\n\n   .. toctree::\n\n      nested/doc\n");
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].entries[0].target, "nested/doc");
    }

    #[test]
    fn no_directives() {
        assert!(Toctree::extract("Just prose.\n").is_empty());
    }
}
