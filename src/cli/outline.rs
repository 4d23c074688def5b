use std::path::PathBuf;

use clap::Parser;
use pincheck::{storage::OutlineNode, Corpus};
use tracing::instrument;

use super::terminal::{self, Colorize};

#[derive(Debug, Parser)]
#[command(about = "Print the documentation outline as a tree")]
pub struct Outline {
    /// Output the outline as JSON
    #[arg(long)]
    json: bool,
}

impl Outline {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let config = pincheck::Config::load_or_default(&root).map_err(|e| anyhow::anyhow!(e))?;

        let docs_root = root.join(config.docs_root());
        let corpus = Corpus::scan(&docs_root, config.source_suffix(), config.root_doc())?;

        let Some(outline) = corpus.outline() else {
            anyhow::bail!(
                "root document '{}' not found under {}",
                config.root_doc(),
                docs_root.display()
            );
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outline)?);
            return Ok(());
        }

        println!("{}", label(&outline));
        print_children(&outline, "");
        Ok(())
    }
}

fn label(node: &OutlineNode) -> String {
    // Titles are decoration; drop them when space is tight.
    match &node.title {
        Some(title) if !terminal::is_narrow() => {
            format!("{}  {}", node.docname, title.dim())
        }
        _ => node.docname.clone(),
    }
}

fn print_children(node: &OutlineNode, prefix: &str) {
    for (idx, child) in node.children.iter().enumerate() {
        let last = idx == node.children.len() - 1;
        let connector = if last { "└─" } else { "├─" };
        println!("{prefix}{connector} {}", label(child));

        let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
        print_children(child, &child_prefix);
    }
}
