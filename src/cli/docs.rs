use std::path::PathBuf;

use clap::Parser;
use pincheck::Corpus;
use tracing::instrument;

use super::report::{self, OutputFormat};

#[derive(Debug, Default, Parser)]
#[command(about = "Check the documentation outline for broken or missing references")]
pub struct Docs {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Only report errors
    #[arg(long, short)]
    quiet: bool,

    /// Treat warnings as errors when deciding the exit code
    #[arg(long)]
    strict: bool,
}

impl Docs {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let config = pincheck::Config::load_or_default(&root).map_err(|e| anyhow::anyhow!(e))?;

        let docs_root = root.join(config.docs_root());
        let corpus = Corpus::scan(&docs_root, config.source_suffix(), config.root_doc())?;

        let diagnostics = corpus.validate();
        report::emit(&diagnostics, self.output, self.quiet)?;
        report::exit_if_dirty(&diagnostics, self.strict);
        Ok(())
    }
}
