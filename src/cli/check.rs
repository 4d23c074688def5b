use std::path::PathBuf;

use clap::Parser;
use pincheck::{Diagnostic, ManifestSet};
use tracing::instrument;

use super::report::{self, OutputFormat};

#[derive(Debug, Default, Parser)]
#[command(about = "Check dependency manifests for syntax and pinning problems")]
pub struct Check {
    /// Manifest files to check (defaults to the configured manifests)
    files: Vec<PathBuf>,

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

impl Check {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let config = pincheck::Config::load_or_default(&root).map_err(|e| anyhow::anyhow!(e))?;

        let manifests: Vec<PathBuf> = if self.files.is_empty() {
            config.manifests().iter().map(|m| root.join(m)).collect()
        } else {
            self.files.clone()
        };

        let mut diagnostics = Vec::new();
        for path in &manifests {
            match ManifestSet::load(path) {
                Ok(set) => diagnostics.extend(set.lint(&config)),
                Err(error) => diagnostics.push(Diagnostic::error(
                    path.clone(),
                    "manifest/missing",
                    format!("cannot read manifest: {error}"),
                )),
            }
        }

        report::emit(&diagnostics, self.output, self.quiet)?;
        report::exit_if_dirty(&diagnostics, self.strict);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn run_succeeds_on_pinned_manifest() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("requirements.txt"),
            "requests==2.31.0\nnumpy==1.26.4\n",
        )
        .unwrap();

        Check::default()
            .run(tmp.path().to_path_buf())
            .expect("check should succeed on a clean manifest");
    }

    #[test]
    fn run_accepts_explicit_files() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("deps.txt");
        fs::write(&path, "black==24.4.2\n").unwrap();

        let check = Check {
            files: vec![path],
            output: OutputFormat::default(),
            quiet: false,
            strict: false,
        };

        check
            .run(tmp.path().to_path_buf())
            .expect("check should succeed on an explicit file");
    }

    #[test]
    fn run_treats_warnings_as_non_fatal_without_strict() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("requirements.txt"), "requests>=2.0\n").unwrap();

        let check = Check {
            files: Vec::new(),
            output: OutputFormat::default(),
            quiet: true,
            strict: false,
        };

        check
            .run(tmp.path().to_path_buf())
            .expect("unpinned warnings should not fail the run without --strict");
    }
}
