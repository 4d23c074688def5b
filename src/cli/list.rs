use std::path::PathBuf;

use clap::Parser;
use pincheck::{ManifestSet, MarkerEnvironment, PackageName};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "List the requirements declared across the configured manifests")]
pub struct List {
    /// Only show requirements for this package
    #[arg(long, short)]
    package: Option<String>,

    /// Only show requirements whose markers apply on this platform
    #[arg(long, value_name = "PLATFORM")]
    platform: Option<Platform>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: ListFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum ListFormat {
    #[default]
    Table,
    Json,
}

/// A named marker environment profile
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    fn environment(self) -> MarkerEnvironment {
        match self {
            Self::Linux => MarkerEnvironment::linux(),
            Self::Macos => MarkerEnvironment::macos(),
            Self::Windows => MarkerEnvironment::windows(),
        }
    }
}

impl List {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let config = pincheck::Config::load_or_default(&root).map_err(|e| anyhow::anyhow!(e))?;

        let package = self
            .package
            .as_deref()
            .map(str::parse::<PackageName>)
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid package filter: {e}"))?;
        let environment = self.platform.map(Platform::environment);

        let mut rows = Vec::new();
        for manifest in config.manifests() {
            let set = ManifestSet::load(&root.join(&manifest))?;
            for entry in set.requirements() {
                if let Some(ref name) = package {
                    if entry.requirement.name() != name {
                        continue;
                    }
                }
                if let Some(ref env) = environment {
                    if !entry.requirement.applies_to(env) {
                        continue;
                    }
                }
                rows.push((
                    entry.requirement.clone(),
                    entry.path.to_path_buf(),
                    entry.line,
                ));
            }
        }

        match self.output {
            ListFormat::Table => Self::output_table(&rows),
            ListFormat::Json => Self::output_json(&rows)?,
        }

        Ok(())
    }

    fn output_table(rows: &[(pincheck::Requirement, PathBuf, usize)]) {
        if rows.is_empty() {
            println!("No requirements matched.");
            return;
        }

        for (requirement, path, line) in rows {
            println!(
                "{:<50} {}",
                requirement.to_string(),
                format!("{}:{line}", path.display()).dim()
            );
        }
        println!();
        println!("{} requirements", rows.len());
    }

    fn output_json(rows: &[(pincheck::Requirement, PathBuf, usize)]) -> anyhow::Result<()> {
        use serde_json::json;

        let requirements: Vec<_> = rows
            .iter()
            .map(|(requirement, path, line)| {
                json!({
                    "name": requirement.name().to_string(),
                    "requirement": requirement.to_string(),
                    "marker": requirement.marker().map(ToString::to_string),
                    "pinned": requirement.is_pinned(),
                    "path": path,
                    "line": line,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&requirements)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn list(package: Option<&str>, platform: Option<Platform>) -> List {
        List {
            package: package.map(ToString::to_string),
            platform,
            output: ListFormat::Table,
        }
    }

    #[test]
    fn run_lists_the_configured_manifest() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("requirements.txt"),
            "requests==2.31.0\nnumpy==1.26.4\n",
        )
        .unwrap();

        list(None, None)
            .run(tmp.path().to_path_buf())
            .expect("list should succeed");
    }

    #[test]
    fn package_filter_normalises_the_name() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("requirements.txt"), "requests==2.31.0\n").unwrap();

        // The filter goes through the same name normalisation as the
        // manifest, so casing differences still match.
        list(Some("Requests"), None)
            .run(tmp.path().to_path_buf())
            .expect("filtered list should succeed");
    }

    #[test]
    fn package_filter_rejects_invalid_names() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("requirements.txt"), "requests==2.31.0\n").unwrap();

        let error = list(Some("-not-a-name-"), None)
            .run(tmp.path().to_path_buf())
            .unwrap_err();
        assert!(error.to_string().contains("invalid package filter"));
    }

    #[test]
    fn platform_filter_evaluates_markers() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("requirements.txt"),
            "torch==2.3.0; sys_platform == \"linux\"\n",
        )
        .unwrap();

        list(None, Some(Platform::Windows))
            .run(tmp.path().to_path_buf())
            .expect("platform-filtered list should succeed");
    }
}
