use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Linter configuration.
///
/// Loaded from `pincheck.toml` at the root of the checked tree. All fields
/// have defaults, so running without a config file works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Manifest files to check, relative to the root.
    ///
    /// If this is empty, `requirements.txt` is assumed.
    manifests: Vec<PathBuf>,

    /// Root of the documentation sources, relative to the root.
    docs_root: PathBuf,

    /// Document name of the outline root (the document whose toctrees every
    /// other document should be reachable from).
    root_doc: String,

    /// File suffix of documentation sources.
    source_suffix: String,

    /// Whether bare-name (unpinned) requirements are tolerated.
    ///
    /// When `false`, a requirement without an exact pin is reported.
    pub allow_unpinned: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifests: Vec::new(),
            docs_root: default_docs_root(),
            root_doc: default_root_doc(),
            source_suffix: default_source_suffix(),
            allow_unpinned: false,
        }
    }
}

impl Config {
    /// Name of the config file, looked up in the root directory.
    pub const FILE_NAME: &'static str = "pincheck.toml";

    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads the configuration from `pincheck.toml` in `root`, falling back
    /// to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(root: &Path) -> Result<Self, String> {
        let path = root.join(Self::FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized or the
    /// file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the configured manifest paths, or `requirements.txt` when
    /// none are configured.
    #[must_use]
    pub fn manifests(&self) -> Vec<PathBuf> {
        if self.manifests.is_empty() {
            vec![PathBuf::from("requirements.txt")]
        } else {
            self.manifests.clone()
        }
    }

    /// Returns the documentation source root.
    #[must_use]
    pub fn docs_root(&self) -> &Path {
        &self.docs_root
    }

    /// Sets the documentation source root.
    pub fn set_docs_root(&mut self, path: PathBuf) {
        self.docs_root = path;
    }

    /// Returns the outline root document name.
    #[must_use]
    pub fn root_doc(&self) -> &str {
        &self.root_doc
    }

    /// Sets the outline root document name.
    pub fn set_root_doc(&mut self, doc: String) {
        self.root_doc = doc;
    }

    /// Returns the documentation source suffix (with leading dot).
    #[must_use]
    pub fn source_suffix(&self) -> &str {
        &self.source_suffix
    }
}

fn default_docs_root() -> PathBuf {
    PathBuf::from("docs")
}

fn default_root_doc() -> String {
    "index".to_string()
}

fn default_source_suffix() -> String {
    ".rst".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the
/// domain type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        manifests: Vec<PathBuf>,

        #[serde(default = "default_docs_root")]
        docs_root: PathBuf,

        #[serde(default = "default_root_doc")]
        root_doc: String,

        #[serde(default = "default_source_suffix")]
        source_suffix: String,

        #[serde(default)]
        allow_unpinned: bool,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                manifests,
                docs_root,
                root_doc,
                source_suffix,
                allow_unpinned,
            } => Self {
                manifests,
                docs_root,
                root_doc,
                source_suffix,
                allow_unpinned,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            manifests: config.manifests,
            docs_root: config.docs_root,
            root_doc: config.root_doc,
            source_suffix: config.source_suffix,
            allow_unpinned: config.allow_unpinned,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nmanifests = [\"requirements.txt\", \"requirements/test.txt\"]\ndocs_root = \"doc/source\"\nroot_doc = \"contents\"\nallow_unpinned = true\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(
            config.manifests(),
            vec![
                PathBuf::from("requirements.txt"),
                PathBuf::from("requirements/test.txt")
            ]
        );
        assert_eq!(config.docs_root(), Path::new("doc/source"));
        assert_eq!(config.root_doc(), "contents");
        assert_eq!(config.source_suffix(), ".rst");
        assert!(config.allow_unpinned);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_or_default_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn empty_file_returns_default() {
        // Tests that deserialising a bare version header returns the default
        // configuration.
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn manifests_default_to_requirements_txt() {
        let config = Config::default();
        assert_eq!(config.manifests(), vec![PathBuf::from("requirements.txt")]);
    }

    #[test]
    fn save_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(Config::FILE_NAME);

        let mut config = Config::default();
        config.allow_unpinned = true;
        config.set_root_doc("contents".to_string());
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }
}
