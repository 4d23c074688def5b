//! End-to-end checks over a project tree built on disk: manifests with
//! includes on one side, a documentation outline on the other.

use std::{fs, path::Path};

use pincheck::{
    diagnostics::{error_count, warning_count},
    Config, Corpus, ManifestSet,
};
use tempfile::tempdir;

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn clean_project_produces_no_findings() {
    let tmp = tempdir().unwrap();
    write(
        tmp.path(),
        "requirements.txt",
        "-r requirements/base.txt\n\n# tooling\nblack==24.4.2\n",
    );
    write(
        tmp.path(),
        "requirements/base.txt",
        "requests==2.31.0\nnumpy==1.26.4; python_version >= \"3.9\"\n",
    );
    write(
        tmp.path(),
        "docs/index.rst",
        "Project\n=======\n\n.. toctree::\n   :maxdepth: 2\n\n   install\n   api/index\n",
    );
    write(tmp.path(), "docs/install.rst", "Install\n=======\n");
    write(
        tmp.path(),
        "docs/api/index.rst",
        "API\n===\n\n.. toctree::\n   :glob:\n\n   *\n",
    );
    write(tmp.path(), "docs/api/client.rst", "Client\n======\n");

    let config = Config::default();
    let set = ManifestSet::load(&tmp.path().join("requirements.txt")).unwrap();
    assert!(set.lint(&config).is_empty());

    let corpus = Corpus::scan(&tmp.path().join("docs"), ".rst", "index").unwrap();
    assert!(corpus.validate().is_empty());
}

#[test]
fn broken_project_reports_on_both_sides() {
    let tmp = tempdir().unwrap();
    write(
        tmp.path(),
        "requirements.txt",
        "requests>=2.0\n==nonsense\n-r missing.txt\n",
    );
    write(
        tmp.path(),
        "docs/index.rst",
        ".. toctree::\n\n   install\n   ghost\n",
    );
    write(tmp.path(), "docs/install.rst", "Install\n=======\n");
    write(tmp.path(), "docs/stray.rst", "Stray\n=====\n");

    let config = Config::default();
    let set = ManifestSet::load(&tmp.path().join("requirements.txt")).unwrap();
    let manifest_diagnostics = set.lint(&config);

    // One unpinned warning, one syntax error, one missing include.
    assert_eq!(warning_count(&manifest_diagnostics), 1);
    assert_eq!(error_count(&manifest_diagnostics), 2);

    let corpus = Corpus::scan(&tmp.path().join("docs"), ".rst", "index").unwrap();
    let doc_diagnostics = corpus.validate();

    // 'ghost' is dangling, 'stray' is orphaned.
    assert_eq!(error_count(&doc_diagnostics), 1);
    assert_eq!(warning_count(&doc_diagnostics), 1);
}

#[test]
fn config_file_drives_the_checks() {
    let tmp = tempdir().unwrap();
    write(
        tmp.path(),
        "pincheck.toml",
        "_version = \"1\"\nmanifests = [\"deps/runtime.txt\"]\nallow_unpinned = true\n",
    );
    write(tmp.path(), "deps/runtime.txt", "requests\nnumpy>=1.20\n");

    let config = Config::load_or_default(tmp.path()).unwrap();
    assert!(config.allow_unpinned);

    let manifest = &config.manifests()[0];
    let set = ManifestSet::load(&tmp.path().join(manifest)).unwrap();
    assert!(set.lint(&config).is_empty());
}

#[test]
fn outline_follows_nested_toctrees() {
    let tmp = tempdir().unwrap();
    write(
        tmp.path(),
        "docs/index.rst",
        "Home\n====\n\n.. toctree::\n\n   guide/index\n   reference\n",
    );
    write(
        tmp.path(),
        "docs/guide/index.rst",
        "Guide\n=====\n\n.. toctree::\n\n   install\n   Advanced usage <advanced>\n",
    );
    write(tmp.path(), "docs/guide/install.rst", "Install\n=======\n");
    write(tmp.path(), "docs/guide/advanced.rst", "Advanced\n========\n");
    write(tmp.path(), "docs/reference.rst", "Reference\n=========\n");

    let corpus = Corpus::scan(&tmp.path().join("docs"), ".rst", "index").unwrap();
    let outline = corpus.outline().unwrap();

    assert_eq!(outline.docname, "index");
    let children: Vec<_> = outline.children.iter().map(|c| c.docname.as_str()).collect();
    assert_eq!(children, ["guide/index", "reference"]);

    let guide = &outline.children[0];
    let grandchildren: Vec<_> = guide.children.iter().map(|c| c.docname.as_str()).collect();
    assert_eq!(grandchildren, ["guide/install", "guide/advanced"]);
}
