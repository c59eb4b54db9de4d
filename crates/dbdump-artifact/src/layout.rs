use std::path::{Path, PathBuf};

use dbdump_core::TableDescriptor;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const IMPORT_SCRIPT: &str = "import.sql";
pub const EXPORT_SCRIPT: &str = "export.sql";
pub const README_FILE: &str = "README.md";
pub const DATA_DIR: &str = "data";

/// File locations inside an artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn import_script_path(&self) -> PathBuf {
        self.root.join(IMPORT_SCRIPT)
    }

    pub fn export_script_path(&self) -> PathBuf {
        self.root.join(EXPORT_SCRIPT)
    }

    pub fn readme_path(&self) -> PathBuf {
        self.root.join(README_FILE)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Absolute location of the flat file for `descriptor`.
    pub fn data_file(&self, descriptor: &TableDescriptor) -> PathBuf {
        self.root.join(descriptor.data_file())
    }
}
