//! Template and logo asset loading.
//!
//! Assets are read from disk on first use and kept for the lifetime of the
//! store. Entries are inserted once and never mutated afterwards, so a store
//! can be shared between concurrent assembly calls behind an `Arc`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::TemplateError;

/// Directory (relative to the asset root) holding HTML templates.
pub const TEMPLATE_DIR: &str = "templates";

/// Logo image injected into every document.
pub const LOGO_PATH: &str = "images/logo.png";

/// Read-only cache of template text and the encoded logo.
#[derive(Debug)]
pub struct AssetStore {
    root: PathBuf,
    templates: RwLock<HashMap<String, Arc<str>>>,
    logo: RwLock<Option<Arc<str>>>,
}

impl AssetStore {
    /// Create a store reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            templates: RwLock::new(HashMap::new()),
            logo: RwLock::new(None),
        }
    }

    /// Store over the assets shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Self::bundled_dir())
    }

    /// Location of the assets shipped with this crate.
    pub fn bundled_dir() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"))
    }

    /// Asset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw text of the named template.
    ///
    /// Names are plain file names; anything that could escape the template
    /// directory is rejected.
    pub fn template(&self, name: &str) -> Result<Arc<str>, TemplateError> {
        if !is_plain_file_name(name) {
            return Err(TemplateError::UnknownTemplate(name.to_string()));
        }

        if let Some(text) = self.templates.read().get(name) {
            return Ok(Arc::clone(text));
        }

        let path = self.root.join(TEMPLATE_DIR).join(name);
        let text: Arc<str> = read_text(&path)?.into();
        debug!(template = name, bytes = text.len(), "Loaded template");

        let mut templates = self.templates.write();
        let entry = templates.entry(name.to_string()).or_insert(text);
        Ok(Arc::clone(entry))
    }

    /// Logo image bytes encoded as standard base64.
    pub fn logo_base64(&self) -> Result<Arc<str>, TemplateError> {
        if let Some(encoded) = self.logo.read().as_ref() {
            return Ok(Arc::clone(encoded));
        }

        let path = self.root.join(LOGO_PATH);
        let bytes = fs::read(&path).map_err(|source| TemplateError::UnreadableAsset {
            path: path.clone(),
            source,
        })?;
        let encoded: Arc<str> = BASE64.encode(bytes).into();
        debug!(path = %path.display(), "Loaded logo");

        let mut logo = self.logo.write();
        Ok(Arc::clone(logo.get_or_insert(encoded)))
    }
}

fn read_text(path: &Path) -> Result<String, TemplateError> {
    fs::read_to_string(path).map_err(|source| TemplateError::UnreadableAsset {
        path: path.to_path_buf(),
        source,
    })
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}
