use crate::error::{HarvestError, Result};
use crate::results::HtmlDocument;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Distinguishes temporary files of saves running at the same time
static SAVE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Named on-disk slots holding raw HTML, one file per slot.
///
/// Files contain exactly the markup, UTF-8, with no wrapping metadata.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing a slot; slots may contain `/` to nest directories.
    ///
    /// Absolute slots and slots with `..` segments are rejected so every
    /// slot stays under the store root.
    pub fn path_for(&self, slot: &str) -> Result<PathBuf> {
        let invalid = |message: &str| HarvestError::InvalidSlot {
            slot: slot.to_string(),
            message: message.to_string(),
        };

        let mut path = self.root.clone();
        for component in Path::new(slot).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(invalid("parent directory segments are not allowed"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("slot must be a relative path"));
                }
            }
        }
        if path == self.root {
            return Err(invalid("slot has no file name"));
        }

        Ok(path)
    }

    /// Writes `html` to `slot`, creating parent directories.
    ///
    /// The content goes to a temporary sibling first and is renamed into
    /// place, so readers see either the old snapshot or the new one.
    pub async fn save(&self, slot: &str, html: &HtmlDocument) -> Result<()> {
        let path = self.path_for(slot)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = temp_sibling(&path);
        if let Err(e) = fs::write(&tmp_path, html.as_str().as_bytes()).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        ::log::debug!(
            "Saved snapshot {} ({} bytes) to {}",
            slot,
            html.len(),
            path.display()
        );
        Ok(())
    }

    /// Reads the markup stored under `slot`
    pub async fn load(&self, slot: &str) -> Result<HtmlDocument> {
        let path = self.path_for(slot)?;
        match fs::read_to_string(&path).await {
            Ok(html) => {
                ::log::debug!("Loaded snapshot {} ({} bytes)", slot, html.len());
                Ok(HtmlDocument::new(html))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(HarvestError::NotFound {
                slot: slot.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sequence = SAVE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        name,
        std::process::id(),
        sequence
    ))
}
