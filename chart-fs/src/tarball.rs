use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

use crate::error::OverlayError;

/// A single file carried by the embedded tarball. Symlinks are dereferenced
/// when the tarball is packaged, so `link` is only populated for archives
/// produced by older packagers and is never followed at runtime.
#[derive(Debug, Clone)]
pub struct EmbeddedFile {
    pub mode: u32,
    pub data: Vec<u8>,
    pub link: Option<String>,
}

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<String, EmbeddedFile>,
    dirs: BTreeSet<String>,
}

/// The embedded layer of the overlay filesystem: a gzip'd tarball packaged
/// into the installer binary, materialized on first access into an in-memory
/// tree keyed by POSIX path.
pub struct EmbeddedTarball {
    bytes: Cow<'static, [u8]>,
    tree: OnceLock<Tree>,
}

impl EmbeddedTarball {
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            bytes: Cow::Borrowed(bytes),
            tree: OnceLock::new(),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Cow::Owned(bytes),
            tree: OnceLock::new(),
        }
    }

    fn tree(&self) -> Result<&Tree, OverlayError> {
        if let Some(tree) = self.tree.get() {
            return Ok(tree);
        }
        let tree = materialize(&self.bytes)?;
        Ok(self.tree.get_or_init(|| tree))
    }

    pub fn file(&self, path: &str) -> Result<Option<&EmbeddedFile>, OverlayError> {
        Ok(self.tree()?.files.get(&clean_path(path)))
    }

    pub fn is_dir(&self, path: &str) -> Result<bool, OverlayError> {
        let path = clean_path(path);
        if path.is_empty() {
            return Ok(true);
        }
        Ok(self.tree()?.dirs.contains(&path))
    }

    /// Immediate children of `path`, each with a flag telling whether the
    /// child is itself a directory. Sorted by name.
    pub fn list(&self, path: &str) -> Result<Vec<(String, bool)>, OverlayError> {
        let tree = self.tree()?;
        let prefix = match clean_path(path) {
            p if p.is_empty() => String::new(),
            p => format!("{p}/"),
        };
        let mut out = BTreeMap::new();
        for dir in &tree.dirs {
            if let Some(name) = direct_child(dir, &prefix) {
                out.insert(name.to_owned(), true);
            }
        }
        for file in tree.files.keys() {
            if let Some(name) = direct_child(file, &prefix) {
                out.entry(name.to_owned()).or_insert(false);
            }
        }
        Ok(out.into_iter().collect())
    }

    /// All file paths in the archive, sorted.
    pub fn paths(&self) -> Result<Vec<&str>, OverlayError> {
        Ok(self.tree()?.files.keys().map(String::as_str).collect())
    }

    /// Writes the whole tree under `root`, preserving file modes. Entry
    /// paths were validated during materialization, so nothing here can
    /// escape `root`.
    pub fn extract_to(&self, root: &Path) -> Result<(), OverlayError> {
        let tree = self.tree()?;
        for dir in &tree.dirs {
            std::fs::create_dir_all(root.join(dir))?;
        }
        for (path, file) in &tree.files {
            let dest = root.join(path);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&dest, &file.data)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(file.mode))?;
            }
        }
        Ok(())
    }
}

fn materialize(bytes: &[u8]) -> Result<Tree, OverlayError> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let mut tree = Tree::default();
    for entry in archive
        .entries()
        .map_err(|err| OverlayError::MalformedArchive(err.to_string()))?
    {
        let mut entry = entry.map_err(|err| OverlayError::MalformedArchive(err.to_string()))?;
        let raw_path = entry
            .path()
            .map_err(|err| OverlayError::MalformedArchive(err.to_string()))?
            .into_owned();
        let path = validate_entry_path(&raw_path)?;
        match entry.header().entry_type() {
            EntryType::Directory => {
                tree.dirs.insert(path);
            }
            EntryType::Regular | EntryType::Link | EntryType::Symlink => {
                let mode = entry
                    .header()
                    .mode()
                    .map_err(|err| OverlayError::MalformedArchive(err.to_string()))?;
                let link = entry
                    .link_name()
                    .ok()
                    .flatten()
                    .map(|l| l.to_string_lossy().into_owned());
                let mut data = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut data)?;
                record_parent_dirs(&mut tree.dirs, &path);
                tree.files.insert(path, EmbeddedFile { mode, data, link });
            }
            _ => continue,
        }
    }
    Ok(tree)
}

/// Every archive entry must resolve within the extraction root. Absolute
/// paths and `..` components fail before any bytes are read.
fn validate_entry_path(raw: &Path) -> Result<String, OverlayError> {
    let mut parts = Vec::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => continue,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(OverlayError::PathEscape(raw.display().to_string()));
            }
        }
    }
    Ok(parts.join("/"))
}

fn record_parent_dirs(dirs: &mut BTreeSet<String>, path: &str) {
    for (idx, ch) in path.char_indices() {
        if ch == '/' {
            dirs.insert(path[..idx].to_owned());
        }
    }
}

/// Normalizes a lookup path: strips leading `./` and any trailing slash.
pub(crate) fn clean_path(path: &str) -> String {
    path.trim_start_matches("./")
        .trim_matches('/')
        .to_owned()
}

/// Returns the name of the direct child of `prefix` that `path` passes
/// through, or `None` when `path` is outside `prefix`.
pub(crate) fn direct_child<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.split('/').next().unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_path_validation() {
        assert_eq!(
            validate_entry_path(Path::new("./charts/a/Chart.yaml")).unwrap(),
            "charts/a/Chart.yaml"
        );
        assert!(matches!(
            validate_entry_path(Path::new("../escape.txt")),
            Err(OverlayError::PathEscape(_))
        ));
        assert!(matches!(
            validate_entry_path(Path::new("charts/../../escape.txt")),
            Err(OverlayError::PathEscape(_))
        ));
        assert!(matches!(
            validate_entry_path(Path::new("/etc/passwd")),
            Err(OverlayError::PathEscape(_))
        ));
    }

    #[test]
    fn direct_children() {
        assert_eq!(direct_child("charts/a/Chart.yaml", "charts/"), Some("a"));
        assert_eq!(direct_child("charts", ""), Some("charts"));
        assert_eq!(direct_child("values.yaml.tpl", "charts/"), None);
    }
}
