//! Filesystem-backed article store.
//!
//! Articles are pre-rendered `*.html` files in one directory; the file stem
//! is the article name. Everything is read into memory on [`reload`] and
//! served from there.
//!
//! [`reload`]: ContentStore::reload

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use quill_core::ContentStore;
use quill_domain::Result;
use tracing::{debug, info, warn};

use crate::errors::InfraError;

#[derive(Debug)]
pub struct FsContentStore {
    dir: PathBuf,
    articles: RwLock<BTreeMap<String, Arc<str>>>,
}

impl FsContentStore {
    /// Open `dir` and load every article in it.
    ///
    /// # Errors
    /// Returns `QuillError::NotFound` if the directory does not exist and
    /// `QuillError::Io` if it cannot be read.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { dir: dir.into(), articles: RwLock::new(BTreeMap::new()) };
        store.reload()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_dir(&self) -> std::result::Result<BTreeMap<String, Arc<str>>, InfraError> {
        let mut articles = BTreeMap::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!(path = %path.display(), "skipping article with non UTF-8 name");
                continue;
            };
            let html = std::fs::read_to_string(&path)?;
            debug!(article = name, bytes = html.len(), "article loaded");
            articles.insert(name.to_owned(), Arc::from(html));
        }
        Ok(articles)
    }
}

impl ContentStore for FsContentStore {
    fn article(&self, name: &str) -> Option<Arc<str>> {
        self.articles.read().get(name).cloned()
    }

    fn article_names(&self) -> Vec<String> {
        self.articles.read().keys().cloned().collect()
    }

    fn reload(&self) -> Result<usize> {
        let articles = self.read_dir()?;
        let count = articles.len();
        *self.articles.write() = articles;
        info!(dir = %self.dir.display(), count, "articles loaded");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use quill_domain::QuillError;
    use tempfile::TempDir;

    use super::*;

    fn content_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello-world.html"), "<h1>Hello</h1>").unwrap();
        std::fs::write(dir.path().join("about.html"), "<p>About</p>").unwrap();
        std::fs::write(dir.path().join("draft.md"), "# not rendered").unwrap();
        dir
    }

    #[test]
    fn loads_html_files_by_stem() {
        let dir = content_dir();
        let store = FsContentStore::open(dir.path()).expect("content store");

        assert_eq!(store.article_names(), vec!["about".to_string(), "hello-world".to_string()]);
        assert_eq!(store.article("hello-world").as_deref(), Some("<h1>Hello</h1>"));
        assert!(store.article("draft").is_none());
    }

    #[test]
    fn reload_picks_up_new_articles() {
        let dir = content_dir();
        let store = FsContentStore::open(dir.path()).expect("content store");

        std::fs::write(dir.path().join("new-post.html"), "<p>New</p>").unwrap();
        assert_eq!(store.reload().expect("reload"), 3);
        assert!(store.article("new-post").is_some());
    }

    #[test]
    fn failed_reload_keeps_previous_articles() {
        let dir = content_dir();
        let store = FsContentStore::open(dir.path()).expect("content store");
        let path = dir.path().to_path_buf();
        drop(dir);

        assert!(!path.exists());
        assert!(store.reload().is_err());
        assert_eq!(store.article_names().len(), 2);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let err = FsContentStore::open("/nonexistent/quill/content").expect_err("missing dir");
        assert!(matches!(err, QuillError::NotFound(_)));
    }
}
