//! Port interfaces for article content
//!
//! Articles are pre-rendered HTML; producing them (markdown rendering,
//! repository checkout) happens outside this process.

use std::sync::Arc;

use quill_domain::Result;

/// Read access to the published articles.
pub trait ContentStore: Send + Sync {
    /// Rendered HTML for `name`, or `None` if no such article exists.
    fn article(&self, name: &str) -> Option<Arc<str>>;

    /// Names of every published article, sorted.
    fn article_names(&self) -> Vec<String>;

    /// Reload articles from the backing store.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be read; the previously
    /// loaded articles stay available.
    fn reload(&self) -> Result<usize>;
}
