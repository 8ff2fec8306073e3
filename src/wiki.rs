use crate::diff::{diff_versions, DiffReport};
use crate::errors::AppResult;
use crate::export;
use crate::feed;
use crate::models::{ExportFormat, ExportResponse, FeedMergeStats, Page, PageUpdate, PageVersion};
use crate::store::PageStore;
use std::path::{Path, PathBuf};

/// The wiki service: owns the page store and the data-directory layout.
/// There is exactly one writer (the local user), so all operations run to
/// completion on the calling thread.
pub struct Wiki {
    store: PageStore,
    data_dir: PathBuf,
}

impl Wiki {
    /// Opens the store and then performs a best-effort feed sync; a
    /// missing or broken feed never blocks startup.
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        let store = PageStore::open(&data_dir.join("pages.json"))?;
        let mut wiki = Self {
            store,
            data_dir: data_dir.to_path_buf(),
        };
        wiki.sync()?;
        Ok(wiki)
    }

    pub fn feed_dir(&self) -> PathBuf {
        self.data_dir.join("feed")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    pub fn sync(&mut self) -> AppResult<FeedMergeStats> {
        let feed_dir = self.feed_dir();
        feed::sync_feed(&mut self.store, &feed_dir)
    }

    pub fn create_page(
        &mut self,
        title: &str,
        content: &str,
        excerpt: Option<&str>,
        tags: Option<Vec<String>>,
    ) -> AppResult<Page> {
        self.store.create_page(title, content, excerpt, tags)
    }

    pub fn update_page(&mut self, page_id: &str, update: PageUpdate) -> AppResult<Option<Page>> {
        self.store.update_page(page_id, update)
    }

    pub fn get_page(&self, page_id: &str) -> Option<&Page> {
        self.store.get_page(page_id)
    }

    pub fn list_pages(&self) -> &[Page] {
        self.store.list_pages()
    }

    pub fn get_version(&self, page_id: &str, version: u32) -> Option<&PageVersion> {
        self.store.get_version(page_id, version)
    }

    pub fn history(&self, page_id: &str) -> Option<Vec<PageVersion>> {
        self.store.history(page_id)
    }

    pub fn link_pages(&mut self, from_id: &str, to_id: &str) -> AppResult<Option<Page>> {
        self.store.link_pages(from_id, to_id)
    }

    pub fn search(&self, query: &str) -> Vec<&Page> {
        self.store.search(query)
    }

    pub fn pages_with_tag(&self, tag: &str) -> Vec<&Page> {
        self.store.pages_with_tag(tag)
    }

    pub fn random_page(&self) -> Option<&Page> {
        self.store.random_page()
    }

    /// Compares two stored versions of a page. `None` when the page or
    /// either version number is absent; callers branch on presence.
    pub fn diff(&self, page_id: &str, old_version: u32, new_version: u32) -> Option<DiffReport> {
        let old = self.store.get_version(page_id, old_version)?;
        let new = self.store.get_version(page_id, new_version)?;
        Some(diff_versions(old, new))
    }

    /// The history view's "compare with previous" action. Version 1 has no
    /// predecessor and yields `None`.
    pub fn diff_with_previous(&self, page_id: &str, version: u32) -> Option<DiffReport> {
        if version < 2 {
            return None;
        }
        self.diff(page_id, version - 1, version)
    }

    pub fn export_all(&self, format: ExportFormat) -> AppResult<ExportResponse> {
        export::export_all(self.store.list_pages(), &self.exports_dir(), format)
    }

    pub fn export_page(&self, page_id: &str, format: ExportFormat) -> AppResult<Option<ExportResponse>> {
        let Some(page) = self.store.get_page(page_id) else {
            return Ok(None);
        };
        export::export_page(page, &self.exports_dir(), format).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::Wiki;
    use crate::diff::DiffSection;
    use crate::models::{ExportFormat, PageUpdate};
    use tempfile::TempDir;

    #[test]
    fn open_with_empty_data_dir_starts_blank() {
        let dir = TempDir::new().expect("tempdir");
        let wiki = Wiki::open(dir.path()).expect("open");
        assert!(wiki.list_pages().is_empty());
    }

    #[test]
    fn startup_sync_pulls_feed_pages() {
        let dir = TempDir::new().expect("tempdir");
        let feed_dir = dir.path().join("feed");
        std::fs::create_dir_all(&feed_dir).expect("mkdir");
        std::fs::write(
            feed_dir.join("seed.json"),
            r#"{
                "id": "seed",
                "title": "Seeded",
                "content": "<p>Hello</p>",
                "created": "2026-01-05T10:00:00Z",
                "updated": "2026-01-05T10:00:00Z",
                "links": []
            }"#,
        )
        .expect("write feed");

        let wiki = Wiki::open(dir.path()).expect("open");
        assert_eq!(wiki.get_page("seed").expect("page").title, "Seeded");
    }

    #[test]
    fn diff_with_previous_requires_a_predecessor() {
        let dir = TempDir::new().expect("tempdir");
        let mut wiki = Wiki::open(dir.path()).expect("open");
        let page = wiki.create_page("Title", "A", None, None).expect("create");
        wiki.update_page(
            &page.id,
            PageUpdate {
                content: Some("B".to_string()),
                ..PageUpdate::default()
            },
        )
        .expect("update");

        assert!(wiki.diff_with_previous(&page.id, 1).is_none());
        let report = wiki.diff_with_previous(&page.id, 2).expect("report");
        assert!(matches!(report.sections[0], DiffSection::Summary { version: 2, .. }));
        assert!(wiki.diff(&page.id, 1, 9).is_none());
    }

    #[test]
    fn export_missing_page_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let wiki = Wiki::open(dir.path()).expect("open");
        let result = wiki.export_page("missing", ExportFormat::Json).expect("export");
        assert!(result.is_none());
    }
}
