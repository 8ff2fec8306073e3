use crate::errors::{AppError, AppResult};
use crate::models::{Page, PageUpdate, PageVersion};
use chrono::Utc;
use rand::seq::IndexedRandom;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const INITIAL_CHANGE_NOTE: &str = "Initial version";
pub const DEFAULT_CHANGE_NOTE: &str = "Updated content";

/// Owns the page collection and its version logs. One instance per data
/// directory; every mutation is persisted before it returns.
#[derive(Debug)]
pub struct PageStore {
    store_path: PathBuf,
    pages: Vec<Page>,
}

impl PageStore {
    /// A missing store file opens as an empty collection. A file that
    /// exists but fails to parse is a hard error; silently discarding a
    /// user's pages is worse than refusing to start.
    pub fn open(store_path: &Path) -> AppResult<Self> {
        if let Some(parent) = store_path.parent() {
            fs::create_dir_all(parent).map_err(|error| AppError::Io(error.to_string()))?;
        }

        let pages = if store_path.exists() {
            let raw = fs::read_to_string(store_path).map_err(|error| AppError::Io(error.to_string()))?;
            serde_json::from_str::<Vec<Page>>(&raw)
                .map_err(|error| AppError::StoreCorrupt(format!("{}: {}", store_path.display(), error)))?
        } else {
            Vec::new()
        };

        Ok(Self {
            store_path: store_path.to_path_buf(),
            pages,
        })
    }

    pub fn save(&self) -> AppResult<()> {
        let raw = serde_json::to_string_pretty(&self.pages)?;
        fs::write(&self.store_path, raw).map_err(|error| AppError::Io(error.to_string()))?;
        Ok(())
    }

    pub fn create_page(
        &mut self,
        title: &str,
        content: &str,
        excerpt: Option<&str>,
        tags: Option<Vec<String>>,
    ) -> AppResult<Page> {
        let now = Utc::now();
        let page = Page {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            excerpt: excerpt.map(ToString::to_string),
            created: now,
            updated: now,
            tags,
            links: Vec::new(),
            current_version: 1,
            history: vec![PageVersion {
                version: 1,
                title: title.to_string(),
                content: content.to_string(),
                excerpt: excerpt.map(ToString::to_string),
                updated: now,
                changes: INITIAL_CHANGE_NOTE.to_string(),
            }],
        };

        self.pages.push(page.clone());
        self.save()?;
        Ok(page)
    }

    /// Appends exactly one version and overwrites the page's current
    /// fields with the merged updates. Field merging is "last write wins
    /// over current": omitted fields carry over from the page, never from
    /// the prior version. Returns `None` when the page id is unknown.
    pub fn update_page(&mut self, page_id: &str, update: PageUpdate) -> AppResult<Option<Page>> {
        let now = Utc::now();
        let Some(page) = self.pages.iter_mut().find(|page| page.id == page_id) else {
            return Ok(None);
        };

        // Repair pages that predate versioning before appending.
        if page.history.is_empty() {
            page.history.push(PageVersion {
                version: 1,
                title: page.title.clone(),
                content: page.content.clone(),
                excerpt: page.excerpt.clone(),
                updated: page.created,
                changes: INITIAL_CHANGE_NOTE.to_string(),
            });
        }

        check_history(page_id, &page.history)?;

        let next = PageVersion {
            version: page.history.len() as u32 + 1,
            title: update.title.unwrap_or_else(|| page.title.clone()),
            content: update.content.unwrap_or_else(|| page.content.clone()),
            excerpt: update.excerpt.or_else(|| page.excerpt.clone()),
            updated: now,
            changes: update.changes.unwrap_or_else(|| DEFAULT_CHANGE_NOTE.to_string()),
        };

        page.title = next.title.clone();
        page.content = next.content.clone();
        page.excerpt = next.excerpt.clone();
        if let Some(tags) = update.tags {
            page.tags = Some(tags);
        }
        if let Some(links) = update.links {
            page.links = links;
        }
        page.updated = now;
        page.current_version = next.version;
        page.history.push(next);

        let updated = page.clone();
        self.save()?;
        Ok(Some(updated))
    }

    pub fn get_page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == page_id)
    }

    pub fn list_pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn get_version(&self, page_id: &str, version: u32) -> Option<&PageVersion> {
        self.get_page(page_id)?
            .history
            .iter()
            .find(|entry| entry.version == version)
    }

    /// Version list in display order, newest first.
    pub fn history(&self, page_id: &str) -> Option<Vec<PageVersion>> {
        let page = self.get_page(page_id)?;
        let mut entries = page.history.clone();
        entries.reverse();
        Some(entries)
    }

    /// Records an outbound link. Duplicates are ignored; the target is not
    /// required to exist (dangling links are tolerated by the data model).
    pub fn link_pages(&mut self, from_id: &str, to_id: &str) -> AppResult<Option<Page>> {
        let Some(page) = self.pages.iter_mut().find(|page| page.id == from_id) else {
            return Ok(None);
        };

        if page.links.iter().any(|link| link == to_id) {
            return Ok(Some(page.clone()));
        }

        page.links.push(to_id.to_string());
        page.updated = Utc::now();
        let updated = page.clone();
        self.save()?;
        Ok(Some(updated))
    }

    pub fn search(&self, query: &str) -> Vec<&Page> {
        let needle = query.to_lowercase();
        self.pages
            .iter()
            .filter(|page| {
                page.title.to_lowercase().contains(&needle)
                    || page.content.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn pages_with_tag(&self, tag: &str) -> Vec<&Page> {
        self.pages
            .iter()
            .filter(|page| page.tag_list().iter().any(|candidate| candidate == tag))
            .collect()
    }

    pub fn random_page(&self) -> Option<&Page> {
        self.pages.choose(&mut rand::rng())
    }

    /// Feed merge entry point: an incoming page replaces a local page with
    /// the same id wholesale, otherwise it is appended. The caller decides
    /// when to persist the merged set.
    pub(crate) fn absorb(&mut self, incoming: Page) -> bool {
        match self.pages.iter_mut().find(|page| page.id == incoming.id) {
            Some(existing) => {
                *existing = incoming;
                true
            }
            None => {
                self.pages.push(incoming);
                false
            }
        }
    }
}

/// Append-only log integrity, enforced at the store boundary: version
/// numbers must be 1-based and contiguous. Timestamp regressions are
/// logged but tolerated; feed-imported histories may carry them.
fn check_history(page_id: &str, history: &[PageVersion]) -> AppResult<()> {
    for (index, entry) in history.iter().enumerate() {
        let expected = index as u32 + 1;
        if entry.version != expected {
            return Err(AppError::History(format!(
                "page {} history entry {} has version {}, expected {}",
                page_id, index, entry.version, expected
            )));
        }
    }

    for window in history.windows(2) {
        if window[1].updated < window[0].updated {
            tracing::warn!(
                page_id = %page_id,
                version = window[1].version,
                "version timestamp regresses against its predecessor"
            );
        }
    }

    Ok(())
}
