use crate::errors::{AppError, AppResult};
use crate::models::{FeedMergeStats, Page};
use crate::store::PageStore;
use std::fs;
use std::path::Path;

/// Lists `*.json` files in the feed directory and parses each as a page.
/// Malformed entries are logged and skipped so one bad file cannot block
/// the rest of the feed.
pub fn load_feed_dir(feed_dir: &Path) -> AppResult<Vec<Page>> {
    let mut pages = Vec::new();
    for entry in fs::read_dir(feed_dir).map_err(|error| AppError::Io(error.to_string()))? {
        let entry = entry.map_err(|error| AppError::Io(error.to_string()))?;
        let path = entry.path();
        if path.extension().and_then(|value| value.to_str()) != Some("json") {
            continue;
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(path = %path.to_string_lossy(), error = %error, "skipping unreadable feed file");
                continue;
            }
        };
        match serde_json::from_str::<Page>(&raw) {
            Ok(page) => pages.push(page),
            Err(error) => {
                tracing::warn!(path = %path.to_string_lossy(), error = %error, "skipping malformed feed page");
            }
        }
    }
    Ok(pages)
}

/// Merges fetched pages into the store with fetched-wins precedence: an
/// incoming page replaces any local page with the same id wholesale,
/// otherwise it is appended. The merged set is persisted once.
pub fn merge_feed(store: &mut PageStore, fetched: Vec<Page>) -> AppResult<FeedMergeStats> {
    let mut stats = FeedMergeStats::default();
    for page in fetched {
        if store.absorb(page) {
            stats.replaced += 1;
        } else {
            stats.added += 1;
        }
    }
    store.save()?;
    Ok(stats)
}

/// Startup sync. A missing or unreadable feed directory is non-fatal: the
/// local collection stays as-is and the failure is only logged.
pub fn sync_feed(store: &mut PageStore, feed_dir: &Path) -> AppResult<FeedMergeStats> {
    let mut fetched = match load_feed_dir(feed_dir) {
        Ok(fetched) => fetched,
        Err(error) => {
            tracing::warn!(dir = %feed_dir.to_string_lossy(), error = %error, "feed unavailable, using local pages only");
            return Ok(FeedMergeStats::default());
        }
    };

    let before = fetched.len();
    fetched.retain(|page| !page.id.is_empty());
    let skipped = before - fetched.len();

    let mut stats = merge_feed(store, fetched)?;
    stats.skipped = skipped;
    Ok(stats)
}
