use crate::errors::{AppError, AppResult};
use crate::models::{ExportBundle, ExportFormat, ExportResponse, Page, PageExport};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;

pub const EXPORT_FORMAT_VERSION: &str = "1.0";

static HEADER_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<h([1-6])>(.*?)</h[1-6]>").expect("valid regex"));
static PARAGRAPH_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p>(.*?)</p>").expect("valid regex"));
static BOLD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<strong>(.*?)</strong>").expect("valid regex"));
static ITALIC_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<em>(.*?)</em>").expect("valid regex"));
static LIST_ITEM_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<li>(.*?)</li>").expect("valid regex"));
static BREAK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br\s*/?>").expect("valid regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

pub fn all_pages_bundle(pages: &[Page]) -> ExportBundle {
    ExportBundle {
        exported_at: Utc::now(),
        version: EXPORT_FORMAT_VERSION.to_string(),
        pages: pages.to_vec(),
    }
}

pub fn single_page_bundle(page: &Page) -> PageExport {
    PageExport {
        exported_at: Utc::now(),
        version: EXPORT_FORMAT_VERSION.to_string(),
        page: page.clone(),
    }
}

/// Best-effort reverse conversion of the fixed markup set the editor
/// produces (headers, paragraphs, bold, italic, lists, line breaks).
/// Anything else is stripped verbatim, not escaped.
pub fn html_to_markdown(content: &str) -> String {
    let content = HEADER_TAG.replace_all(content, |caps: &Captures<'_>| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("{} {}\n", "#".repeat(level), &caps[2])
    });
    let content = PARAGRAPH_TAG.replace_all(&content, "$1\n\n");
    let content = BOLD_TAG.replace_all(&content, "**$1**");
    let content = ITALIC_TAG.replace_all(&content, "*$1*");
    let content = content.replace("<ul>", "").replace("</ul>", "\n");
    let content = LIST_ITEM_TAG.replace_all(&content, "- $1\n");
    let content = BREAK_TAG.replace_all(&content, "\n");
    ANY_TAG.replace_all(&content, "").to_string()
}

pub fn page_to_markdown(page: &Page) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", page.title));

    if let Some(excerpt) = &page.excerpt {
        out.push_str(&format!("*{}*\n\n", excerpt));
    }

    out.push_str(&html_to_markdown(&page.content));

    out.push_str("\n\n---\n\n");
    out.push_str("**Metadata:**\n");
    out.push_str(&format!("- Created: {}\n", page.created.to_rfc3339()));
    out.push_str(&format!("- Updated: {}\n", page.updated.to_rfc3339()));
    out.push_str(&format!("- Version: {}\n", page.current_version.max(1)));
    if !page.links.is_empty() {
        out.push_str(&format!("- Links: {} connected pages\n", page.links.len()));
    }
    out
}

pub fn all_pages_markdown(pages: &[Page]) -> String {
    let mut out = format!(
        "# Lorebook Export\n\nExported on: {}\n\n---\n\n",
        Utc::now().to_rfc3339()
    );
    for page in pages {
        out.push_str(&page_to_markdown(page));
        out.push_str("\n\n---\n\n");
    }
    out
}

pub fn export_all(pages: &[Page], export_dir: &Path, format: ExportFormat) -> AppResult<ExportResponse> {
    let contents = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&all_pages_bundle(pages))?,
        ExportFormat::Markdown => all_pages_markdown(pages),
    };
    write_export(export_dir, &format!("lorebook-all-pages-{}", date_stamp()), format, &contents)
}

pub fn export_page(page: &Page, export_dir: &Path, format: ExportFormat) -> AppResult<ExportResponse> {
    let contents = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&single_page_bundle(page))?,
        ExportFormat::Markdown => page_to_markdown(page),
    };
    let stem = format!("lorebook-{}-{}", slugify(&page.title), date_stamp());
    write_export(export_dir, &stem, format, &contents)
}

fn write_export(
    export_dir: &Path,
    stem: &str,
    format: ExportFormat,
    contents: &str,
) -> AppResult<ExportResponse> {
    fs::create_dir_all(export_dir).map_err(|error| AppError::Io(error.to_string()))?;

    let output_path = export_dir.join(format!("{}.{}", stem, format.extension()));
    if !output_path.starts_with(export_dir) {
        return Err(AppError::Io("Resolved export path escaped export directory".to_string()));
    }

    fs::write(&output_path, contents).map_err(|error| AppError::Io(error.to_string()))?;
    Ok(ExportResponse {
        path: output_path.to_string_lossy().to_string(),
    })
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut previous_dash = true;
    for ch in text.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn date_stamp() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        export_page, html_to_markdown, page_to_markdown, single_page_bundle, slugify,
        EXPORT_FORMAT_VERSION,
    };
    use crate::models::{ExportFormat, Page, PageExport, PageVersion};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_page() -> Page {
        let now = Utc::now();
        Page {
            id: "page-1".to_string(),
            title: "Sample Page".to_string(),
            content: "<h2>Heading</h2><p>Body with <strong>bold</strong> text.</p>".to_string(),
            excerpt: Some("A short lede".to_string()),
            created: now,
            updated: now,
            tags: Some(vec!["demo".to_string()]),
            links: vec!["page-2".to_string()],
            current_version: 1,
            history: vec![PageVersion {
                version: 1,
                title: "Sample Page".to_string(),
                content: "<h2>Heading</h2><p>Body with <strong>bold</strong> text.</p>".to_string(),
                excerpt: Some("A short lede".to_string()),
                updated: now,
                changes: "Initial version".to_string(),
            }],
        }
    }

    #[test]
    fn json_export_round_trips_the_page() {
        let page = sample_page();
        let raw = serde_json::to_string_pretty(&single_page_bundle(&page)).expect("serialize");
        let parsed: PageExport = serde_json::from_str(&raw).expect("parse");

        assert_eq!(parsed.version, EXPORT_FORMAT_VERSION);
        assert_eq!(parsed.page, page);
    }

    #[test]
    fn converts_fixed_markup_set() {
        let html = "<h3>Deep</h3><p>Text</p><ul><li>one</li><li>two</li></ul><em>soft</em><br/>";
        let markdown = html_to_markdown(html);

        assert!(markdown.contains("### Deep\n"));
        assert!(markdown.contains("Text\n\n"));
        assert!(markdown.contains("- one\n"));
        assert!(markdown.contains("- two\n"));
        assert!(markdown.contains("*soft*"));
    }

    #[test]
    fn strips_unknown_tags_verbatim() {
        let markdown = html_to_markdown("<blockquote>quoted</blockquote><span>span</span>");
        assert_eq!(markdown, "quotedspan");
    }

    #[test]
    fn markdown_document_has_title_lede_and_footer() {
        let markdown = page_to_markdown(&sample_page());

        assert!(markdown.starts_with("# Sample Page\n\n"));
        assert!(markdown.contains("*A short lede*\n\n"));
        assert!(markdown.contains("## Heading\n"));
        assert!(markdown.contains("**bold**"));
        assert!(markdown.contains("**Metadata:**"));
        assert!(markdown.contains("- Version: 1\n"));
        assert!(markdown.contains("- Links: 1 connected pages\n"));
    }

    #[test]
    fn unversioned_page_reports_version_one_in_footer() {
        let mut page = sample_page();
        page.current_version = 0;
        page.history.clear();
        assert!(page_to_markdown(&page).contains("- Version: 1\n"));
    }

    #[test]
    fn export_writes_slugged_file() {
        let dir = TempDir::new().expect("tempdir");
        let response =
            export_page(&sample_page(), dir.path(), ExportFormat::Markdown).expect("export");

        assert!(response.path.contains("lorebook-sample-page-"));
        assert!(response.path.ends_with(".md"));
        let written = std::fs::read_to_string(&response.path).expect("read back");
        assert!(written.starts_with("# Sample Page"));
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
        assert_eq!(slugify("MiXeD CaSe 42"), "mixed-case-42");
    }
}
