use crate::models::PageVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Added,
    Removed,
}

/// One line-level marker. `text` is already HTML-escaped so renderers can
/// embed it in markup without re-processing user content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChange {
    pub kind: ChangeKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "section")]
pub enum DiffSection {
    Summary {
        version: u32,
        updated: DateTime<Utc>,
        changes: String,
    },
    TitleChanged {
        old: String,
        new: String,
    },
    ContentChanges {
        lines: Vec<LineChange>,
    },
    NoChanges,
}

/// Ordered display sections. When any difference exists the summary comes
/// first; when nothing differs the report is a single `NoChanges` notice
/// and no other section is emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub sections: Vec<DiffSection>,
}

impl DiffReport {
    pub fn is_unchanged(&self) -> bool {
        matches!(self.sections.as_slice(), [DiffSection::NoChanges])
    }
}

/// Compares two snapshots. By convention `new` is the higher version and
/// `old` its predecessor, but any pair is accepted and the ordering is not
/// validated.
pub fn diff_versions(old: &PageVersion, new: &PageVersion) -> DiffReport {
    let mut sections = Vec::new();

    if old.title != new.title {
        sections.push(DiffSection::TitleChanged {
            old: old.title.clone(),
            new: new.title.clone(),
        });
    }

    let lines = content_changes(&old.content, &new.content);
    if !lines.is_empty() {
        sections.push(DiffSection::ContentChanges { lines });
    }

    if sections.is_empty() {
        return DiffReport {
            sections: vec![DiffSection::NoChanges],
        };
    }

    sections.insert(
        0,
        DiffSection::Summary {
            version: new.version,
            updated: new.updated,
            changes: new.changes.clone(),
        },
    );

    DiffReport { sections }
}

/// Positional line diff. Blank lines are dropped from both sides before
/// pairing, so an edit that only adds or removes blank lines produces no
/// entries. This is not a minimal-edit diff: a line inserted at the top
/// shows every subsequent line as a removed/added pair.
fn content_changes(old_text: &str, new_text: &str) -> Vec<LineChange> {
    let old_lines: Vec<&str> = old_text.lines().filter(|line| !line.trim().is_empty()).collect();
    let new_lines: Vec<&str> = new_text.lines().filter(|line| !line.trim().is_empty()).collect();

    let mut changes = Vec::new();
    for index in 0..old_lines.len().max(new_lines.len()) {
        let old_line = old_lines.get(index).copied().unwrap_or("");
        let new_line = new_lines.get(index).copied().unwrap_or("");

        if old_line == new_line {
            continue;
        }
        if !old_line.is_empty() {
            changes.push(LineChange {
                kind: ChangeKind::Removed,
                text: escape_html(old_line),
            });
        }
        if !new_line.is_empty() {
            changes.push(LineChange {
                kind: ChangeKind::Added,
                text: escape_html(new_line),
            });
        }
    }
    changes
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Markup rendering for web-style display; the structured report remains
/// the API for other consumers.
pub fn render_html(report: &DiffReport) -> String {
    let mut out = String::new();
    for section in &report.sections {
        match section {
            DiffSection::Summary {
                version,
                updated,
                changes,
            } => {
                out.push_str("<div class=\"diff-summary\">\n");
                out.push_str("<h3>Change Summary</h3>\n");
                out.push_str(&format!(
                    "<div class=\"change-details\"><strong>Version {}</strong> ({})<br><em>Changes: {}</em></div>\n",
                    version,
                    updated.to_rfc3339(),
                    changes
                ));
                out.push_str("</div>\n");
            }
            DiffSection::TitleChanged { old, new } => {
                out.push_str("<div class=\"diff-section\">\n<h3>Title Changed</h3>\n");
                out.push_str(&format!("<div class=\"diff-old\">- {}</div>\n", old));
                out.push_str(&format!("<div class=\"diff-new\">+ {}</div>\n", new));
                out.push_str("</div>\n");
            }
            DiffSection::ContentChanges { lines } => {
                out.push_str("<div class=\"diff-section\">\n<h3>Content Changes</h3>\n");
                for line in lines {
                    let (class, marker) = match line.kind {
                        ChangeKind::Removed => ("removed", '-'),
                        ChangeKind::Added => ("added", '+'),
                    };
                    out.push_str(&format!(
                        "<div class=\"diff-line {}\">{} {}</div>\n",
                        class, marker, line.text
                    ));
                }
                out.push_str("</div>\n");
            }
            DiffSection::NoChanges => {
                out.push_str(
                    "<div class=\"diff-section\"><p>No significant differences detected between these versions.</p></div>\n",
                );
            }
        }
    }
    out
}
