use anyhow::bail;
use clap::{Parser, Subcommand};
use lorebook::diff::{render_html, ChangeKind, DiffReport, DiffSection};
use lorebook::models::{ExportFormat, Page, PageUpdate};
use lorebook::Wiki;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lorebook")]
#[command(version, about = "Local-first personal wiki", long_about = None)]
struct Cli {
    /// Data directory holding the page store, feed, and exports
    #[arg(long, default_value = "lorebook-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all pages
    List,
    /// Show a page, or one historical version of it
    Show {
        id: String,
        /// Version number to show instead of the current state
        #[arg(long)]
        version: Option<u32>,
    },
    /// Create a new page
    Create {
        title: String,
        content: String,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Edit a page (appends one version)
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Free-text change note
        #[arg(long)]
        changes: Option<String>,
    },
    /// Record an outbound link between two pages
    Link { from: String, to: String },
    /// Search titles and content
    Search { query: String },
    /// List pages carrying a tag
    Tag { tag: String },
    /// Show a randomly selected page
    Random,
    /// Show a page's version history, newest first
    History { id: String },
    /// Compare two versions of a page
    Diff {
        id: String,
        /// Newer version number
        new: u32,
        /// Older version number (defaults to the previous version)
        #[arg(long)]
        old: Option<u32>,
        /// Emit HTML markup instead of terminal text
        #[arg(long)]
        html: bool,
        /// Emit the structured report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export one page or the whole wiki
    Export {
        /// Page id (exports everything when omitted)
        #[arg(long)]
        page: Option<String>,
        /// Output format: json or markdown
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Merge the feed directory into the local store
    Sync,
}

fn main() -> anyhow::Result<()> {
    lorebook::init_tracing();
    let cli = Cli::parse();
    let mut wiki = Wiki::open(&cli.data_dir)?;

    match cli.command {
        Commands::List => {
            if wiki.list_pages().is_empty() {
                println!("No pages yet. Create the first one!");
            }
            for page in wiki.list_pages() {
                print_page_line(page);
            }
        }
        Commands::Show { id, version: None } => match wiki.get_page(&id) {
            Some(page) => print_page(page),
            None => bail!("page {} not found", id),
        },
        Commands::Show {
            id,
            version: Some(number),
        } => match wiki.get_version(&id, number) {
            Some(entry) => {
                println!("Version {} of {} ({})", entry.version, id, entry.updated.to_rfc3339());
                println!("Changes: {}", entry.changes);
                println!("# {}\n{}", entry.title, entry.content);
            }
            None => bail!("version {} of page {} not found", number, id),
        },
        Commands::Create {
            title,
            content,
            excerpt,
            tags,
        } => {
            let tags = if tags.is_empty() { None } else { Some(tags) };
            let page = wiki.create_page(&title, &content, excerpt.as_deref(), tags)?;
            println!("Created page {} ({})", page.title, page.id);
        }
        Commands::Edit {
            id,
            title,
            content,
            excerpt,
            tags,
            changes,
        } => {
            let update = PageUpdate {
                title,
                content,
                excerpt,
                tags: if tags.is_empty() { None } else { Some(tags) },
                links: None,
                changes,
            };
            match wiki.update_page(&id, update)? {
                Some(page) => println!("Page {} is now at version {}", page.id, page.current_version),
                None => bail!("page {} not found", id),
            }
        }
        Commands::Link { from, to } => match wiki.link_pages(&from, &to)? {
            Some(page) => println!("Page {} links to {} pages", page.id, page.links.len()),
            None => bail!("page {} not found", from),
        },
        Commands::Search { query } => {
            let results = wiki.search(&query);
            println!("{} page(s) found for \"{}\"", results.len(), query);
            for page in results {
                print_page_line(page);
            }
        }
        Commands::Tag { tag } => {
            let results = wiki.pages_with_tag(&tag);
            println!("{} page(s) tagged \"{}\"", results.len(), tag);
            for page in results {
                print_page_line(page);
            }
        }
        Commands::Random => match wiki.random_page() {
            Some(page) => print_page(page),
            None => println!("No pages available for random selection."),
        },
        Commands::History { id } => match wiki.history(&id) {
            Some(entries) => {
                for entry in entries {
                    println!(
                        "v{}  {}  {}",
                        entry.version,
                        entry.updated.to_rfc3339(),
                        entry.changes
                    );
                }
            }
            None => bail!("page {} not found", id),
        },
        Commands::Diff {
            id,
            new,
            old,
            html,
            json,
        } => {
            let old = old.unwrap_or_else(|| new.saturating_sub(1));
            let Some(report) = wiki.diff(&id, old, new) else {
                bail!("page {} does not have both versions {} and {}", id, old, new);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if html {
                print!("{}", render_html(&report));
            } else {
                print_report(&report);
            }
        }
        Commands::Export { page, format } => {
            let format = match format.as_str() {
                "json" => ExportFormat::Json,
                "md" | "markdown" => ExportFormat::Markdown,
                other => bail!("unsupported export format {}", other),
            };
            let response = match page {
                Some(id) => match wiki.export_page(&id, format)? {
                    Some(response) => response,
                    None => bail!("page {} not found", id),
                },
                None => wiki.export_all(format)?,
            };
            println!("Exported to {}", response.path);
        }
        Commands::Sync => {
            let stats = wiki.sync()?;
            println!(
                "Feed sync: {} added, {} replaced, {} skipped",
                stats.added, stats.replaced, stats.skipped
            );
        }
    }

    Ok(())
}

fn print_page_line(page: &Page) {
    let tags = page.tag_list().join(", ");
    println!(
        "{}  {}  v{}  [{}]",
        page.id,
        page.title,
        page.current_version.max(1),
        tags
    );
}

fn print_page(page: &Page) {
    println!("# {} ({})", page.title, page.id);
    if let Some(excerpt) = &page.excerpt {
        println!("_{}_", excerpt);
    }
    println!("{}", page.content);
    println!(
        "Created: {}  Updated: {}  Links: {}  Version: {}",
        page.created.to_rfc3339(),
        page.updated.to_rfc3339(),
        page.links.len(),
        page.current_version.max(1)
    );
}

fn print_report(report: &DiffReport) {
    for section in &report.sections {
        match section {
            DiffSection::Summary {
                version,
                updated,
                changes,
            } => {
                println!("Change Summary");
                println!("Version {} ({})", version, updated.to_rfc3339());
                println!("Changes: {}", changes);
            }
            DiffSection::TitleChanged { old, new } => {
                println!("Title Changed");
                println!("- {}", old);
                println!("+ {}", new);
            }
            DiffSection::ContentChanges { lines } => {
                println!("Content Changes");
                for line in lines {
                    let marker = match line.kind {
                        ChangeKind::Removed => '-',
                        ChangeKind::Added => '+',
                    };
                    println!("{} {}", marker, line.text);
                }
            }
            DiffSection::NoChanges => {
                println!("No significant differences detected between these versions.");
            }
        }
    }
}
