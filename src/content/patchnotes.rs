//! Patch notes
//!
//! Patch notes are structured front matter: a version, a date, and typed
//! sections of one-line items. The markdown body below the front matter is
//! ignored. Files that do not match the schema are skipped with a warning
//! so one bad file cannot take down the whole changelog.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::markdown::MarkdownRenderer;
use super::matter::Matter;
use super::store::{file_stem, is_markdown_file};

pub(super) const DIR: &str = "patch-notes";

/// One release's patch note
#[derive(Debug, Clone, Serialize)]
pub struct PatchNote {
    /// File stem, e.g. "2.1.0"
    pub id: String,

    /// URL-safe id with dots replaced by dashes, e.g. "2-1-0"
    pub slug: String,

    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub sections: Vec<PatchSection>,

    pub published: bool,

    /// Set on the newest published note only
    #[serde(rename = "isLatest")]
    pub is_latest: bool,
}

/// A titled group of changes within a patch note
#[derive(Debug, Clone, Serialize)]
pub struct PatchSection {
    #[serde(rename = "type")]
    pub kind: String,

    pub title: String,

    /// Items as authored
    pub items: Vec<String>,

    /// Items rendered as inline HTML fragments
    #[serde(rename = "itemsHtml")]
    pub items_html: Vec<String>,
}

/// Typed front-matter schema for patch notes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatchNoteMatter {
    pub version: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    /// Notes are published unless the front matter opts out
    #[serde(default = "default_published")]
    pub published: bool,
    pub sections: Vec<SectionMatter>,
}

fn default_published() -> bool {
    true
}

impl Default for PatchNoteMatter {
    fn default() -> Self {
        Self {
            version: None,
            date: None,
            description: None,
            published: true,
            sections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SectionMatter {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub items: Vec<String>,
}

/// Load all published patch notes, newest first. The first note in the
/// result carries the latest flag.
pub(super) fn list(dir: &Path, renderer: &MarkdownRenderer) -> Result<Vec<PatchNote>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut notes = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && is_markdown_file(path) {
            match load_note(path, renderer) {
                Ok(Some(note)) => notes.push(note),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Skipping patch note {:?}: {}", path, e);
                }
            }
        }
    }

    // Newest first; undated notes sink to the end, the version-shaped id
    // breaks date ties
    notes.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| id_order(&b.id, &a.id)));

    if let Some(first) = notes.first_mut() {
        first.is_latest = true;
    }

    Ok(notes)
}

/// Find one published patch note by slug
pub(super) fn get(dir: &Path, renderer: &MarkdownRenderer, slug: &str) -> Result<Option<PatchNote>> {
    Ok(list(dir, renderer)?.into_iter().find(|n| n.slug == slug))
}

/// Load a single note; `Ok(None)` means the note is unpublished
fn load_note(path: &Path, renderer: &MarkdownRenderer) -> Result<Option<PatchNote>> {
    let text = fs::read_to_string(path)?;
    let id = file_stem(path);

    let (matter, _body) = Matter::parse_as::<PatchNoteMatter>(&text)?;

    if !matter.published {
        return Ok(None);
    }

    let mut sections = Vec::with_capacity(matter.sections.len());
    for section in matter.sections {
        let mut items_html = Vec::with_capacity(section.items.len());
        for item in &section.items {
            items_html.push(renderer.render_inline(item)?);
        }
        let title = section
            .title
            .unwrap_or_else(|| title_for(&section.kind));
        sections.push(PatchSection {
            kind: section.kind,
            title,
            items: section.items,
            items_html,
        });
    }

    let slug = id.replace('.', "-");
    let version = matter.version.unwrap_or_else(|| id.clone());

    Ok(Some(PatchNote {
        id,
        slug,
        version,
        date: matter.date,
        description: matter.description,
        sections,
        published: true,
        is_latest: false,
    }))
}

/// Order ids like version strings: dot segments compare numerically when
/// both sides are numbers, as text otherwise, so "2.10.0" is newer than
/// "2.9.0".
fn id_order(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(m), Ok(n)) => m.cmp(&n),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Fallback section title derived from the type, e.g. "added" -> "Added"
fn title_for(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Changes".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_note(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    fn renderer() -> MarkdownRenderer {
        MarkdownRenderer::new()
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let notes = list(&tmp.path().join(DIR), &renderer()).unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn test_list_orders_and_flags_latest() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(DIR);
        write_note(
            &dir,
            "2.0.0.md",
            "---\nversion: 2.0.0\ndate: 2025-05-01\nsections:\n  - type: added\n    items:\n      - New world border\n---\n",
        );
        write_note(
            &dir,
            "2.1.0.md",
            "---\nversion: 2.1.0\ndate: 2025-07-20\nsections:\n  - type: fixed\n    items:\n      - '**Hopper** clock drift'\n---\n",
        );

        let notes = list(&dir, &renderer()).unwrap();
        assert_eq!(notes.len(), 2);

        assert_eq!(notes[0].version, "2.1.0");
        assert_eq!(notes[0].slug, "2-1-0");
        assert!(notes[0].is_latest);
        assert!(!notes[1].is_latest);

        let section = &notes[0].sections[0];
        assert_eq!(section.kind, "fixed");
        assert_eq!(section.title, "Fixed");
        assert_eq!(section.items[0], "**Hopper** clock drift");
        assert_eq!(section.items_html[0], "<strong>Hopper</strong> clock drift");
    }

    #[test]
    fn test_unpublished_notes_hidden() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(DIR);
        write_note(&dir, "2.2.0.md", "---\nversion: 2.2.0\ndate: 2025-08-01\npublished: false\n---\n");
        write_note(&dir, "2.1.0.md", "---\nversion: 2.1.0\ndate: 2025-07-20\n---\n");

        let notes = list(&dir, &renderer()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].version, "2.1.0");
        assert!(notes[0].is_latest);

        assert!(get(&dir, &renderer(), "2-2-0").unwrap().is_none());
    }

    #[test]
    fn test_invalid_schema_skipped() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(DIR);
        write_note(&dir, "bad.md", "---\nsections: not-a-list\n---\n");
        write_note(&dir, "1.0.0.md", "---\ndate: 2025-01-01\n---\n");

        let notes = list(&dir, &renderer()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "1.0.0");
    }

    #[test]
    fn test_version_defaults_to_id() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(DIR);
        write_note(&dir, "1.4.2.md", "---\ndate: 2025-02-02\n---\n");

        let notes = list(&dir, &renderer()).unwrap();
        assert_eq!(notes[0].version, "1.4.2");
        assert_eq!(notes[0].slug, "1-4-2");
    }

    #[test]
    fn test_multiline_description() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(DIR);
        write_note(
            &dir,
            "3.0.0.md",
            "---\ndate: 2025-08-10\ndescription: |-\n  The caves update.\n\n  Backups ran before the migration.\n---\n",
        );

        let notes = list(&dir, &renderer()).unwrap();
        assert_eq!(
            notes[0].description.as_deref(),
            Some("The caves update.\n\nBackups ran before the migration.")
        );
    }

    #[test]
    fn test_get_by_slug() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(DIR);
        write_note(&dir, "2.1.0.md", "---\ndate: 2025-07-20\n---\n");

        let note = get(&dir, &renderer(), "2-1-0").unwrap().unwrap();
        assert_eq!(note.id, "2.1.0");
        assert!(note.is_latest);

        assert!(get(&dir, &renderer(), "9-9-9").unwrap().is_none());
    }

    #[test]
    fn test_date_tie_orders_by_version() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(DIR);
        write_note(&dir, "2.9.0.md", "---\ndate: 2025-07-20\n---\n");
        write_note(&dir, "2.10.0.md", "---\ndate: 2025-07-20\n---\n");

        let notes = list(&dir, &renderer()).unwrap();
        assert_eq!(notes[0].version, "2.10.0");
        assert!(notes[0].is_latest);
        assert_eq!(notes[1].version, "2.9.0");
    }

    #[test]
    fn test_undated_notes_sort_last() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(DIR);
        write_note(&dir, "wip.md", "---\nversion: wip\n---\n");
        write_note(&dir, "1.0.0.md", "---\ndate: 2024-01-01\n---\n");

        let notes = list(&dir, &renderer()).unwrap();
        assert_eq!(notes[0].id, "1.0.0");
        assert!(notes[0].is_latest);
        assert_eq!(notes[1].id, "wip");
    }
}
