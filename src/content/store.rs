//! Content accessors over the site's markdown tree
//!
//! Every call reads straight from disk, so edits to content files show up
//! on the next request without a restart.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::article::{Article, ArticleMatter, Category};
use super::markdown::MarkdownRenderer;
use super::matter::Matter;
use super::patchnotes::{self, PatchNote};

/// Reads articles and patch notes from the content directory
pub struct ContentStore {
    content_dir: PathBuf,
    renderer: MarkdownRenderer,
}

impl ContentStore {
    pub fn new<P: AsRef<Path>>(content_dir: P) -> Self {
        Self {
            content_dir: content_dir.as_ref().to_path_buf(),
            renderer: MarkdownRenderer::new(),
        }
    }

    /// Load every article in a category, in presentation order.
    ///
    /// A missing directory is an empty listing, and a file that fails to
    /// load is skipped with a warning rather than failing the whole list.
    pub fn list(&self, category: Category) -> Result<Vec<Article>> {
        let dir = self.content_dir.join(category.dir_name());
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut articles = Vec::new();

        for entry in WalkDir::new(&dir)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_markdown_file(path) {
                match self.load_article(path, category, false) {
                    Ok(article) => articles.push(article),
                    Err(e) => {
                        tracing::warn!("Failed to load article {:?}: {}", path, e);
                    }
                }
            }
        }

        category.sort(&mut articles);

        Ok(articles)
    }

    /// Load one article by its file stem. Returns `Ok(None)` when the id
    /// does not name a file in the category directory.
    pub fn get(&self, category: Category, id: &str) -> Result<Option<Article>> {
        if !is_safe_id(id) {
            return Ok(None);
        }

        for ext in ["md", "markdown"] {
            let path = self
                .content_dir
                .join(category.dir_name())
                .join(format!("{}.{}", id, ext));
            if path.is_file() {
                return self.load_article(&path, category, true).map(Some);
            }
        }

        Ok(None)
    }

    /// All published patch notes, newest first
    pub fn patch_notes(&self) -> Result<Vec<PatchNote>> {
        patchnotes::list(&self.content_dir.join(patchnotes::DIR), &self.renderer)
    }

    /// One patch note by slug
    pub fn patch_note(&self, slug: &str) -> Result<Option<PatchNote>> {
        patchnotes::get(&self.content_dir.join(patchnotes::DIR), &self.renderer, slug)
    }

    fn load_article(&self, path: &Path, category: Category, include_raw: bool) -> Result<Article> {
        let text = fs::read_to_string(path)?;
        let id = file_stem(path);

        // Schema failures degrade to defaults with the whole file as body,
        // matching how missing front matter is treated
        let (matter, body) = match Matter::parse_as::<ArticleMatter>(&text) {
            Ok((matter, body)) => (matter, body),
            Err(e) => {
                tracing::warn!("Invalid front matter in {:?}: {}", path, e);
                (ArticleMatter::default(), text.as_str())
            }
        };

        let content_html = self.renderer.render(body)?;

        Ok(Article {
            id,
            category,
            title: matter.title,
            description: matter.description,
            date: matter.date,
            kind: matter.kind,
            order: matter.order,
            number: matter.number,
            content_html: Some(content_html),
            content: include_raw.then(|| body.to_string()),
            extra: matter.extra,
        })
    }
}

/// Check if a file is a markdown file
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

pub(super) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

/// Ids come from URLs; only accept plain file stems so a lookup can never
/// walk out of the content directory.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
