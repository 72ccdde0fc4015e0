//! Content module - front matter, markdown rendering, and accessors

mod article;
mod markdown;
mod matter;
mod patchnotes;
mod store;

pub use article::{Article, ArticleMatter, Category, UnknownCategory};
pub use markdown::MarkdownRenderer;
pub use matter::Matter;
pub use patchnotes::{PatchNote, PatchNoteMatter, PatchSection, SectionMatter};
pub use store::{is_markdown_file, ContentStore};
