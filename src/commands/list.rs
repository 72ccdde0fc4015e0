//! List site content

use anyhow::Result;

use crate::content::{Article, Category, ContentStore, PatchNote};
use crate::Site;

/// List site content by category
pub fn run(site: &Site, which: &str) -> Result<()> {
    let store = site.store();

    match which {
        "all" => {
            for category in Category::ALL {
                print_category(&store, category)?;
            }
            print_patch_notes(&store)?;
        }
        "patch-notes" => {
            print_patch_notes(&store)?;
        }
        other => match other.parse::<Category>() {
            Ok(category) => print_category(&store, category)?,
            Err(e) => {
                let names: Vec<&str> = Category::ALL.iter().map(|c| c.dir_name()).collect();
                anyhow::bail!("{}. Available: all, patch-notes, {}", e, names.join(", "));
            }
        },
    }

    Ok(())
}

fn print_category(store: &ContentStore, category: Category) -> Result<()> {
    let articles = store.list(category)?;
    println!("{} ({}):", category, articles.len());
    for article in articles {
        println!("  {}", describe(&article));
    }
    Ok(())
}

fn print_patch_notes(store: &ContentStore) -> Result<()> {
    let notes = store.patch_notes()?;
    println!("patch-notes ({}):", notes.len());
    for note in notes {
        println!("  {}", describe_note(&note));
    }
    Ok(())
}

fn describe(article: &Article) -> String {
    let title = article.title.as_deref().unwrap_or(&article.id);
    match article.date.as_deref() {
        Some(date) => format!("{} - {} [{}]", date, title, article.id),
        None => format!("{} [{}]", title, article.id),
    }
}

fn describe_note(note: &PatchNote) -> String {
    let date = note.date.as_deref().unwrap_or("undated");
    let marker = if note.is_latest { " (latest)" } else { "" };
    format!("{} - {} [{}]{}", date, note.version, note.slug, marker)
}
