//! Validate content front matter against the typed schemas

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::content::{is_markdown_file, ArticleMatter, Category, Matter, PatchNoteMatter};
use crate::Site;

/// One schema violation: the file and what is wrong with it
pub struct Problem {
    pub path: PathBuf,
    pub message: String,
}

/// Validate every content file and fail when anything is invalid
pub fn run(site: &Site) -> Result<()> {
    let (checked, problems) = validate_tree(&site.content_dir);

    for problem in &problems {
        println!("invalid {}: {}", problem.path.display(), problem.message);
    }

    if !problems.is_empty() {
        anyhow::bail!(
            "{} of {} content files failed validation",
            problems.len(),
            checked
        );
    }

    println!("OK ({} files checked)", checked);
    Ok(())
}

/// Walk the content tree and collect schema violations
pub fn validate_tree(content_dir: &Path) -> (usize, Vec<Problem>) {
    let mut checked = 0;
    let mut problems = Vec::new();

    for category in Category::ALL {
        let dir = content_dir.join(category.dir_name());
        scan::<ArticleMatter>(&dir, &mut checked, &mut problems);
    }
    scan::<PatchNoteMatter>(&content_dir.join("patch-notes"), &mut checked, &mut problems);

    (checked, problems)
}

fn scan<T>(dir: &Path, checked: &mut usize, problems: &mut Vec<Problem>)
where
    T: serde::de::DeserializeOwned + Default,
{
    if !dir.exists() {
        return;
    }

    for entry in WalkDir::new(dir).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                problems.push(Problem {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                });
                continue;
            }
        };
        let path = entry.path();
        if !is_markdown_file(path) {
            continue;
        }

        *checked += 1;
        if let Err(message) = validate_file::<T>(path) {
            problems.push(Problem {
                path: path.to_path_buf(),
                message,
            });
        }
    }
}

fn validate_file<T>(path: &Path) -> std::result::Result<(), String>
where
    T: serde::de::DeserializeOwned + Default,
{
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;

    // An opening delimiter without a closing one would silently parse as
    // "no front matter"; the checker is where that gets surfaced.
    let opens = text
        .lines()
        .next()
        .map(|l| l.trim_end() == "---")
        .unwrap_or(false);
    if opens && Matter::split(&text).is_none() {
        return Err("front-matter block is never closed".to_string());
    }

    Matter::parse_as::<T>(&text)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(base: &Path, rel: &str, text: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_valid_tree_passes() {
        let dir = tempdir().unwrap();
        write(dir.path(), "rules/a.md", "---\ntitle: A\norder: 1\n---\nBody\n");
        write(
            dir.path(),
            "patch-notes/1.0.md",
            "---\ndate: 2026-01-01\nsections:\n  - type: added\n    items:\n      - One\n---\n",
        );

        let (checked, problems) = validate_tree(dir.path());
        assert_eq!(checked, 2);
        assert!(problems.is_empty());
    }

    #[test]
    fn test_reports_wrong_field_types() {
        let dir = tempdir().unwrap();
        write(dir.path(), "rules/bad.md", "---\ntitle: Bad\norder: second\n---\n");

        let (checked, problems) = validate_tree(dir.path());
        assert_eq!(checked, 1);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].path.ends_with("bad.md"));
    }

    #[test]
    fn test_reports_unterminated_front_matter() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "announcements/open.md",
            "---\ntitle: Open\nno closing line\n",
        );

        let (_, problems) = validate_tree(dir.path());
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("never closed"));
    }

    #[test]
    fn test_patch_note_schema_is_enforced() {
        let dir = tempdir().unwrap();
        write(dir.path(), "patch-notes/bad.md", "---\nsections: not-a-list\n---\n");

        let (_, problems) = validate_tree(dir.path());
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn test_missing_directories_are_fine() {
        let dir = tempdir().unwrap();
        let (checked, problems) = validate_tree(dir.path());
        assert_eq!(checked, 0);
        assert!(problems.is_empty());
    }
}
