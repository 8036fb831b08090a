//! Source document discovery and reading.

use ragdesk_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Kinds of document a knowledge base can learn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    PlainText,
    Markdown,
    Python,
}

impl SourceKind {
    /// Detect the kind from the file extension; `None` if unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("txt") => Some(Self::PlainText),
            Some("md") => Some(Self::Markdown),
            Some("py") => Some(Self::Python),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Markdown => "markdown",
            Self::Python => "python",
        }
    }
}

/// The full text of one source file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File name, used as the record's source id
    pub source_id: String,
    pub path: PathBuf,
    pub kind: SourceKind,
    pub text: String,
}

/// Read a supported file as UTF-8.
///
/// Text is kept verbatim; the chunker handles whitespace.
pub fn read_source(path: &Path) -> AppResult<SourceDocument> {
    let kind = SourceKind::from_path(path).ok_or_else(|| {
        AppError::Knowledge(format!("Unsupported file format: {}", path.display()))
    })?;

    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let source_id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SourceDocument {
        source_id,
        path: path.to_path_buf(),
        kind,
        text,
    })
}

/// Expand files and directories into the supported files beneath them.
///
/// Explicit file arguments are returned even when unsupported, so the caller
/// can report them. Directory walks skip hidden entries and unsupported
/// extensions silently. Results are sorted within each directory.
pub fn collect_files(paths: &[PathBuf], include: &[String], exclude: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let walker = WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
                .filter_map(|e| e.ok());

            for entry in walker {
                let entry_path = entry.path();
                if entry.file_type().is_file()
                    && SourceKind::from_path(entry_path).is_some()
                    && should_include(entry_path, include, exclude)
                {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else if should_include(path, include, exclude) {
            files.push(path.clone());
        }
    }

    files
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// Check if a file should be included based on substring patterns.
fn should_include(path: &Path, include: &[String], exclude: &[String]) -> bool {
    let path_str = path.to_string_lossy();

    if exclude.iter().any(|pattern| path_str.contains(pattern.as_str())) {
        return false;
    }

    include.is_empty() || include.iter().any(|pattern| path_str.contains(pattern.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_kind_detection() {
        assert_eq!(SourceKind::from_path(Path::new("a.md")), Some(SourceKind::Markdown));
        assert_eq!(SourceKind::from_path(Path::new("a.txt")), Some(SourceKind::PlainText));
        assert_eq!(SourceKind::from_path(Path::new("a.py")), Some(SourceKind::Python));
        assert_eq!(SourceKind::from_path(Path::new("a.pdf")), None);
        assert_eq!(SourceKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_read_source_uses_file_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("contacts.md");
        fs::write(&path, "# Contacts\nReception: ext. 100\n").unwrap();

        let doc = read_source(&path).unwrap();
        assert_eq!(doc.source_id, "contacts.md");
        assert_eq!(doc.kind, SourceKind::Markdown);
        assert!(doc.text.contains("Reception"));
    }

    #[test]
    fn test_read_source_rejects_unsupported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scan.pdf");
        fs::write(&path, "%PDF").unwrap();

        let err = read_source(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn test_collect_files_walks_directories() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir_all(docs.join("nested")).unwrap();
        fs::create_dir_all(docs.join(".git")).unwrap();
        fs::write(docs.join("b.md"), "b").unwrap();
        fs::write(docs.join("a.txt"), "a").unwrap();
        fs::write(docs.join("nested").join("c.py"), "c").unwrap();
        fs::write(docs.join("image.png"), "x").unwrap();
        fs::write(docs.join(".git").join("HEAD.txt"), "x").unwrap();

        let files = collect_files(&[docs.clone()], &[], &[]);
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.md", "c.py"]);
    }

    #[test]
    fn test_collect_files_include_exclude() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("faq.md"), "q").unwrap();
        fs::write(temp.path().join("draft_faq.md"), "q").unwrap();
        fs::write(temp.path().join("hours.txt"), "h").unwrap();

        let dir = temp.path().to_path_buf();
        let files = collect_files(&[dir], &["faq".to_string()], &["draft".to_string()]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("faq.md"));
    }
}
