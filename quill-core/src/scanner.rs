use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::collab::PageIndex;
use crate::error::ScanError;

const PAGE_EXTENSION: &str = "html";

/// Page index backed by a directory of pre-rendered `.html` pages.
///
/// `Guides/Setup.html` is the page `Guides/Setup`.
#[derive(Debug, Clone)]
pub struct ContentDir {
    root: PathBuf,
    pages: Vec<String>,
}

impl ContentDir {
    pub fn scan<P: AsRef<Path>>(root: P) -> Result<Self, ScanError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ScanError::MissingDir(root));
        }

        let mut pages = Vec::new();
        for path in get_all_page_files(&root) {
            let relative = path
                .strip_prefix(&root)
                .map_err(|_| ScanError::InvalidPath(path.clone()))?;
            pages.push(page_name(relative));
        }
        pages.sort();

        tracing::debug!("found {} pages in {}", pages.len(), root.display());
        Ok(Self { root, pages })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn contains(&self, page: &str) -> bool {
        self.pages.iter().any(|p| p == page)
    }

    /// Where `page` lives on disk, if it is a page of this directory.
    pub fn path_for(&self, page: &str) -> Option<PathBuf> {
        if !self.contains(page) {
            return None;
        }
        let mut path = self.root.clone();
        let mut segments = page.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                // The name may itself contain dots, e.g. `Release 1.2`
                path.push(format!("{}.{}", segment, PAGE_EXTENSION));
            }
        }
        Some(path)
    }

    pub fn read_page(&self, page: &str) -> Result<Option<String>, ScanError> {
        match self.path_for(page) {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}

impl PageIndex for ContentDir {
    fn page_names(&self) -> Vec<String> {
        self.pages.clone()
    }
}

fn page_name(relative: &Path) -> String {
    let segments: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    segments.join("/")
}

fn get_all_page_files<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == PAGE_EXTENSION)
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}
