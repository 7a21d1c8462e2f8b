use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;
use crate::types::Document;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Loads plain-text source documents from a directory tree.
pub struct DataProcessor {
    max_file_bytes: u64,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self { max_file_bytes: 5 * 1024 * 1024 }
    }
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_max_file_bytes(max_file_bytes: u64) -> Self { Self { max_file_bytes } }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        self.load_files(data_dir, self.list_text_files(data_dir))
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Document>> {
        let mut files = self.list_text_files(data_dir);
        if files.len() > limit { files.truncate(limit); info!("Limited to first {} files", limit); }
        self.load_files(data_dir, files)
    }

    fn load_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<Document>> {
        if !data_dir.is_dir() {
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, format!("{} is not a directory", data_dir.display())).into());
        }
        if files.is_empty() {
            warn!("No .txt or .md files found under {}", data_dir.display());
            return Ok(vec![]);
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            let size = match fs::metadata(file_path) { Ok(m) => m.len(), Err(e) => { warn!("Skipping {}: {}", file_path.display(), e); continue; } };
            if size > self.max_file_bytes {
                warn!("Skipping {}: {} bytes exceeds the {} byte limit", file_path.display(), size, self.max_file_bytes);
                continue;
            }
            let content = match self.read_file_content(file_path) { Ok(c) => c, Err(e) => { warn!("Skipping {}: {}", file_path.display(), e); continue; } };
            if content.trim().is_empty() { warn!("Skipping empty file {}", file_path.display()); continue; }
            info!("Loaded file {}/{}: {} ({:.1}KB)", file_index + 1, files.len(), file_path.display(), size as f64 / 1024.0);
            let source = file_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            documents.push(
                Document::new(self.extract_doc_id(file_path, data_dir), content)
                    .with_metadata("source", source)
                    .with_metadata("doc_path", file_path.to_string_lossy().to_string())
                    .with_metadata("category", self.get_facet_from_path(file_path, data_dir)),
            );
        }
        info!("Loaded {} documents from {}", documents.len(), data_dir.display());
        Ok(documents)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    /// Path relative to the data directory, with `/` separators.
    fn extract_doc_id(&self, file_path: &Path, data_dir: &Path) -> String {
        let relative_path = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        relative_path.components().map(|c| c.as_os_str().to_string_lossy().to_string()).collect::<Vec<_>>().join("/")
    }

    fn get_facet_from_path(&self, file_path: &Path, data_dir: &Path) -> String {
        let relative_path = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        match relative_path.parent().and_then(|p| p.to_str()) {
            Some(facet) if !facet.is_empty() => format!("/{}", facet.replace('\\', "/")),
            _ => "/misc".to_string(),
        }
    }

    fn list_text_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext)) { files.push(path.to_path_buf()); }
        }
        files.sort(); files
    }
}
