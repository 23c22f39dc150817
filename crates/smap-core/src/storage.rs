//! Writing generated sitemaps to disk.
//!
//! Every file is written atomically (temp file + rename) so a web server
//! serving the output directory never sees a half-written document.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::EngineConfig;
use crate::generator::{SitemapOutput, SourceSitemapSet, part_filename};
use crate::{Error, Result};

/// Writes sitemap documents into an output directory.
#[derive(Debug, Clone)]
pub struct SitemapWriter {
    root: PathBuf,
    index_filename: String,
}

impl SitemapWriter {
    /// Create a writer for `root`; the main document is named `index_filename`.
    pub fn new(root: impl Into<PathBuf>, index_filename: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_filename: index_filename.into(),
        }
    }

    /// A writer for the configured output directory, if any.
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        config
            .generator
            .output_dir
            .as_ref()
            .map(|dir| Self::new(dir, config.generator.index_filename.clone()))
    }

    /// Output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Atomically write one file into the output directory.
    pub fn write_file(&self, filename: &str, contents: &str) -> Result<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(Error::Storage(format!("Invalid sitemap file name '{filename}'")));
        }
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::Storage(format!("Failed to create output directory: {e}")))?;

        let path = self.root.join(filename);
        let tmp_path = self.root.join(format!(".{filename}.tmp"));
        fs::write(&tmp_path, contents)
            .map_err(|e| Error::Storage(format!("Failed to write temp file for {filename}: {e}")))?;

        #[cfg(target_os = "windows")]
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| Error::Storage(format!("Failed to remove existing {filename}: {e}")))?;
        }

        fs::rename(&tmp_path, &path)
            .map_err(|e| Error::Storage(format!("Failed to commit {filename}: {e}")))?;

        debug!(path = %path.display(), bytes = contents.len(), "Wrote sitemap file");
        Ok(path)
    }

    /// Write the main document and any parts.
    ///
    /// Part files left over from an earlier, larger run are removed.
    pub fn write_output(&self, output: &SitemapOutput) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(output.parts().len() + 1);
        for part in output.parts() {
            written.push(self.write_file(&part.filename(), &part.body)?);
        }
        written.push(self.write_file(&self.index_filename, output.document())?);
        self.remove_stale_parts(output.parts().len())?;
        Ok(written)
    }

    /// Write per-source files and their index.
    pub fn write_source_set(&self, set: &SourceSitemapSet) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(set.sitemaps.len() + 1);
        for sitemap in &set.sitemaps {
            written.push(self.write_file(&sitemap.filename, &sitemap.body)?);
        }
        written.push(self.write_file(&self.index_filename, &set.index)?);
        Ok(written)
    }

    fn remove_stale_parts(&self, keep: usize) -> Result<()> {
        let mut index = keep + 1;
        loop {
            let path = self.root.join(part_filename(index));
            if !path.exists() {
                return Ok(());
            }
            fs::remove_file(&path)
                .map_err(|e| Error::Storage(format!("Failed to remove stale part {index}: {e}")))?;
            debug!(path = %path.display(), "Removed stale sitemap part");
            index += 1;
        }
    }
}
