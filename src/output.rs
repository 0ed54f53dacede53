use crate::error::{CaptureError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Temporary recording target, truncated on creation and overwritten per recording
#[derive(Debug, Clone)]
pub struct OutputFile {
    path: PathBuf,
}

impl OutputFile {
    /// Create `dir/name`, replacing any existing file
    pub async fn create<P: AsRef<Path>>(dir: P, name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .map_err(|e| output_error(dir, e))?;

        let path = dir.join(name);
        fs::File::create(&path)
            .await
            .map_err(|e| output_error(&path, e))?;

        debug!("Created temporary output file {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub async fn size(&self) -> Result<u64> {
        let metadata = fs::metadata(&self.path)
            .await
            .map_err(|e| output_error(&self.path, e))?;
        Ok(metadata.len())
    }

    /// Copy the recording to `dir/name`, replacing an existing file there
    pub async fn persist_to<P: AsRef<Path>>(&self, dir: P, name: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .map_err(|e| output_error(dir, e))?;

        let destination = dir.join(name);
        fs::copy(&self.path, &destination)
            .await
            .map_err(|e| output_error(&destination, e))?;

        info!(
            "Saved recording {} to {}",
            self.path.display(),
            destination.display()
        );
        Ok(destination)
    }
}

/// File type offered when saving a recording
#[derive(Debug, Clone, PartialEq)]
pub struct FileTypeChoice {
    pub label: String,
    pub extensions: Vec<String>,
}

/// Where and how a finished recording would be saved
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSuggestion {
    pub suggested_name: String,
    pub file_types: Vec<FileTypeChoice>,
    pub start_location: Option<PathBuf>,
}

impl SaveSuggestion {
    /// MP4 suggestion rooted at the user's video directory
    pub fn mp4(suggested_name: &str) -> Self {
        Self {
            suggested_name: suggested_name.to_string(),
            file_types: vec![FileTypeChoice {
                label: "MP4 movie".to_string(),
                extensions: vec![".mp4".to_string()],
            }],
            start_location: dirs::video_dir(),
        }
    }
}

fn output_error(path: &Path, source: std::io::Error) -> CaptureError {
    CaptureError::OutputFile {
        path: path.display().to_string(),
        source,
    }
}
