use std::path::{Path, PathBuf};

use thiserror::Error;

/// Per-file ceiling the backend tolerates for a single upload (1 GiB).
pub const MAX_FILE_BYTES: u64 = 1024 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp", "tif", "tiff"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    /// Landsat-style `.txt` metadata bundle.
    SpectralText,
    /// `.zip` archive of band files.
    SpectralArchive,
    Unsupported,
}

impl FileKind {
    pub fn is_spectral(self) -> bool {
        matches!(self, Self::SpectralText | Self::SpectralArchive)
    }
}

/// A file the user picked, described without reading its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub kind: FileKind,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let kind = classify_file(&path);
        Self {
            path,
            name,
            size_bytes,
            kind,
        }
    }
}

/// Which backend path a validated selection takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRoute {
    /// Asynchronous multispectral job (submit, then poll).
    Multispectral(Vec<SelectedFile>),
    /// Synchronous single-image disease prediction.
    Image(SelectedFile),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No files selected.")]
    Empty,
    #[error(
        "File too large ({:.1}MB). Maximum size is 1GB. Please compress your data or use a smaller file.",
        megabytes(.size_bytes)
    )]
    TooLarge { name: String, size_bytes: u64 },
    #[error("Unsupported file type. Please upload an image, .txt, or .zip file for multispectral analysis.")]
    Unsupported { name: String },
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / 1024.0 / 1024.0
}

pub fn classify_file(path: &Path) -> FileKind {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") => FileKind::SpectralText,
        Some("zip") => FileKind::SpectralArchive,
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => FileKind::Image,
        _ => FileKind::Unsupported,
    }
}

/// Refuses a single file above the per-file ceiling.
pub fn check_size(name: &str, size_bytes: u64, max_file_bytes: u64) -> Result<(), ValidationError> {
    if size_bytes > max_file_bytes {
        return Err(ValidationError::TooLarge {
            name: name.to_string(),
            size_bytes,
        });
    }
    Ok(())
}

/// Validate a selection and decide the backend path.
///
/// Spectral bundles always go through the job path; images only do when
/// `multispectral` mode is on, otherwise the first image is predicted directly.
pub fn plan_upload(
    files: &[SelectedFile],
    multispectral: bool,
    max_file_bytes: u64,
) -> Result<UploadRoute, ValidationError> {
    let first = files.first().ok_or(ValidationError::Empty)?;

    for file in files {
        check_size(&file.name, file.size_bytes, max_file_bytes)?;
    }

    if let Some(bad) = files.iter().find(|file| file.kind == FileKind::Unsupported) {
        return Err(ValidationError::Unsupported {
            name: bad.name.clone(),
        });
    }

    let has_spectral = files.iter().any(|file| file.kind.is_spectral());
    if has_spectral || multispectral {
        return Ok(UploadRoute::Multispectral(files.to_vec()));
    }

    Ok(UploadRoute::Image(first.clone()))
}
