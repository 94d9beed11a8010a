use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::browser::BrowserError;

/// Re-encodes an already loaded `<img>` through a canvas and returns a PNG data URL.
pub const RENDER_IMAGE_SCRIPT: &str = r#"
var imageElement = arguments[0];
var canvas = document.createElement('canvas');
canvas.width = imageElement.naturalWidth;
canvas.height = imageElement.naturalHeight;
canvas.getContext('2d').drawImage(imageElement, 0, 0);
return canvas.toDataURL('image/png');
"#;

/// Failure extracting one message's image. Never aborts the run.
#[derive(Debug, Error)]
pub enum ImageProcessingError {
    #[error("render failed: {0}")]
    Render(#[from] BrowserError),

    #[error("script returned no data URL")]
    NotDataUrl,

    #[error("data URL is not base64 encoded")]
    NotBase64,

    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Decode the payload of a `data:<mime>;base64,<payload>` URL. A bare base64 payload is
/// accepted as well.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, ImageProcessingError> {
    let payload = match url.split_once(',') {
        Some((header, payload)) => {
            if !header.ends_with(";base64") {
                return Err(ImageProcessingError::NotBase64);
            }
            payload
        }
        None => url,
    };
    Ok(STANDARD.decode(payload.trim())?)
}

/// Image files written next to the export, named by the SHA-256 of their bytes.
///
/// Identical images resolve to the same file. The directory is created on the first save.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate `bytes` as an image and persist them. Returns the file name.
    pub fn save(&self, bytes: &[u8]) -> Result<String, ImageProcessingError> {
        let format = image::guess_format(bytes)?;
        image::load_from_memory_with_format(bytes, format)?;

        let extension = format.extensions_str().first().copied().unwrap_or("png");
        let file_name = format!("{:x}.{}", Sha256::digest(bytes), extension);
        let path = self.dir.join(&file_name);

        fs::create_dir_all(&self.dir)
            .map_err(|source| ImageProcessingError::Io { path: self.dir.clone(), source })?;
        if !path.exists() {
            fs::write(&path, bytes).map_err(|source| ImageProcessingError::Io { path, source })?;
        }

        Ok(file_name)
    }
}
