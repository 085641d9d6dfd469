/// Profile image handling
///
/// Uploads are checked by decoding them, never by their declared content
/// type. Accepted images are downscaled to fit 300x300 and written as PNG
/// under `<media root>/profile_pics/`.
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

pub const PROFILE_PICS_DIR: &str = "profile_pics";

/// Profile images larger than this in either dimension are downscaled
pub const AVATAR_MAX_SIZE: u32 = 300;

pub const INVALID_IMAGE: &str = "Upload a valid image.";

const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::WebP,
];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("File size exceeds limit: {0} bytes (max: {1} bytes)")]
    FileSizeTooLarge(usize, usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Processing(#[from] image::ImageError),
}

impl MediaError {
    /// Message shown next to the `image` field, if this is the uploader's fault
    pub fn field_message(&self) -> Option<String> {
        match self {
            MediaError::InvalidImage(_) => Some(INVALID_IMAGE.to_string()),
            MediaError::FileSizeTooLarge(_, max) => Some(format!(
                "The uploaded image is too large (max {} bytes).",
                max
            )),
            MediaError::Io(_) | MediaError::Processing(_) => None,
        }
    }
}

/// A decoded upload that passed validation
pub struct ValidImage {
    pub format: ImageFormat,
    image: DynamicImage,
}

#[cfg(test)]
impl ValidImage {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Decode `bytes` and accept only the supported raster formats.
pub fn validate_image(bytes: &[u8]) -> Result<ValidImage, MediaError> {
    let format = image::guess_format(bytes)
        .map_err(|e| MediaError::InvalidImage(e.to_string()))?;
    if !ALLOWED_FORMATS.contains(&format) {
        return Err(MediaError::InvalidImage(format!("{:?} not allowed", format)));
    }

    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MediaError::InvalidImage(e.to_string()))?;

    Ok(ValidImage { format, image })
}

/// Downscale to fit within `max` x `max`, preserving aspect ratio. Never upscales.
fn fit_within(image: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max && height <= max {
        return image;
    }
    image.resize(max, max, FilterType::Lanczos3)
}

/// Local-disk media storage
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    max_upload_bytes: usize,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, max_upload_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Size check plus decode, off the async executor
    pub async fn validate_upload(&self, bytes: Vec<u8>) -> Result<ValidImage, MediaError> {
        if bytes.len() > self.max_upload_bytes {
            return Err(MediaError::FileSizeTooLarge(
                bytes.len(),
                self.max_upload_bytes,
            ));
        }

        tokio::task::spawn_blocking(move || validate_image(&bytes))
            .await
            .map_err(|e| MediaError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    /// Write a validated image and return its reference relative to the media root.
    pub async fn save_profile_image(&self, upload: ValidImage) -> Result<String, MediaError> {
        let dir = self.root.join(PROFILE_PICS_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.png", Uuid::new_v4());
        let path = dir.join(&file_name);

        tokio::task::spawn_blocking(move || {
            let resized = fit_within(upload.image, AVATAR_MAX_SIZE);
            resized.save_with_format(&path, ImageFormat::Png)
        })
        .await
        .map_err(|e| MediaError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        Ok(format!("{}/{}", PROFILE_PICS_DIR, file_name))
    }

    /// Best-effort removal of a stored image, used when the profile write fails.
    pub async fn discard(&self, reference: &str) {
        let path = self.root.join(reference);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), "Failed to remove orphaned image: {}", e);
        }
    }
}
