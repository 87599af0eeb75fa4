use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AppError, AppResult};
use crate::models::ImageUpload;

/// Shown for listings posted without a picture.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.svg";
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Embeds an uploaded image as a `data:` URL, or falls back to the
/// placeholder when nothing was attached.
pub fn image_url_for(upload: Option<&ImageUpload>) -> AppResult<String> {
    let upload = match upload {
        Some(u) if !u.data.is_empty() => u,
        _ => return Ok(PLACEHOLDER_IMAGE.to_string()),
    };

    let content_type = upload.content_type.trim().to_ascii_lowercase();
    if !content_type.starts_with("image/") {
        return Err(AppError::InvalidInput(format!(
            "image content type must be image/*, got '{}'",
            upload.content_type
        )));
    }
    if upload.data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::InvalidInput(format!(
            "image is {} bytes, limit is {}",
            upload.data.len(),
            MAX_IMAGE_BYTES
        )));
    }

    Ok(format!("data:{};base64,{}", content_type, STANDARD.encode(&upload.data)))
}
