//! Picture bytes ready for embedding.

use crate::error::{DocumentError, DocumentResult};
use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;

/// An image in a format presentation viewers render natively.
#[derive(Debug, Clone)]
pub(crate) struct MediaBlob {
    /// File extension used for the package part, without the dot
    pub ext: &'static str,
    pub bytes: Vec<u8>,
}

/// Read a picture from disk, re-encoding it to PNG unless it is already
/// PNG, JPEG, GIF or BMP.
pub(crate) fn load_picture(path: &Path) -> DocumentResult<MediaBlob> {
    let bytes = std::fs::read(path)?;
    let image_err = |message: String| DocumentError::Image {
        path: path.to_path_buf(),
        message,
    };

    let format = image::guess_format(&bytes).map_err(|e| image_err(e.to_string()))?;
    let ext = match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        other => {
            tracing::debug!(path = %path.display(), format = ?other, "Re-encoding picture to PNG");
            let decoded =
                image::load_from_memory(&bytes).map_err(|e| image_err(e.to_string()))?;
            let mut out = Cursor::new(Vec::new());
            decoded
                .write_to(&mut out, ImageFormat::Png)
                .map_err(|e| image_err(e.to_string()))?;
            return Ok(MediaBlob {
                ext: "png",
                bytes: out.into_inner(),
            });
        }
    };

    Ok(MediaBlob { ext, bytes })
}

/// Content type for a media extension produced by [`load_picture`].
pub(crate) fn content_type(ext: &str) -> &'static str {
    match ext {
        "jpeg" | "jpg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/png",
    }
}
