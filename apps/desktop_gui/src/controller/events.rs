//! UI/backend events and error modeling for the profile app.

use profile_client::{Notice, ProfileView};
use shared::error::{ApiError, ErrorCode};

pub enum UiEvent {
    Info(String),
    ViewUpdated(ProfileView),
    Notice(Notice),
    AvatarLoaded { url: String, image: PreviewImage },
    AvatarFailed { url: String, reason: String },
    Error(UiError),
}

/// Decoded avatar pixels, ready to become a texture on the UI thread.
#[derive(Clone)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

pub fn decode_preview_image(bytes: &[u8]) -> Result<PreviewImage, String> {
    let dynamic = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let resized = dynamic.thumbnail(256, 256).to_rgba8();
    let width = resized.width() as usize;
    let height = resized.height() as usize;
    Ok(PreviewImage {
        width,
        height,
        rgba: resized.into_raw(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Rejected,
    Transport,
    Upload,
    Busy,
    Session,
    Startup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Upload,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn startup(message: impl Into<String>) -> Self {
        Self {
            category: UiErrorCategory::Startup,
            context: UiErrorContext::BackendStartup,
            message: message.into(),
        }
    }

    pub fn from_api(context: UiErrorContext, error: ApiError) -> Self {
        let category = match error.code {
            ErrorCode::Rejected => UiErrorCategory::Rejected,
            ErrorCode::Transport => UiErrorCategory::Transport,
            ErrorCode::Upload => UiErrorCategory::Upload,
            ErrorCode::Busy => UiErrorCategory::Busy,
            ErrorCode::NotSignedIn => UiErrorCategory::Session,
        };
        Self {
            category,
            context,
            message: error.message,
        }
    }

    /// Rejections and transport failures already reach the user through the
    /// error line or a toast; upload failures through the caption.
    pub fn needs_banner(&self) -> bool {
        matches!(
            self.category,
            UiErrorCategory::Busy | UiErrorCategory::Session | UiErrorCategory::Startup
        )
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_codes_map_to_categories() {
        let err = UiError::from_api(
            UiErrorContext::Update,
            ApiError::new(ErrorCode::Rejected, "User not found!"),
        );
        assert_eq!(err.category(), UiErrorCategory::Rejected);
        assert_eq!(err.context(), UiErrorContext::Update);
        assert_eq!(err.message(), "User not found!");
        assert!(!err.needs_banner());

        let err = UiError::from_api(
            UiErrorContext::Delete,
            ApiError::new(ErrorCode::Busy, "another profile operation is still in flight"),
        );
        assert!(err.needs_banner());
    }

    #[test]
    fn upload_failures_stay_out_of_the_banner() {
        let err = UiError::from_api(
            UiErrorContext::Upload,
            ApiError::new(ErrorCode::Upload, "upload failed: too large"),
        );
        assert_eq!(err.category(), UiErrorCategory::Upload);
        assert!(!err.needs_banner());
    }

    #[test]
    fn decodes_png_into_rgba_preview() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode png");

        let preview = decode_preview_image(&png).expect("decode");
        assert_eq!((preview.width, preview.height), (4, 2));
        assert_eq!(&preview.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode_preview_image(b"not an image").is_err());
    }
}
