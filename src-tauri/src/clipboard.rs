use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_SUFFIX: &str = ";base64";

#[derive(Debug, Error)]
pub(crate) enum ClipboardError {
    #[error("clipboard payload is not a data URL")]
    NotDataUrl,
    #[error("clipboard data URL is not base64 encoded")]
    NotBase64,
    #[error("failed to decode clipboard base64 payload: {source}")]
    Base64 {
        #[source]
        source: base64::DecodeError,
    },
    #[error("failed to decode clipboard image: {source}")]
    Image {
        #[source]
        source: image::ImageError,
    },
    #[error("failed to access system clipboard: {source}")]
    Unavailable {
        #[source]
        source: arboard::Error,
    },
    #[error("failed to write image to clipboard: {source}")]
    Write {
        #[source]
        source: arboard::Error,
    },
}

pub(crate) type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodedImage {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) rgba: Vec<u8>,
}

pub(crate) trait ClipboardBackend {
    fn write_image(&self, image: &DecodedImage) -> ClipboardResult<()>;
}

#[derive(Debug, Default)]
pub(crate) struct SystemClipboard;

impl ClipboardBackend for SystemClipboard {
    fn write_image(&self, image: &DecodedImage) -> ClipboardResult<()> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|source| ClipboardError::Unavailable { source })?;
        clipboard
            .set_image(arboard::ImageData {
                width: image.width,
                height: image.height,
                bytes: Cow::Borrowed(&image.rgba),
            })
            .map_err(|source| ClipboardError::Write { source })
    }
}

pub(crate) fn decode_data_url(data_url: &str) -> ClipboardResult<DecodedImage> {
    let body = data_url
        .trim()
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or(ClipboardError::NotDataUrl)?;
    let (header, payload) = body.split_once(',').ok_or(ClipboardError::NotDataUrl)?;
    if !header.to_ascii_lowercase().ends_with(BASE64_SUFFIX) {
        return Err(ClipboardError::NotBase64);
    }

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|source| ClipboardError::Base64 { source })?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|source| ClipboardError::Image { source })?
        .to_rgba8();

    Ok(DecodedImage {
        width: decoded.width() as usize,
        height: decoded.height() as usize,
        rgba: decoded.into_raw(),
    })
}

pub(crate) fn copy_data_url_image(
    backend: &impl ClipboardBackend,
    data_url: &str,
) -> ClipboardResult<()> {
    let image = decode_data_url(data_url)?;
    backend.write_image(&image)
}
