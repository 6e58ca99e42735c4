// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire codec: EOF-delimited image frames over a byte stream.
//
// A request is the raw bytes of a JPEG or PNG file followed by the literal
// ASCII marker `EOF`. The reply is the encoded result streamed in
// `buffer_size` chunks; end-of-reply is signalled by shutting down the
// write half, so the reply carries no trailing marker.

use image::{DynamicImage, ImageFormat, RgbaImage};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use papercrop_core::{PapercropError, Result};

/// End-of-request marker sent by clients after the image bytes.
pub const EOF_MARKER: &[u8] = b"EOF";

/// The image formats the service accepts and preserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Map a detected `image` crate format, rejecting everything that is
    /// not JPEG or PNG.
    fn from_format(format: ImageFormat) -> Result<Self> {
        match format {
            ImageFormat::Jpeg => Ok(Self::Jpeg),
            ImageFormat::Png => Ok(Self::Png),
            other => Err(PapercropError::UnsupportedFormat(format!("{other:?}"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read one image frame: accumulate until the `EOF` marker appears, strip
/// it, and decode what came before.
///
/// # Errors
///
/// `Decode` when the peer closes before sending the marker or the bytes
/// are not a valid image; `UnsupportedFormat` when they decode to
/// something other than JPEG or PNG.
pub async fn read_image<S>(stream: &mut S, buffer_size: usize) -> Result<(RgbaImage, ImageKind)>
where
    S: AsyncRead + Unpin,
{
    let mut data: Vec<u8> = Vec::with_capacity(buffer_size * 8);
    let mut chunk = vec![0u8; buffer_size];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(PapercropError::Decode(
                "connection closed before end-of-image marker".into(),
            ));
        }
        data.extend_from_slice(&chunk[..n]);

        if let Some(pos) = find_marker(&data) {
            data.truncate(pos);
            break;
        }
    }

    debug!(bytes = data.len(), "end of image data detected");
    decode_image(&data)
}

/// Encode the image in the requested format and stream it out in
/// `buffer_size` chunks, then shut the write half down to signal
/// end-of-reply.
pub async fn write_image<S>(
    stream: &mut S,
    img: &RgbaImage,
    kind: ImageKind,
    buffer_size: usize,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let data = encode_image(img, kind)?;

    for chunk in data.chunks(buffer_size) {
        stream.write_all(chunk).await?;
    }
    stream.flush().await?;
    stream.shutdown().await?;

    info!(bytes = data.len(), format = %kind, "image sent");
    Ok(())
}

/// Decode a full image byte buffer, auto-detecting the format.
pub fn decode_image(data: &[u8]) -> Result<(RgbaImage, ImageKind)> {
    let format = image::guess_format(data)
        .map_err(|e| PapercropError::Decode(format!("format detection: {e}")))?;
    let kind = ImageKind::from_format(format)?;

    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| PapercropError::Decode(e.to_string()))?;

    info!(format = %kind, width = img.width(), height = img.height(), "image decoded");
    Ok((img.to_rgba8(), kind))
}

/// Encode an RGBA image into the given format with default quality.
pub fn encode_image(img: &RgbaImage, kind: ImageKind) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    match kind {
        ImageKind::Png => {
            DynamicImage::ImageRgba8(img.clone())
                .write_to(&mut cursor, ImageFormat::Png)
                .map_err(|e| PapercropError::Encode(e.to_string()))?;
        }
        ImageKind::Jpeg => {
            // The JPEG encoder rejects alpha; flatten to RGB first.
            DynamicImage::ImageRgba8(img.clone())
                .to_rgb8()
                .write_to(&mut cursor, ImageFormat::Jpeg)
                .map_err(|e| PapercropError::Encode(e.to_string()))?;
        }
    }

    Ok(buffer)
}

/// Position of the first `EOF` marker in `data`, if present.
fn find_marker(data: &[u8]) -> Option<usize> {
    data.windows(EOF_MARKER.len())
        .position(|window| window == EOF_MARKER)
}
