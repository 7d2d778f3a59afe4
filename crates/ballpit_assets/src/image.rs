//! Compressed image containers
//!
//! ## Layout
//! ```c
//! struct Container {
//!     u8 outer_header[36];
//!     u8 frame[];            // zstd frame, see below for its decompressed contents
//! }
//!
//! struct Payload {
//!     u8  inner_header[36];
//!     u32 width;
//!     u32 height;
//!     u8  reserved[24];
//!     u8  rgba[width * height * 4];
//! }
//! ```
//! Neither header carries anything we need, so they're skipped on read and zeroed on write.
//!
//! Some files in the wild under-report their decompressed size in the frame header, which is
//! why decoding allocates twice the declared size. Frames declaring more than
//! [`MAX_PREALLOCATION`] bytes are decompressed as a stream instead.

use crate::{AtlasRect, ResourceError};
use ballpit_utils::{AnyResult, ByteCursor, OutOfRange};
use log::*;
use std::{fmt, fs, path::Path};
use zstd::zstd_safe;

pub const OUTER_HEADER_SIZE: usize = 36;
pub const INNER_HEADER_SIZE: usize = 36;
pub const RESERVED_SIZE: usize = 24;

/// Largest buffer allocated up front for a frame, based on its declared size. Bigger frames are
/// decompressed as a stream.
pub const MAX_PREALLOCATION: usize = 1 << 30;

/// Raw RGBA8 image, rows stored top to bottom.
///
/// The pixel buffer is always exactly `width * height * 4` bytes long.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Returns `None` if the buffer size doesn't match the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (rgba_size(width, height)? == pixels.len()).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Copies a sub-rectangle into a new image, or returns `None` if it doesn't fit.
    pub fn crop(&self, rect: AtlasRect) -> Option<DecodedImage> {
        if !rect.fits_within(self.width, self.height) {
            return None;
        }

        let row_size = rect.width as usize * 4;
        let mut pixels = Vec::with_capacity(row_size * rect.height as usize);
        for row in rect.y..rect.y + rect.height {
            let start = (row as usize * self.width as usize + rect.x as usize) * 4;
            pixels.extend_from_slice(&self.pixels[start..start + row_size]);
        }

        DecodedImage::new(rect.width, rect.height, pixels)
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &format_args!("[{} bytes]", self.pixels.len()))
            .finish()
    }
}

fn rgba_size(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

/// Reads and decodes a compressed image container from disk.
pub fn decode_image_file(path: impl AsRef<Path>) -> Result<DecodedImage, ResourceError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|err| ResourceError::file_open(path, err))?;
    decode_image(path, &data)
}

/// Decodes an in-memory container. `path` is only used for error reporting.
pub fn decode_image(path: &Path, data: &[u8]) -> Result<DecodedImage, ResourceError> {
    let mut container = ByteCursor::new(data);
    container
        .skip(OUTER_HEADER_SIZE)
        .map_err(|err| ResourceError::malformed(path, err))?;

    let payload = decompress_frame(path, container.remainder())?;

    let mut r = ByteCursor::new(&payload);
    let (width, height, rgba) =
        read_payload(&mut r).map_err(|err| ResourceError::malformed(path, err))?;

    if r.remaining() > 0 {
        trace!(
            "Ignoring {} trailing bytes in `{}`",
            r.remaining(),
            path.display()
        );
    }

    Ok(DecodedImage {
        width,
        height,
        pixels: rgba.to_vec(),
    })
}

fn read_payload<'s>(r: &mut ByteCursor<'s>) -> Result<(u32, u32, &'s [u8]), OutOfRange> {
    r.skip(INNER_HEADER_SIZE)?;
    let width = r.read::<u32>()?;
    let height = r.read::<u32>()?;
    r.skip(RESERVED_SIZE)?;

    // Dimensions that overflow are treated like any other truncated payload
    let size = rgba_size(width, height).unwrap_or(usize::MAX);
    Ok((width, height, r.read_bytes(size)?))
}

fn decompress_frame(path: &Path, frame: &[u8]) -> Result<Vec<u8>, ResourceError> {
    let declared = match zstd_safe::get_frame_content_size(frame) {
        Ok(Some(size)) => size,
        Ok(None) => return decompress_streaming(path, frame),
        Err(_) => {
            return Err(ResourceError::Decompression {
                path: path.into(),
                code: zstd_safe::CONTENTSIZE_ERROR,
            })
        }
    };

    // The declared size is only trusted up to the cap
    let capacity = match usize::try_from(declared)
        .ok()
        .and_then(|size| size.checked_mul(2))
    {
        Some(capacity) if capacity <= MAX_PREALLOCATION => capacity,
        _ => {
            debug!(
                "`{}` declares {declared} bytes, over the preallocation cap",
                path.display()
            );
            return decompress_streaming(path, frame);
        }
    };

    let mut output = Vec::<u8>::new();
    output
        .try_reserve_exact(capacity)
        .map_err(|_| ResourceError::Decompression {
            path: path.into(),
            code: zstd_safe::CONTENTSIZE_ERROR,
        })?;

    match zstd_safe::decompress(&mut output, frame) {
        Ok(written) => {
            if written as u64 != declared {
                debug!(
                    "`{}` declared {declared} bytes, but decompressed into {written}",
                    path.display()
                );
            }
            Ok(output)
        }
        Err(code) => {
            debug!(
                "Decompression of `{}` failed: {}",
                path.display(),
                zstd_safe::get_error_name(code)
            );
            Err(ResourceError::Decompression {
                path: path.into(),
                code: code as u64,
            })
        }
    }
}

/// Frames without a usable declared size get decoded with a growing buffer instead.
fn decompress_streaming(path: &Path, frame: &[u8]) -> Result<Vec<u8>, ResourceError> {
    trace!("Decompressing `{}` as a stream", path.display());

    zstd::stream::decode_all(frame).map_err(|err| {
        debug!("Streaming decompression of `{}` failed: {err}", path.display());
        ResourceError::Decompression {
            path: path.into(),
            code: zstd_safe::CONTENTSIZE_UNKNOWN,
        }
    })
}

/// Packs an image into a container that [`decode_image`] reads back unchanged.
pub fn encode_image(image: &DecodedImage, level: i32) -> AnyResult<Vec<u8>> {
    let mut payload =
        Vec::with_capacity(INNER_HEADER_SIZE + 8 + RESERVED_SIZE + image.pixels.len());
    payload.extend_from_slice(&[0; INNER_HEADER_SIZE]);
    payload.extend_from_slice(&image.width.to_le_bytes());
    payload.extend_from_slice(&image.height.to_le_bytes());
    payload.extend_from_slice(&[0; RESERVED_SIZE]);
    payload.extend_from_slice(&image.pixels);

    let frame = zstd::bulk::compress(&payload, level)?;

    let mut container = Vec::with_capacity(OUTER_HEADER_SIZE + frame.len());
    container.extend_from_slice(&[0; OUTER_HEADER_SIZE]);
    container.extend_from_slice(&frame);
    Ok(container)
}
