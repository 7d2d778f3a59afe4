//! Packed sprite atlas indices
//!
//! An atlas index names rectangles inside one shared atlas image:
//! ```c
//! struct AtlasIndex {
//!     u8  header[8];
//!     u32 count;
//!     AtlasRecord records[count];
//! }
//!
//! struct AtlasRecord {
//!     char id[64];   // NUL padded, not necessarily NUL terminated
//!     u32  x;
//!     u32  y;
//!     u32  width;
//!     u32  height;
//! }
//! ```
//! The atlas image itself sits next to the index, under the same name with the image
//! container extension. It's decoded once and shared by every sprite of the atlas.

use crate::ResourceError;
use ballpit_utils::{trim_nul_padding, AsciiDisplay, ByteCursor, OutOfRange};
use log::*;
use std::path::Path;

pub const HEADER_SIZE: usize = 8;
pub const RECORD_ID_SIZE: usize = 64;
pub const RECORD_SIZE: usize = RECORD_ID_SIZE + 16;

/// Pixel rectangle inside an atlas image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRect {
    /// Checks whether the rectangle lies fully inside an image of given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x as u64 + self.width as u64;
        let bottom = self.y as u64 + self.height as u64;
        right <= width as u64 && bottom <= height as u64
    }
}

/// A single named sprite inside an atlas. It doesn't own any pixels, just a view into the atlas
/// image identified by `atlas_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasEntry {
    pub id: String,
    pub rect: AtlasRect,
    pub atlas_id: String,
}

/// Parses an atlas index. Entries get `atlas_id` as their backing resource identifier.
///
/// Records with names that aren't valid UTF-8 are skipped with a warning. `path` is only used
/// for error reporting.
pub fn read_atlas_index(
    path: &Path,
    data: &[u8],
    atlas_id: &str,
) -> Result<Vec<AtlasEntry>, ResourceError> {
    let mut r = ByteCursor::new(data);
    let records = read_records(&mut r).map_err(|err| ResourceError::malformed(path, err))?;

    let mut entries = Vec::with_capacity(records.len());
    for (raw_id, rect) in records {
        let Ok(id) = std::str::from_utf8(trim_nul_padding(raw_id)) else {
            warn!(
                "Skipping atlas record with invalid name `{}` in `{}`",
                AsciiDisplay(raw_id),
                path.display()
            );
            continue;
        };

        entries.push(AtlasEntry {
            id: id.to_string(),
            rect,
            atlas_id: atlas_id.to_string(),
        });
    }

    Ok(entries)
}

fn read_records<'s>(r: &mut ByteCursor<'s>) -> Result<Vec<(&'s [u8], AtlasRect)>, OutOfRange> {
    r.skip(HEADER_SIZE)?;
    let count = r.read::<u32>()?;

    // Don't trust the count for preallocation, a broken file could claim billions of records
    let mut records = Vec::with_capacity((count as usize).min(r.remaining() / RECORD_SIZE));
    for _ in 0..count {
        let raw_id = r.read_bytes(RECORD_ID_SIZE)?;
        let rect = AtlasRect {
            x: r.read()?,
            y: r.read()?,
            width: r.read()?,
            height: r.read()?,
        };
        records.push((raw_id, rect));
    }

    if r.remaining() > 0 {
        trace!("{} unused bytes after atlas records", r.remaining());
    }

    Ok(records)
}

/// Test helper assembling an atlas index from `(id, rect)` pairs.
#[cfg(test)]
pub(crate) fn build_atlas_index(records: &[(&[u8], AtlasRect)]) -> Vec<u8> {
    let mut data = vec![0xAB; HEADER_SIZE];
    data.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for (id, rect) in records {
        let mut field = [0u8; RECORD_ID_SIZE];
        field[..id.len()].copy_from_slice(id);
        data.extend_from_slice(&field);
        for value in [rect.x, rect.y, rect.width, rect.height] {
            data.extend_from_slice(&value.to_le_bytes());
        }
    }
    data
}
