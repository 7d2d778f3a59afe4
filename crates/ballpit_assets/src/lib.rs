//! Ballpit's asset resource layer
//!
//! This crate turns the game's raw files into something the editor can use:
//!  * compressed image containers ([`image`]),
//!  * packed sprite atlas indices ([`atlas`]),
//!  * XML resource manifests ([`manifest`]),
//!  * JSON item and template descriptors ([`descriptor`]),
//!
//! and ties them together with the [`ResourceCache`], which discovers all of them in a game
//! directory and decodes them on demand.

pub mod atlas;
pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod image;
pub mod manifest;

#[doc(inline)]
pub use atlas::{AtlasEntry, AtlasRect};
#[doc(inline)]
pub use cache::*;
#[doc(inline)]
pub use config::{AssetConfig, TemplateCategory};
#[doc(inline)]
pub use descriptor::Descriptor;
#[doc(inline)]
pub use error::ResourceError;
#[doc(inline)]
pub use image::{decode_image, decode_image_file, encode_image, DecodedImage};
