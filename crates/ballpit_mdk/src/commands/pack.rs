use anyhow::anyhow;
use ballpit_assets::{encode_image, DecodedImage};
use ballpit_utils::{ok, AnyResult};
use clap::Args;
use log::info;
use std::{fs, path::PathBuf};

#[derive(Args)]
pub struct PackCommand {
    /// Image to pack (anything the `image` crate can open)
    pub input: PathBuf,
    /// Output container file
    #[arg(long, short = 'o')]
    pub output: PathBuf,
    /// Zstandard compression level
    #[arg(long, default_value_t = 19)]
    pub level: i32,
}

impl crate::Command for PackCommand {
    fn run(self) -> AnyResult {
        let rgba = image::open(&self.input)?.into_rgba8();
        let (width, height) = rgba.dimensions();
        let decoded = DecodedImage::new(width, height, rgba.into_raw())
            .ok_or_else(|| anyhow!("{:?} is too large to pack", self.input))?;

        let packed = encode_image(&decoded, self.level)?;
        fs::write(&self.output, &packed)?;

        info!(
            "Packed {:?} ({width}x{height}) into {:?}, {} bytes",
            self.input,
            self.output,
            packed.len()
        );
        ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;
    use ballpit_assets::decode_image_file;
    use image::{Rgba, RgbaImage};

    #[test]
    fn packed_png_decodes_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ball.png");
        let output = dir.path().join("ball.ctex");

        let mut png = RgbaImage::new(3, 2);
        png.put_pixel(2, 1, Rgba([10, 20, 30, 255]));
        png.save(&input).unwrap();

        PackCommand {
            input,
            output: output.clone(),
            level: 3,
        }
        .run()
        .unwrap();

        let decoded = decode_image_file(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.pixels(), png.as_raw().as_slice());
    }
}
