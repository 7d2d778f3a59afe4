use anyhow::anyhow;
use ballpit_utils::{ok, AnyResult};
use clap::Args;
use image::RgbaImage;
use log::info;
use std::path::PathBuf;

#[derive(Args)]
pub struct ExportCommand {
    /// Game directory to scan
    pub root: PathBuf,
    /// Identifier of the sprite, for example `ui/button_ok`
    pub id: String,
    /// Output PNG file
    #[arg(long, short = 'o')]
    pub output: PathBuf,
    /// Asset configuration file (TOML)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

impl crate::Command for ExportCommand {
    fn run(self) -> AnyResult {
        let cache = crate::open_cache(&self.root, self.config.as_deref())?;

        let sprite = cache.get_sprite(&self.id)?;
        let pixels = sprite
            .to_rgba()
            .ok_or_else(|| anyhow!("sprite `{}` doesn't fit its image", self.id))?;

        let (width, height) = (pixels.width(), pixels.height());
        let image = RgbaImage::from_raw(width, height, pixels.into_pixels())
            .ok_or_else(|| anyhow!("pixel buffer of `{}` has the wrong size", self.id))?;
        image.save(&self.output)?;

        info!("Exported `{}` ({width}x{height}) to {:?}", self.id, self.output);
        ok()
    }
}
