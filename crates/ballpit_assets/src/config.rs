//! Resource layer configuration
//!
//! Everything the inventory pass needs to know about the game's directory conventions lives
//! here. It's usually loaded from a TOML file like this one:
//! ```toml
//! image_extension = "ctex"
//! items_directory = "items"
//!
//! [[templates]]
//! category = "ball"
//! directory = "templates/balls"
//! names = ["standard", "heavy", "ghost"]
//! ```
//! Any omitted field keeps its default value.

use anyhow::Context;
use ballpit_utils::AnyResult;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetConfig {
    /// Extension of compressed image containers, without the dot
    pub image_extension: String,
    /// Extension of packed atlas indices
    pub atlas_extension: String,
    /// Extension of XML resource manifests
    pub manifest_extension: String,
    /// Extension of structured data descriptors (items, templates)
    pub descriptor_extension: String,
    /// Name of the directories holding per-item descriptors
    pub items_directory: String,
    /// Template categories registered regardless of what's on disk
    pub templates: Vec<TemplateCategory>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            image_extension: String::from("ctex"),
            atlas_extension: String::from("atlas"),
            manifest_extension: String::from("xml"),
            descriptor_extension: String::from("json"),
            items_directory: String::from("items"),
            templates: vec![],
        }
    }
}

impl AssetConfig {
    pub fn from_toml_str(text: &str) -> AnyResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("couldn't read config `{}`", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("couldn't parse config `{}`", path.display()))
    }
}

/// One family of templates, like ball types. Every name becomes a template resource called
/// `<category>/<name>`, stored at `<root>/<directory>/<name>.<descriptor extension>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateCategory {
    pub category: String,
    pub directory: PathBuf,
    pub names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = AssetConfig::from_toml_str(
            r#"
            image_extension = "zimg"

            [[templates]]
            category = "ball"
            directory = "templates/balls"
            names = ["standard", "heavy"]
            "#,
        )
        .unwrap();

        assert_eq!(config.image_extension, "zimg");
        assert_eq!(config.atlas_extension, "atlas");
        assert_eq!(config.items_directory, "items");
        assert_eq!(config.templates.len(), 1);
        assert_eq!(config.templates[0].names, ["standard", "heavy"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AssetConfig::from_toml_str("image_extention = \"png\"").is_err());
    }
}
