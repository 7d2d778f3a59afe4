//! XML resource manifests
//!
//! A manifest declares individually addressable images, grouped into `Resources` blocks:
//! ```xml
//! <ResourceManifest>
//!   <Resources id="Gameplay">
//!     <SetDefaults path="images/gameplay" idprefix="IMAGE_"/>
//!     <Image id="PEG_BLUE" path="peg_blue.png"/>
//!     <Image id=BALL path="ball"/>
//!   </Resources>
//! </ResourceManifest>
//! ```
//! `SetDefaults` prefixes the ids and paths of the images following it, up to the end of the
//! block. Image paths are relative to the game root, and whatever extension they declare gets
//! replaced with the image container extension.
//!
//! Some manifests in the wild leave the `id` attribute unquoted, like `BALL` above. That's not
//! valid XML, so those get quoted before parsing.

use crate::ResourceError;
use log::*;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use roxmltree::{Document, Node};
use std::{borrow::Cow, fs, path::Path};

/// A markup tag, quoted attribute values may contain `>`.
static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap());
/// Within a tag: a quoted value (kept as is), or an unquoted `id` attribute.
static UNQUOTED_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'|(\s)id=([^"'\s/>]+)"#).unwrap());

/// One `Image` declaration, with the block defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestImage {
    pub id: String,
    /// Path relative to the game root, `/` separated
    pub path: String,
    /// `id` attribute of the enclosing `Resources` block
    pub group: Option<String>,
}

/// Block-scoped prefixes set by `SetDefaults`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDefaults {
    pub path_prefix: String,
    pub id_prefix: String,
}

impl ManifestDefaults {
    fn apply(&self, local_id: &str, local_path: &str, image_extension: &str) -> (String, String) {
        let id = format!("{}{local_id}", self.id_prefix);
        let path = replace_extension(&join_path(&self.path_prefix, local_path), image_extension);
        (id, path)
    }
}

/// Quotes every unquoted `id=value` attribute. Everything else, including `id=` within quoted
/// values and text, is left as is.
///
/// ```
/// use ballpit_assets::manifest::repair_unquoted_ids;
/// assert_eq!(
///     repair_unquoted_ids(r#"<Image id=PEG path="peg"/>"#),
///     r#"<Image id="PEG" path="peg"/>"#,
/// );
/// ```
pub fn repair_unquoted_ids(text: &str) -> Cow<'_, str> {
    TAG_REGEX.replace_all(text, |tag: &Captures| {
        UNQUOTED_ID_REGEX
            .replace_all(&tag[0], |token: &Captures| match (token.get(1), token.get(2)) {
                (Some(space), Some(value)) => {
                    format!(r#"{}id="{}""#, space.as_str(), value.as_str())
                }
                _ => token[0].to_string(),
            })
            .into_owned()
    })
}

/// Reads and parses a manifest file.
pub fn read_manifest_file(
    path: &Path,
    image_extension: &str,
) -> Result<Vec<ManifestImage>, ResourceError> {
    let text = fs::read_to_string(path).map_err(|err| ResourceError::file_open(path, err))?;
    parse_manifest(path, &text, image_extension)
}

/// Parses manifest text. `path` is only used for error reporting.
///
/// The root element is normally `ResourceManifest`, but a lone `Resources` block is accepted
/// too.
pub fn parse_manifest(
    path: &Path,
    text: &str,
    image_extension: &str,
) -> Result<Vec<ManifestImage>, ResourceError> {
    let repaired = repair_unquoted_ids(text);
    let document = Document::parse(&repaired).map_err(|err| ResourceError::XmlDeserialize {
        path: path.into(),
        detail: err.to_string(),
    })?;

    let root = document.root_element();
    let mut images = vec![];

    match root.tag_name().name() {
        "ResourceManifest" => {
            for block in root.children().filter(|node| node.has_tag_name("Resources")) {
                read_block(path, block, image_extension, &mut images);
            }
        }
        "Resources" => read_block(path, root, image_extension, &mut images),
        other => {
            return Err(ResourceError::XmlDeserialize {
                path: path.into(),
                detail: format!("unexpected root element `{other}`"),
            })
        }
    }

    Ok(images)
}

fn read_block(path: &Path, block: Node, image_extension: &str, images: &mut Vec<ManifestImage>) {
    let group = block.attribute("id").map(String::from);
    let mut defaults = ManifestDefaults::default();

    for child in block.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "SetDefaults" => {
                defaults = ManifestDefaults {
                    path_prefix: child.attribute("path").unwrap_or_default().to_string(),
                    id_prefix: child.attribute("idprefix").unwrap_or_default().to_string(),
                };
            }
            "Image" => {
                let (Some(local_id), Some(local_path)) =
                    (child.attribute("id"), child.attribute("path"))
                else {
                    warn!(
                        "Skipping an `Image` without an id or path in `{}` (line {})",
                        path.display(),
                        child.document().text_pos_at(child.range().start).row
                    );
                    continue;
                };

                let (id, image_path) = defaults.apply(local_id, local_path, image_extension);
                images.push(ManifestImage {
                    id,
                    path: image_path,
                    group: group.clone(),
                });
            }
            other => trace!("Ignoring manifest element `{other}`"),
        }
    }
}

fn join_path(prefix: &str, local: &str) -> String {
    let prefix = prefix.replace('\\', "/");
    let local = local.replace('\\', "/");

    if prefix.is_empty() {
        local
    } else if prefix.ends_with('/') {
        prefix + &local
    } else {
        format!("{prefix}/{local}")
    }
}

/// Replaces the extension of the last path component, or adds one if there's none.
fn replace_extension(path: &str, extension: &str) -> String {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem_end = match path[name_start..].rfind('.') {
        // A leading dot is part of the name, not an extension
        Some(dot) if dot > 0 => name_start + dot,
        _ => path.len(),
    };
    format!("{}.{extension}", &path[..stem_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<ManifestImage> {
        parse_manifest(Path::new("resources.xml"), text, "png").unwrap()
    }

    #[test]
    fn defaults_apply_to_images() {
        let images = parse(
            r#"<Resources><SetDefaults path="a/" idprefix="x_"/><Image id="foo" path="b.png"/></Resources>"#,
        );

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "x_foo");
        assert_eq!(images[0].path, "a/b.png");
    }

    #[test]
    fn extension_is_normalized() {
        let images = parse_manifest(
            Path::new("resources.xml"),
            r#"<Resources>
                <SetDefaults path="images\gameplay" idprefix=""/>
                <Image id="peg" path="pegs/peg.jpg"/>
                <Image id="ball" path="ball"/>
            </Resources>"#,
            "ctex",
        )
        .unwrap();

        assert_eq!(images[0].path, "images/gameplay/pegs/peg.ctex");
        assert_eq!(images[1].path, "images/gameplay/ball.ctex");
    }

    #[test]
    fn unquoted_ids_parse_like_quoted_ones() {
        let quoted = parse(r#"<Resources><Image id="foo" path="b"/></Resources>"#);
        let unquoted = parse(r#"<Resources><Image id=foo path="b"/></Resources>"#);
        assert_eq!(quoted, unquoted);

        let self_closing = parse(r#"<Resources><Image path="b" id=foo/></Resources>"#);
        assert_eq!(quoted, self_closing);
    }

    #[test]
    fn repair_leaves_other_attributes_alone() {
        let text = r#"<SetDefaults path="a" idprefix=IMG_/><Image id='x' path="y"/>"#;
        assert_eq!(repair_unquoted_ids(text), text);
    }

    #[test]
    fn repair_skips_quoted_values_and_text() {
        let text = r#"<Resources><Image path="my id=x" id='y'/><Note>id=z</Note></Resources>"#;
        assert_eq!(repair_unquoted_ids(text), text);

        let images = parse(r#"<Resources><Image path="odd id=x/name" id=peg/></Resources>"#);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "peg");
        assert_eq!(images[0].path, "odd id=x/name.png");
    }

    #[test]
    fn defaults_do_not_leak_between_blocks() {
        let images = parse(
            r#"<ResourceManifest>
                <Resources id="First">
                    <SetDefaults path="first" idprefix="ONE_"/>
                    <Image id="a" path="a"/>
                </Resources>
                <Resources id="Second">
                    <Image id="b" path="b"/>
                </Resources>
            </ResourceManifest>"#,
        );

        assert_eq!(images[0].id, "ONE_a");
        assert_eq!(images[0].path, "first/a.png");
        assert_eq!(images[0].group.as_deref(), Some("First"));
        assert_eq!(images[1].id, "b");
        assert_eq!(images[1].path, "b.png");
        assert_eq!(images[1].group.as_deref(), Some("Second"));
    }

    #[test]
    fn later_defaults_override_earlier_ones() {
        let images = parse(
            r#"<Resources>
                <Image id="a" path="a"/>
                <SetDefaults path="p" idprefix="P_"/>
                <Image id="b" path="b"/>
            </Resources>"#,
        );

        assert_eq!(images[0].id, "a");
        assert_eq!(images[1].id, "P_b");
        assert_eq!(images[1].path, "p/b.png");
    }

    #[test]
    fn incomplete_and_foreign_elements_are_skipped() {
        let images = parse(
            r#"<Resources>
                <Image id="no_path"/>
                <Sound id="boing" path="sounds/boing"/>
                <Image id="ok" path="ok"/>
            </Resources>"#,
        );

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "ok");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let result = parse_manifest(Path::new("bad.xml"), "<Resources><Image", "png");
        assert!(matches!(result, Err(ResourceError::XmlDeserialize { .. })));

        let result = parse_manifest(Path::new("bad.xml"), "<Levels/>", "png");
        assert!(matches!(result, Err(ResourceError::XmlDeserialize { .. })));
    }

    #[test]
    fn extension_replacement() {
        assert_eq!(replace_extension("a/b.c/d", "x"), "a/b.c/d.x");
        assert_eq!(replace_extension("a/.hidden", "x"), "a/.hidden.x");
        assert_eq!(replace_extension("d.tar.gz", "x"), "d.tar.x");
    }
}
