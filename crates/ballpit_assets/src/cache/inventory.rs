use super::{LazyResource, ResourceCache, ResourceEntry};
use crate::{atlas::read_atlas_index, manifest::read_manifest_file, ResourceError};
use log::*;
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Summary of an inventory pass.
#[derive(Debug, Default)]
pub struct InventoryReport {
    /// Number of entries registered (including ones that replaced earlier entries)
    pub registered: usize,
    pub manifests: usize,
    pub atlases: usize,
    pub items: usize,
    pub templates: usize,
    /// Files that couldn't be processed. They don't stop the pass.
    pub failures: Vec<ResourceError>,
}

impl ResourceCache {
    /// Walks `root` and registers everything it finds, without decoding anything.
    ///
    /// Routing is done by file extension (see [`AssetConfig`](crate::AssetConfig)):
    ///  * manifests register one sprite per declared image,
    ///  * atlas indices register the atlas image and one sprite per record,
    ///  * descriptors within an items directory register an `item/<name>` item.
    ///
    /// On top of that, every configured template gets registered as `<category>/<name>`,
    /// whether its file exists or not.
    ///
    /// Links to files are followed, links to directories are not.
    ///
    /// Only an unreadable `root` fails the whole pass. Problems with individual files are
    /// logged and collected in the report. Entries registered under an existing identifier
    /// replace the old ones.
    pub fn inventory(&self, root: impl AsRef<Path>) -> Result<InventoryReport, ResourceError> {
        let root = root.as_ref();
        info!("Taking inventory of `{}`...", root.display());

        let mut report = InventoryReport::default();
        let top_level = read_sorted_dir(root).map_err(|err| ResourceError::file_open(root, err))?;
        for path in top_level {
            self.visit(root, path, false, &mut report);
        }

        self.register_templates(root, &mut report);

        info!(
            "Inventory of `{}` done: {} entries from {} manifests, {} atlases, {} items and {} templates ({} failures)",
            root.display(),
            report.registered,
            report.manifests,
            report.atlases,
            report.items,
            report.templates,
            report.failures.len()
        );
        Ok(report)
    }

    fn visit(&self, root: &Path, path: PathBuf, in_items: bool, report: &mut InventoryReport) {
        // Directory links aren't followed, link cycles would never end
        let file_type = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata.file_type(),
            Err(err) => {
                warn!("Couldn't inspect `{}`: {err}", path.display());
                report.failures.push(ResourceError::file_open(path, err));
                return;
            }
        };

        if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(target) if target.is_dir() => {
                    debug!("Not following directory link `{}`", path.display());
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("Couldn't follow link `{}`: {err}", path.display());
                    report.failures.push(ResourceError::file_open(path, err));
                    return;
                }
            }
        } else if file_type.is_dir() {
            let in_items = in_items
                || path.file_name() == Some(OsStr::new(&self.config.items_directory));

            match read_sorted_dir(&path) {
                Ok(children) => {
                    for child in children {
                        self.visit(root, child, in_items, report);
                    }
                }
                Err(err) => {
                    warn!("Couldn't list `{}`: {err}", path.display());
                    report.failures.push(ResourceError::file_open(path, err));
                }
            }
            return;
        }

        let config = &self.config;
        let result = if has_extension(&path, &config.manifest_extension) {
            self.register_manifest(root, &path, report)
        } else if has_extension(&path, &config.atlas_extension) {
            self.register_atlas(root, &path, report)
        } else if in_items && has_extension(&path, &config.descriptor_extension) {
            self.register_item(&path, report);
            Ok(())
        } else {
            Ok(())
        };

        if let Err(err) = result {
            warn!("Skipping `{}`: {err}", path.display());
            report.failures.push(err);
        }
    }

    fn register_manifest(
        &self,
        root: &Path,
        path: &Path,
        report: &mut InventoryReport,
    ) -> Result<(), ResourceError> {
        trace!("Reading manifest `{}`", path.display());
        let images = read_manifest_file(path, &self.config.image_extension)?;

        for image in images {
            self.insert(image.id, ResourceEntry::sprite(root.join(image.path)));
            report.registered += 1;
        }
        report.manifests += 1;
        Ok(())
    }

    fn register_atlas(
        &self,
        root: &Path,
        path: &Path,
        report: &mut InventoryReport,
    ) -> Result<(), ResourceError> {
        trace!("Reading atlas `{}`", path.display());
        let data = fs::read(path).map_err(|err| ResourceError::file_open(path, err))?;
        let atlas_id = relative_id(root, path);
        let entries = read_atlas_index(path, &data, &atlas_id)?;

        let image = Arc::new(LazyResource::new(
            path.with_extension(&self.config.image_extension),
        ));
        self.insert(
            atlas_id,
            ResourceEntry::Sprite {
                image: image.clone(),
                region: None,
            },
        );
        report.registered += 1;

        for entry in entries {
            self.insert(
                entry.id.clone(),
                ResourceEntry::atlas_region(image.clone(), entry),
            );
            report.registered += 1;
        }
        report.atlases += 1;
        Ok(())
    }

    fn register_item(&self, path: &Path, report: &mut InventoryReport) {
        let Some(stem) = path.file_stem() else { return };
        let id = format!("item/{}", stem.to_string_lossy());
        trace!("Registering item `{id}`");

        self.insert(id, ResourceEntry::item(path));
        report.registered += 1;
        report.items += 1;
    }

    fn register_templates(&self, root: &Path, report: &mut InventoryReport) {
        for category in &self.config.templates {
            let directory = root.join(&category.directory);
            for name in &category.names {
                let id = format!("{}/{name}", category.category);
                let path = directory.join(format!("{name}.{}", self.config.descriptor_extension));

                self.insert(id, ResourceEntry::template(path));
                report.registered += 1;
                report.templates += 1;
            }
        }
    }
}

/// Lists a directory sorted by name, so that identifier collisions resolve the same way on
/// every platform.
fn read_sorted_dir(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(path)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// `root/images/pegs.atlas` becomes `images/pegs`.
fn relative_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
