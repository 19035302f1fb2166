//! Recorrido del directorio de datos: mapa de estructura y estadísticas del
//! dataset en una sola pasada con `walkdir`.
//!
//! Convenciones reconocidas en la raíz: `train/`, `val/` (o `validation/`) y
//! `test/`. Cada subdirectorio inmediato de `train/` es una clase.

use std::{io, path::Path};

use tracing::info;
use walkdir::WalkDir;

use crate::{
    error::{AppError, AppResult},
    models::{is_image_file, DatasetScan, DatasetStats, DirectoryMap},
};

pub const ROOT_KEY: &str = ".";

/// Recorre `root` una sola vez y devuelve la estructura y las estadísticas.
///
/// Los enlaces simbólicos no se siguen: aparecen como ficheros de su
/// directorio padre.
pub fn scan_dataset(root: &Path) -> AppResult<DatasetScan> {
    if !root.is_dir() {
        return Err(AppError::NotFound(format!(
            "El directorio de datos no existe: {}",
            root.display()
        )));
    }

    let mut structure = DirectoryMap::new();
    structure.insert(ROOT_KEY.to_string(), Default::default());
    let mut stats = DatasetStats::default();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some((name, parents)) = parts.split_last() else {
            continue;
        };
        let parent_key = if parents.is_empty() {
            ROOT_KEY.to_string()
        } else {
            parents.join("/")
        };

        if entry.file_type().is_dir() {
            structure
                .entry(parent_key)
                .or_default()
                .dirs
                .push(name.clone());
            structure.insert(parts.join("/"), Default::default());

            if parts.len() == 2 && parts[0] == "train" {
                stats.classes.entry(name.clone()).or_insert(0);
            }
            continue;
        }

        structure
            .entry(parent_key)
            .or_default()
            .files
            .push(name.clone());
        stats.total_files += 1;

        if !is_image_file(name) {
            continue;
        }
        stats.total_images += 1;

        // Sólo cuenta para un split si está dentro de un directorio de la raíz.
        if parts.len() >= 2 {
            match parts[0].as_str() {
                "train" => stats.splits.train += 1,
                "val" | "validation" => stats.splits.val += 1,
                "test" => stats.splits.test += 1,
                _ => {}
            }
        }
        if parts.len() >= 3 && parts[0] == "train" {
            *stats.classes.entry(parts[1].clone()).or_insert(0) += 1;
        }
    }

    info!(
        "Escaneado {}: {} directorios, {} ficheros, {} imágenes, {} clases.",
        root.display(),
        structure.len(),
        stats.total_files,
        stats.total_images,
        stats.classes.len()
    );

    Ok(DatasetScan { structure, stats })
}

/// Mapa ruta relativa → `{dirs, files}` de cada directorio alcanzable.
pub fn scan_structure(root: &Path) -> AppResult<DirectoryMap> {
    scan_dataset(root).map(|scan| scan.structure)
}

/// Conteos agregados de ficheros, imágenes, splits y clases.
pub fn compute_stats(root: &Path) -> AppResult<DatasetStats> {
    scan_dataset(root).map(|scan| scan.stats)
}
