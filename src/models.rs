//! Modelos de dominio (estructura del dataset y estadísticas agregadas).

use serde::Serialize;
use std::{collections::BTreeMap, ffi::OsStr, path::Path};

/// Extensiones que se consideran imagen (comparación en minúsculas, sin punto).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff"];

/// Contenido inmediato de un directorio: subdirectorios y ficheros, ordenados por nombre.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

/// Ruta relativa a la raíz (`"."` para la raíz) → contenido del directorio.
pub type DirectoryMap = BTreeMap<String, DirectoryEntry>;

/// Número de imágenes por split canónico. `validation/` se cuenta como `val`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: u64,
    pub val: u64,
    pub test: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub total_files: u64,
    pub total_images: u64,
    pub splits: SplitCounts,
    /// Subdirectorios inmediatos de `train/` → imágenes bajo cada uno.
    pub classes: BTreeMap<String, u64>,
}

/// Resultado de un único recorrido del árbol: estructura + estadísticas.
#[derive(Debug, Clone, Default)]
pub struct DatasetScan {
    pub structure: DirectoryMap,
    pub stats: DatasetStats,
}

/// Devuelve `true` si el nombre de fichero tiene una extensión de imagen reconocida.
pub fn is_image_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
