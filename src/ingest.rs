//! Ingesta de un dataset comprimido: guarda el ZIP subido en el directorio de
//! datos y lo extrae en una carpeta con el nombre base del archivo.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use tracing::{info, warn};
use zip::ZipArchive;

use crate::error::{AppError, AppResult};

/// Resumen de una operación de extracción.
#[derive(Debug, Default)]
pub struct ExtractionSummary {
    pub folder: String,
    pub archive_path: PathBuf,
    pub files_extracted: usize,
    pub dirs_created: usize,
}

impl std::fmt::Display for ExtractionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resumen: {} ficheros y {} directorios extraídos de {} en '{}'.",
            self.files_extracted,
            self.dirs_created,
            self.archive_path.display(),
            self.folder
        )
    }
}

/// Valida el nombre enviado por el cliente y devuelve `(nombre_fichero, carpeta)`.
///
/// Sólo se conserva el último componente de la ruta; debe terminar en `.zip`.
pub fn archive_names(client_name: &str) -> AppResult<(String, String)> {
    let file_name = client_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    if file_name.is_empty() {
        return Err(AppError::Validation(
            "El fichero subido no tiene nombre.".to_string(),
        ));
    }
    let lower = file_name.to_lowercase();
    if !lower.ends_with(".zip") {
        return Err(AppError::Validation(format!(
            "Sólo se aceptan archivos .zip (recibido '{file_name}')."
        )));
    }

    let folder = file_name[..file_name.len() - ".zip".len()].to_string();
    if folder.is_empty() || folder == "." || folder == ".." {
        return Err(AppError::Validation(format!(
            "Nombre de archivo inválido: '{file_name}'."
        )));
    }
    Ok((file_name, folder))
}

/// Guarda el archivo subido en `upload_dir` y lo extrae en `upload_dir/<carpeta>`.
pub fn save_and_extract(
    upload_dir: &Path,
    client_name: &str,
    content: &[u8],
) -> AppResult<ExtractionSummary> {
    let (file_name, folder) = archive_names(client_name)?;

    fs::create_dir_all(upload_dir)?;
    let archive_path = upload_dir.join(&file_name);
    fs::write(&archive_path, content)?;
    info!(
        "Archivo guardado en {} ({} bytes).",
        archive_path.display(),
        content.len()
    );

    let destination = upload_dir.join(&folder);
    let (files_extracted, dirs_created) = extract_archive(&archive_path, &destination)?;

    let summary = ExtractionSummary {
        folder,
        archive_path,
        files_extracted,
        dirs_created,
    };
    info!("¡Extracción completada! {}", summary);
    Ok(summary)
}

/// Extrae todas las entradas de `zip_path` en `destination` (creado si falta).
///
/// Si alguna entrada escaparía del destino (ruta absoluta o con `..`) se
/// rechaza el archivo completo antes de escribir nada. Si la extracción falla
/// a medias se borra `destination`.
pub fn extract_archive(zip_path: &Path, destination: &Path) -> AppResult<(usize, usize)> {
    let file = fs::File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.enclosed_name().is_none() {
            warn!(
                "Entrada insegura en {}: '{}'. Se rechaza el archivo.",
                zip_path.display(),
                entry.name()
            );
            return Err(AppError::Validation(format!(
                "El archivo contiene una ruta no permitida: '{}'.",
                entry.name()
            )));
        }
    }

    fs::create_dir_all(destination)?;
    match extract_entries(&mut archive, destination) {
        Ok(counts) => Ok(counts),
        Err(err) => {
            // No dejar extracciones a medias que luego cuenten en /stats.
            if let Err(cleanup) = fs::remove_dir_all(destination) {
                warn!(
                    "No se pudo limpiar {} tras un fallo de extracción: {}",
                    destination.display(),
                    cleanup
                );
            }
            Err(err)
        }
    }
}

fn extract_entries(
    archive: &mut ZipArchive<fs::File>,
    destination: &Path,
) -> AppResult<(usize, usize)> {
    let mut files = 0;
    let mut dirs = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let out_path = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            dirs += 1;
            continue;
        }

        // Un fallo al leer la entrada (p. ej. checksum) es culpa del archivo,
        // no del disco.
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content).map_err(|e| {
            AppError::Validation(format!(
                "Entrada dañada '{}' en el archivo: {e}",
                entry.name()
            ))
        })?;

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, content)?;
        files += 1;
    }

    Ok((files, dirs))
}
