//! Construcción del prompt que se envía al LLM a partir de la estructura de la
//! raíz, las estadísticas del dataset y la pregunta del usuario.

use std::fmt::Write as _;

use crate::models::{DatasetStats, DirectoryEntry};

/// Máximo de clases enumeradas en el prompt.
pub const MAX_CLASSES: usize = 50;
/// Máximo de nombres listados para los directorios y ficheros de la raíz.
pub const MAX_LISTED_ENTRIES: usize = 100;

const PREAMBLE: &str =
    "You are a dataset analysis assistant. Use the dataset summary below to answer the user's question.";
const CLOSING_INSTRUCTION: &str =
    "Answer concisely. When the question asks about quantities, give exact counts from the summary.";

/// Genera el prompt completo. La salida es determinista para una misma entrada.
pub fn build_prompt(root: &DirectoryEntry, stats: &DatasetStats, question: &str) -> String {
    let mut dirs = root.dirs.clone();
    dirs.sort();
    let mut files = root.files.clone();
    files.sort();

    let mut prompt = String::new();
    let _ = writeln!(prompt, "{PREAMBLE}");
    prompt.push('\n');
    let _ = writeln!(prompt, "Top-level directories: {}", render_listing(&dirs));
    let _ = writeln!(prompt, "Top-level files: {}", render_listing(&files));
    let _ = writeln!(
        prompt,
        "Counts: total_files={}, total_images={}, train_images={}, val_images={}, test_images={}",
        stats.total_files,
        stats.total_images,
        stats.splits.train,
        stats.splits.val,
        stats.splits.test
    );
    let _ = writeln!(prompt, "Images per class (train):");
    for line in class_lines(stats) {
        let _ = writeln!(prompt, "{line}");
    }
    prompt.push('\n');
    let _ = writeln!(prompt, "Question: {question}");
    prompt.push('\n');
    prompt.push_str(CLOSING_INSTRUCTION);
    prompt
}

/// Líneas de la sección de clases: `nombre: conteo` ordenadas por conteo
/// descendente y nombre ascendente, truncadas a `MAX_CLASSES`.
pub fn class_lines(stats: &DatasetStats) -> Vec<String> {
    if stats.classes.is_empty() {
        return vec!["none".to_string()];
    }

    let mut ranked: Vec<(&String, &u64)> = stats.classes.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut lines: Vec<String> = ranked
        .iter()
        .take(MAX_CLASSES)
        .map(|(name, count)| format!("{name}: {count}"))
        .collect();
    if ranked.len() > MAX_CLASSES {
        lines.push(format!("... and {} more", ranked.len() - MAX_CLASSES));
    }
    lines
}

fn render_listing(names: &[String]) -> String {
    if names.is_empty() {
        return "none".to_string();
    }
    let mut listing = names
        .iter()
        .take(MAX_LISTED_ENTRIES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > MAX_LISTED_ENTRIES {
        let _ = write!(listing, ", ... and {} more", names.len() - MAX_LISTED_ENTRIES);
    }
    listing
}
