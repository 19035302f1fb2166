//! Vista HTML de inicio: formulario de subida, formulario de preguntas y el
//! mapa de estructura del directorio de datos.

use std::fmt::Write as _;

use crate::models::DirectoryMap;

const PAGE_HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Dataset Q&amp;A</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
    input[type=text] { width: 70%; padding: 0.5rem; }
    button { padding: 0.5rem 1rem; }
    .dir { margin: 0.5rem 0; }
    .path { font-family: monospace; font-weight: 600; }
    .muted { color: #777; }
  </style>
</head>
<body>
  <h1>Dataset Q&amp;A</h1>

  <div class="card">
    <h2>1) Upload a dataset (.zip)</h2>
    <form action="/upload" method="post" enctype="multipart/form-data">
      <input type="file" name="file" accept=".zip" />
      <button type="submit">Upload</button>
    </form>
  </div>

  <div class="card">
    <h2>2) Ask a question</h2>
    <form action="/search" method="get">
      <input type="text" name="question" placeholder="How many images per class are in train?" />
      <button type="submit">Ask</button>
    </form>
  </div>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Renderiza la página de inicio. `None` indica que el directorio de datos aún no existe.
pub fn render_home(structure: Option<&DirectoryMap>) -> String {
    let mut html = String::from(PAGE_HEAD);
    html.push_str("  <div class=\"card\">\n    <h2>Uploaded data</h2>\n");

    match structure {
        None => html.push_str("    <p class=\"muted\">No data uploaded yet.</p>\n"),
        Some(map) => {
            for (path, entry) in map {
                let _ = writeln!(
                    html,
                    "    <div class=\"dir\"><span class=\"path\">{}</span><br/>dirs: {}<br/>files: {}</div>",
                    escape_html(path),
                    render_names(&entry.dirs),
                    render_names(&entry.files),
                );
            }
        }
    }

    html.push_str("  </div>\n");
    html.push_str(PAGE_TAIL);
    html
}

fn render_names(names: &[String]) -> String {
    if names.is_empty() {
        return "<span class=\"muted\">none</span>".to_string();
    }
    names
        .iter()
        .map(|n| escape_html(n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
