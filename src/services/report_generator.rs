use printpdf::*;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const TOP_MM: f64 = 270.0;
const BOTTOM_MM: f64 = 20.0;
const LINE_HEIGHT_MM: f64 = 5.5;
const MAX_COLUMNS: usize = 90;

/// Write a plan to `<dir>/<plan_id>.pdf` and return its public URL.
pub async fn generate_pdf_plan(
    dir: &Path,
    plan_id: &str,
    title: &str,
    text: &str,
) -> io::Result<String> {
    tokio::fs::create_dir_all(dir).await?;

    let file_path = dir.join(format!("{plan_id}.pdf"));
    let relative_path = format!("/reports/{plan_id}.pdf");

    let title = printable(title);
    let lines = layout_lines(text, MAX_COLUMNS);
    let footer = format!("Plan ID: {plan_id}");

    // PDF building is CPU bound
    tokio::task::spawn_blocking(move || write_pdf(file_path, &title, &lines, &footer))
        .await
        .map_err(io::Error::other)??;

    Ok(relative_path)
}

fn pdf_error(e: impl std::fmt::Debug) -> io::Error {
    io::Error::other(format!("pdf: {e:?}"))
}

fn write_pdf(path: PathBuf, title: &str, lines: &[String], footer: &str) -> io::Result<()> {
    let (doc, page1, layer1) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    layer.use_text(title, 18.0, Mm(20.0), Mm(TOP_MM + 10.0), &font_bold);
    layer.use_text(footer, 9.0, Mm(20.0), Mm(10.0), &font);

    let mut y = TOP_MM - 5.0;
    for line in lines {
        if y < BOTTOM_MM {
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            layer.use_text(footer, 9.0, Mm(20.0), Mm(10.0), &font);
            y = TOP_MM;
        }
        if !line.is_empty() {
            let is_heading = line.chars().any(|c| c.is_ascii_uppercase())
                && !line.chars().any(|c| c.is_ascii_lowercase());
            let face = if is_heading { &font_bold } else { &font };
            layer.use_text(line.as_str(), 10.0, Mm(20.0), Mm(y), face);
        }
        y -= LINE_HEIGHT_MM;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(pdf_error)?;
    Ok(())
}

// The built-in fonts only cover plain ASCII.
fn printable(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Split plan text into printable lines no wider than `width` characters.
pub fn layout_lines(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let line = printable(raw);
        if line.len() <= width {
            out.push(line);
            continue;
        }
        let mut current = String::new();
        for word in line.split_whitespace() {
            if !current.is_empty() && current.len() + 1 + word.len() > width {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_long_lines_and_drops_non_ascii() {
        let text = "💪 PUSH\n".to_string() + &"word ".repeat(30);
        let lines = layout_lines(&text, 20);
        assert_eq!(lines[0], " PUSH");
        assert!(lines.iter().all(|l| l.len() <= 20));
        assert_eq!(lines.len(), 1 + 8);
    }

    #[tokio::test]
    async fn writes_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = generate_pdf_plan(dir.path(), "abc", "Plan", "MAIN WORKOUT (20 min)\n- squats")
            .await
            .unwrap();
        assert_eq!(url, "/reports/abc.pdf");
        let bytes = std::fs::read(dir.path().join("abc.pdf")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
