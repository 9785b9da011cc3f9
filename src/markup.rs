use std::fmt::Write as _;

const DOCUMENT_STYLE: &str = "\
body { font-family: Arial, sans-serif; padding: 20px; }
table { border-collapse: collapse; margin: 20px 0; width: 100%; }
td, th { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #4CAF50; color: white; }
tr:nth-child(even) { background-color: #f2f2f2; }
";

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn render_table_fragment(rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape_html(cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

/// Wraps a table fragment into a standalone, styled HTML page.
pub(crate) fn render_document(image_name: &str, ordinal: usize, fragment: &str) -> String {
    let title = escape_html(&format!("{image_name} - Table {ordinal}"));
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    let _ = write!(html, "<style>\n{DOCUMENT_STYLE}</style>\n");
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h2>{title}</h2>");
    html.push_str(fragment);
    html.push_str("\n</body>\n</html>\n");
    html
}
