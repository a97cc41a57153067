//! Markdown building blocks for the generated reference.

/// One table row: `| a | b |`.
fn cell_row<T: AsRef<str>>(cells: &[T]) -> String {
    let mut row = String::from("|");
    for cell in cells {
        row.push(' ');
        row.push_str(cell.as_ref());
        row.push_str(" |");
    }
    row.push('\n');
    row
}

/// The centered split row below the titles, at least three dashes wide.
fn split_row<T: AsRef<str>>(titles: &[T]) -> String {
    let mut row = String::from("|");
    for title in titles {
        let width = title.as_ref().chars().count().max(3);
        row.push(':');
        row.push_str(&"-".repeat(width));
        row.push_str(":|");
    }
    row.push('\n');
    row
}

/// A pipe table with a title row, a split row and one row per item,
/// followed by a blank line.
pub fn table<T, R>(titles: &[T], rows: R) -> String
where
    T: AsRef<str>,
    R: IntoIterator<Item = Vec<String>>,
{
    let mut doc = cell_row(titles);
    doc.push_str(&split_row(titles));
    for row in rows {
        doc.push_str(&cell_row(&row));
    }
    doc.push('\n');
    doc
}

/// Wrap `text` as inline code for a table cell.
///
/// A pipe would end the cell, so it becomes `&#124;`, and since entities
/// are not decoded inside backticks such cells use `<code>` instead.
/// Empty text becomes a blank cell.
pub fn code(text: &str) -> String {
    let text = text.replace('|', "&#124;");
    if text.contains('&') {
        format!("<code>{}</code>", text)
    } else if !text.is_empty() {
        format!("`{}`", text)
    } else {
        " ".to_string()
    }
}

/// Escape underscores of a heading name that has more than one of them.
pub fn esc_underscore(text: &str) -> String {
    if text.matches('_').count() > 1 {
        text.replace('_', "\\_")
    } else {
        text.to_string()
    }
}

/// Anchor id of a section: lower-cased, with dots replaced by dashes.
pub fn link_id(name: &str) -> String {
    name.to_lowercase().replace('.', "-")
}

/// Turn interpreter sessions of a docstring into fenced Python code.
///
/// `>>> ` lines open a fence and lose their prompt; `... ` continuation
/// lines stay inside it. Any other line closes the fence, and a prompt on
/// the very last line closes it as well.
pub fn doctest(doc: &str) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 2);
    let mut fenced = false;
    for (i, line) in lines.iter().enumerate() {
        let code = match line.strip_prefix(">>> ") {
            Some(code) => Some(code),
            None if *line == ">>>" => Some(""),
            None if fenced => line.strip_prefix("... ").or((*line == "...").then_some("")),
            None => None,
        };
        match code {
            Some(code) => {
                if !fenced {
                    out.push("```python");
                    fenced = true;
                }
                out.push(code);
                if i == lines.len() - 1 {
                    out.push("```");
                    fenced = false;
                }
            }
            None => {
                if fenced {
                    out.push("```");
                    fenced = false;
                }
                out.push(line);
            }
        }
    }
    out.join("\n")
}
