use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::filter::Filter;
use crate::todo::{Status, Todo};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self { color: cfg.color }
    }

    #[tracing::instrument(skip(self, todos))]
    pub fn print_todo_table(&mut self, todos: &[&Todo], filter: Filter) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_todo_table(&mut out, todos, filter)
    }

    pub fn write_todo_table<W: Write>(
        &self,
        out: &mut W,
        todos: &[&Todo],
        filter: Filter,
    ) -> anyhow::Result<()> {
        if todos.is_empty() {
            writeln!(out, "{}", empty_message(filter))?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Title".to_string(),
            "Description".to_string(),
        ];

        let rows = todos
            .iter()
            .map(|todo| {
                vec![
                    self.paint(&todo.id.to_string(), "33"),
                    self.paint_status(todo.status),
                    todo.title.clone(),
                    todo.description.clone(),
                ]
            })
            .collect();

        write_table(&mut *out, headers, rows)?;
        writeln!(out)?;
        writeln!(
            out,
            "{} {} (filter: {filter})",
            todos.len(),
            if todos.len() == 1 { "todo" } else { "todos" }
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, todo), fields(id = todo.id))]
    pub fn print_todo_info(&mut self, todo: &Todo) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_todo_info(&mut out, todo)
    }

    pub fn write_todo_info<W: Write>(&self, out: &mut W, todo: &Todo) -> anyhow::Result<()> {
        writeln!(out, "id        {}", todo.id)?;
        writeln!(out, "status    {}", self.paint_status(todo.status))?;
        writeln!(out, "title     {}", todo.title)?;
        writeln!(out, "desc      {}", todo.description)?;
        Ok(())
    }

    fn paint_status(&self, status: Status) -> String {
        match status {
            Status::Active => self.paint(status.as_str(), "36"),
            Status::Done => self.paint(status.as_str(), "32"),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn empty_message(filter: Filter) -> String {
    match filter {
        Filter::All => "No todos.".to_string(),
        other => format!("No {other} todos."),
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Renderer {
        Renderer { color: false }
    }

    #[test]
    fn table_pads_wide_characters() {
        let a = Todo::new_active(0, "牛乳を買う".to_string(), "2%".to_string());
        let b = Todo::new_active(12, "Pay rent".to_string(), String::new());

        let mut out = Vec::new();
        plain()
            .write_todo_table(&mut out, &[&a, &b], Filter::All)
            .expect("render");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "ID Status Title      Description ");
        assert_eq!(lines[2], "0  active 牛乳を買う 2%          ");
        assert_eq!(lines[3], "12 active Pay rent               ");
        assert_eq!(lines[5], "2 todos (filter: all)");
    }

    #[test]
    fn empty_view_names_the_filter() {
        let mut out = Vec::new();
        plain()
            .write_todo_table(&mut out, &[], Filter::Done)
            .expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "No done todos.\n");

        let mut out = Vec::new();
        plain()
            .write_todo_table(&mut out, &[], Filter::All)
            .expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "No todos.\n");
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[33m12\x1b[0m"), "12");
    }
}
