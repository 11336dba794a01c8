use std::io::{self, Write};

use color_eyre::eyre::{eyre, Result};
use tabwriter::TabWriter;

/// A tab-aligned table with optional per-cell truncation.
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    max_column_width: Option<usize>,
}

impl Table {
    pub fn new(columns: &[&str], max_column_width: Option<usize>) -> Self {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            max_column_width,
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Sort rows by the named column. Unknown keys are an error.
    pub fn sort(&mut self, key: &str, descending: bool) -> Result<()> {
        let index = self
            .columns
            .iter()
            .position(|column| column == key)
            .ok_or_else(|| {
                eyre!(
                    "unknown sort key {:?} (expected one of: {})",
                    key,
                    self.columns.join(", ")
                )
            })?;
        self.rows.sort_by(|a, b| a[index].cmp(&b[index]));
        if descending {
            self.rows.reverse();
        }
        Ok(())
    }

    fn truncate(&self, value: &str) -> String {
        match self.max_column_width {
            Some(width) if value.chars().count() > width && width > 0 => {
                let cut: String = value.chars().take(width.saturating_sub(1)).collect();
                format!("{}\u{2026}", cut)
            }
            _ => value.to_string(),
        }
    }

    pub fn print(&self) -> io::Result<()> {
        let mut writer = TabWriter::new(io::stdout());
        let header_style = console::Style::new().bold();
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|column| header_style.apply_to(column).to_string())
            .collect();
        writeln!(writer, "{}", header.join("\t"))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|cell| self.truncate(cell)).collect();
            writeln!(writer, "{}", cells.join("\t"))?;
        }
        writer.flush()
    }
}
