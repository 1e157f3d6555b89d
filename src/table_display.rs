use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use std::path::Path;

use crate::config::DisplayConfig;
use crate::data::pagination::PaginationInfo;
use crate::data::record::{DataValue, Record};
use crate::state::TableState;

/// Text shown for one cell, cut to the configured width
pub fn cell_text(value: Option<DataValue>, config: &DisplayConfig) -> String {
    let text = match value {
        None | Some(DataValue::Null) => return config.null_placeholder.clone(),
        Some(value) => value.to_string(),
    };

    if text.chars().count() <= config.max_column_width {
        return text;
    }
    let keep = config.max_column_width.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

/// Build a table for `rows`, numbering them from `first_row_number` when enabled
pub fn build_table<T: Record>(
    rows: &[T],
    columns: &[String],
    first_row_number: usize,
    config: &DisplayConfig,
) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut headers = Vec::with_capacity(columns.len() + 1);
    if config.show_row_numbers {
        headers.push(Cell::new("#").add_attribute(Attribute::Bold));
    }
    headers.extend(
        columns
            .iter()
            .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
    );
    table.set_header(headers);

    for (offset, record) in rows.iter().enumerate() {
        let mut row = Vec::with_capacity(columns.len() + 1);
        if config.show_row_numbers {
            row.push((first_row_number + offset).to_string());
        }
        row.extend(
            columns
                .iter()
                .map(|column| cell_text(record.field(column), config)),
        );
        table.add_row(row);
    }

    table
}

/// "Showing 11-20 of 45 (page 2 of 5)"
pub fn summary_line(pagination: &PaginationInfo) -> String {
    match pagination.display_range() {
        Some((first, last)) => format!(
            "Showing {}-{} of {} (page {} of {})",
            first, last, pagination.total_items, pagination.current_page, pagination.total_pages
        ),
        None => format!(
            "Showing 0 of {} (page {} of {})",
            pagination.total_items, pagination.current_page, pagination.total_pages
        ),
    }
}

/// Print the current page of `state` followed by its summary line
pub fn display_page<T: Record>(state: &TableState<T>, columns: &[String], config: &DisplayConfig) {
    if state.paginated.is_empty() {
        println!("{}", "No records match.".yellow());
    } else {
        let table = build_table(
            &state.paginated,
            columns,
            state.pagination.start_index + 1,
            config,
        );
        println!("{table}");
    }

    println!("\n{}", summary_line(&state.pagination).green());
    if !state.selected.is_empty() {
        println!("{}", format!("{} selected", state.selected.len()).cyan());
    }
}

/// Write `rows` to a CSV file with `columns` as the header
pub fn export_to_csv<T: Record>(rows: &[T], columns: &[String], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    wtr.write_record(columns)?;
    for record in rows {
        let row: Vec<String> = columns
            .iter()
            .map(|column| {
                record
                    .field(column)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .collect();
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pagination::PageRequest;
    use serde_json::json;
    use tempfile::NamedTempFile;

    fn config() -> DisplayConfig {
        DisplayConfig {
            show_row_numbers: true,
            max_column_width: 8,
            null_placeholder: "-".to_string(),
        }
    }

    #[test]
    fn test_cell_text_truncates_and_fills_nulls() {
        let config = config();
        assert_eq!(cell_text(None, &config), "-");
        assert_eq!(cell_text(Some(DataValue::Null), &config), "-");
        assert_eq!(cell_text(Some(DataValue::Integer(42)), &config), "42");
        assert_eq!(
            cell_text(Some(DataValue::String("a long description".into())), &config),
            "a lon..."
        );
    }

    #[test]
    fn test_build_table_numbers_rows() {
        let rows = vec![json!({"name": "Ann"}), json!({"name": "Bob"})];
        let columns = vec!["name".to_string()];
        let rendered = build_table(&rows, &columns, 11, &config()).to_string();
        assert!(rendered.contains("11"));
        assert!(rendered.contains("12"));
        assert!(rendered.contains("Bob"));
    }

    #[test]
    fn test_summary_line() {
        let info = PaginationInfo::compute(45, PageRequest::new(2, 10));
        assert_eq!(summary_line(&info), "Showing 11-20 of 45 (page 2 of 5)");

        let empty = PaginationInfo::compute(0, PageRequest::new(1, 10));
        assert_eq!(summary_line(&empty), "Showing 0 of 0 (page 1 of 0)");
    }

    #[test]
    fn test_export_to_csv() {
        let rows = vec![
            json!({"name": "Ann", "qty": 3}),
            json!({"name": "Bob", "qty": null}),
        ];
        let columns = vec!["name".to_string(), "qty".to_string()];
        let file = NamedTempFile::with_suffix(".csv").unwrap();
        export_to_csv(&rows, &columns, file.path()).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "name,qty\nAnn,3\nBob,\n");
    }
}
