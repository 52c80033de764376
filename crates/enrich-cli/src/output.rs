use enrich_core::types::FieldMapping;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Cells longer than this are elided in tables; `--json` shows full values.
const CELL_LIMIT: usize = 60;

fn clip(s: &str) -> String {
    if s.chars().count() <= CELL_LIMIT {
        return s.to_string();
    }
    let mut out: String = s.chars().take(CELL_LIMIT - 1).collect();
    out.push('…');
    out
}

/// FIELD / VALUE / SOURCE table for a mapping.
pub fn print_mapping(mapping: &FieldMapping) {
    if mapping.is_empty() {
        println!("(no fields mapped)");
        return;
    }
    let rows = mapping
        .iter()
        .map(|(name, field)| {
            vec![
                name.clone(),
                clip(&field.value.to_string().replace('\n', " ")),
                field.provenance.to_string(),
            ]
        })
        .collect();
    print_table(&["FIELD", "VALUE", "SOURCE"], rows);
}
