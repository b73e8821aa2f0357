use std::{fs::File, io::Write, path::Path};

use csv::Writer;

use crate::{browser::TableState, errors::AdminError};

/// Writes the rendered page as CSV, one header row of column names first.
pub fn write_page_csv<W: Write>(writer: W, state: &TableState) -> Result<(), AdminError> {
    let mut wtr = Writer::from_writer(writer);

    wtr.write_record(state.column_defs.iter().map(|def| def.name.as_str()))?;
    for row_index in 0..state.response.rows.len() {
        let cells = state.render_row(row_index)?;
        wtr.write_record(cells.iter().map(|cell| cell.to_string()))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Data export of the current page to a CSV file.
pub fn export_page_to_csv(state: &TableState, file_path: &Path) -> Result<(), AdminError> {
    let file = File::create(file_path)?;
    write_page_csv(file, state)
}
