use std::fs::File;
use std::path::Path;

use csv::Writer;
use tracing::info;

use crate::error::ReportError;
use crate::render::charts::PoiTable;

/// POI table as CSV with a `Name,Type` header.
pub fn poi_table_to_csv(table: &PoiTable) -> Result<Vec<u8>, ReportError> {
    let mut writer = Writer::from_writer(Vec::new());
    if table.rows.is_empty() {
        writer.write_record(PoiTable::headers())?;
    }
    for row in &table.rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))
}

/// Writes the POI table next to the PDF when the CLI asks for it.
pub fn write_poi_csv(table: &PoiTable, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let mut writer = Writer::from_writer(File::create(path.as_ref())?);
    if table.rows.is_empty() {
        writer.write_record(PoiTable::headers())?;
    }
    for row in &table.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), rows = table.rows.len(), "Exported POI table");
    Ok(())
}
