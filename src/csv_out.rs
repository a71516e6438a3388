use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::ScanError;
use crate::model::MergedOutput;

fn write_records<W: Write>(
    writer: &mut csv::Writer<W>,
    merged: &MergedOutput,
) -> Result<(), ScanError> {
    writer.write_record(&merged.headers)?;
    for row in &merged.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, merged: &MergedOutput, delimiter: u8) -> Result<(), ScanError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_records(&mut writer, merged)
}

pub fn write_csv_to_string(merged: &MergedOutput, delimiter: u8) -> Result<String, ScanError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_records(&mut writer, merged)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ScanError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| ScanError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}
