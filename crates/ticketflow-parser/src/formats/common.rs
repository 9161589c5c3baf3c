use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::{Delimiter, ParsedExport, RawRow, RawTable};

const BYTE_ORDER_MARK: char = '\u{feff}';

pub(crate) fn first_content_line(content: &str) -> Option<&str> {
    content
        .trim_start_matches(BYTE_ORDER_MARK)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

pub(crate) fn reader_builder(delimiter: Delimiter) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter.as_byte());
    builder
}

pub(crate) fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Checks the detected delimiter of the header line, then reads the table.
pub(crate) fn parse_delimited(
    parser: &'static str,
    expected: Delimiter,
    content: &str,
) -> Result<ParsedExport, ParserError> {
    let header_line = first_content_line(content).ok_or(ParserError::EmptyInput)?;
    let detected = Delimiter::detect(header_line);
    if detected != expected {
        return Err(ParserError::FormatMismatch {
            parser,
            reason: format!("header line is {detected}-delimited, expected {expected}"),
        });
    }

    let table = read_table(parser, expected, content)?;

    Ok(ParsedExport {
        content_hash: content_hash(content),
        delimiter: expected,
        table,
    })
}

pub(crate) fn read_table(
    parser: &'static str,
    delimiter: Delimiter,
    content: &str,
) -> Result<RawTable, ParserError> {
    let content = content.trim_start_matches(BYTE_ORDER_MARK);
    let mut reader = reader_builder(delimiter).from_reader(content.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|source| ParserError::Csv { parser, source })?;
        if is_blank(&record) {
            continue;
        }
        let line_index = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or_default();

        let Some(columns) = headers.as_ref() else {
            headers = Some(parse_headers(parser, &record)?);
            continue;
        };

        rows.push(parse_row(parser, columns.len(), &record, line_index)?);
    }

    let headers = headers.ok_or(ParserError::EmptyInput)?;
    Ok(RawTable { headers, rows })
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn parse_headers(parser: &'static str, record: &StringRecord) -> Result<Vec<String>, ParserError> {
    let mut headers: Vec<String> = Vec::with_capacity(record.len());
    for (idx, raw) in record.iter().enumerate() {
        let name = match raw.trim() {
            "" => format!("column_{idx}"),
            trimmed => trimmed.to_string(),
        };
        if headers
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&name))
        {
            return Err(ParserError::InvalidHeader {
                parser,
                message: format!("duplicate column name '{name}' at position {idx}"),
            });
        }
        headers.push(name);
    }
    Ok(headers)
}

fn parse_row(
    parser: &'static str,
    width: usize,
    record: &StringRecord,
    line_index: usize,
) -> Result<RawRow, ParserError> {
    if record.len() > width {
        let overflow = record.iter().skip(width).any(|field| !field.trim().is_empty());
        if overflow {
            return Err(ParserError::DataRow {
                parser,
                line_index,
                message: format!("expected at most {width} columns but found {}", record.len()),
            });
        }
    }

    let mut cells: Vec<Option<String>> = record.iter().take(width).map(clean_cell).collect();
    cells.resize(width, None);

    Ok(RawRow { line_index, cells })
}

pub(crate) fn clean_cell(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
