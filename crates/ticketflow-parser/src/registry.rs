use crate::errors::{ParserAttempt, ParserError};
use crate::formats::{first_content_line, CommaDelimitedParser, TabDelimitedParser};
use crate::model::{Delimiter, ParsedExport};

pub trait ExportParser {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<ParsedExport, ParserError>;
    /// Delimiter this parser expects on the header line.
    fn delimiter(&self) -> Delimiter;
}

pub fn parse_ticket_export(content: &str) -> Result<ParsedExport, ParserError> {
    let parsers = parsers_for(content)?;
    parse_with_parsers(content, &parsers)
}

/// Registered parsers, the one matching the header line's delimiter first.
pub(crate) fn parsers_for(content: &str) -> Result<Vec<&'static dyn ExportParser>, ParserError> {
    let header_line = first_content_line(content).ok_or(ParserError::EmptyInput)?;
    let detected = Delimiter::detect(header_line);

    let mut parsers: Vec<&'static dyn ExportParser> =
        vec![&TabDelimitedParser, &CommaDelimitedParser];
    parsers.sort_by_key(|parser| parser.delimiter() != detected);
    Ok(parsers)
}

pub fn parse_with_parsers(
    content: &str,
    parsers: &[&dyn ExportParser],
) -> Result<ParsedExport, ParserError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match parser.parse(content) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(ParserAttempt::new(parser.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}
