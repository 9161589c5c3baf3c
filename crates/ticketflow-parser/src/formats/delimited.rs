use crate::errors::ParserError;
use crate::model::{Delimiter, ParsedExport};
use crate::registry::ExportParser;

use super::parse_delimited;

#[derive(Debug, Default, Clone, Copy)]
pub struct TabDelimitedParser;

impl TabDelimitedParser {
    const NAME: &'static str = "TAB_DELIMITED";
}

impl ExportParser for TabDelimitedParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedExport, ParserError> {
        parse_delimited(Self::NAME, self.delimiter(), content)
    }

    fn delimiter(&self) -> Delimiter {
        Delimiter::Tab
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CommaDelimitedParser;

impl CommaDelimitedParser {
    const NAME: &'static str = "COMMA_DELIMITED";
}

impl ExportParser for CommaDelimitedParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedExport, ParserError> {
        parse_delimited(Self::NAME, self.delimiter(), content)
    }

    fn delimiter(&self) -> Delimiter {
        Delimiter::Comma
    }
}
