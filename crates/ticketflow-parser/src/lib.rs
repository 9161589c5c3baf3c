pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{ParserAttempt, ParserError};
pub use formats::{CommaDelimitedParser, TabDelimitedParser};
pub use model::{Delimiter, ParsedExport, RawRow, RawTable};
pub use registry::{parse_ticket_export, parse_with_parsers, ExportParser};
