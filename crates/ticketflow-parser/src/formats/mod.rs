mod common;
mod delimited;

pub use delimited::{CommaDelimitedParser, TabDelimitedParser};

pub(crate) use common::{first_content_line, parse_delimited};
#[cfg(test)]
pub(crate) use common::read_table;
