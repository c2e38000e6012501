/*! Read event traces from text.
 *
 * The engine consumes syntactic events, not source code. A front end that walks a real syntax
 * tree can hand events over directly; everything else (tests, fixtures, other tools) writes them
 * in this small line-oriented format, which parses into a `TranslationUnit`.
 */

use pest::Parser;
use pest_derive::Parser;
use std::path::Path;
use thiserror::Error;

pub mod lower;

pub use lower::lower_unit;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct TraceParser;

pub type ParseResult<T> = std::result::Result<T, Box<pest::error::Error<Rule>>>;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("Invalid trace at {line}:{column}: {message}")]
    Invalid {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TraceError>;

pub fn parse(input: &str) -> ParseResult<pest::iterators::Pairs<'_, Rule>> {
    TraceParser::parse(Rule::unit, input).map_err(Box::new)
}

pub fn check(input: &str) -> bool {
    parse(input).is_ok()
}

pub fn parse_unit(input: &str) -> Result<freshcheck_core::TranslationUnit> {
    let mut pairs = parse(input)?;
    match pairs.next() {
        Some(unit) => lower_unit(unit),
        None => Ok(freshcheck_core::TranslationUnit::new()),
    }
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<freshcheck_core::TranslationUnit> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_unit(&text)
}
