//! Migration file parser
//!
//! A migration file is plain SQL split into sections by `-- +migrate`
//! annotations:
//!
//! ```sql
//! -- +migrate Up
//! CREATE TABLE people (id INT);
//!
//! -- +migrate Down
//! DROP TABLE people;
//! ```
//!
//! `Up`/`Down` may be followed by `notransaction`. Statements containing
//! semicolons of their own go between `StatementBegin` and `StatementEnd`.

use super::definitions::MigrationDirection;

const ANNOTATION: &str = "-- +migrate";

/// Template written for freshly created migrations
pub const MIGRATION_TEMPLATE: &str = "-- +migrate Up\n\n-- +migrate Down\n";

/// Reasons a migration file is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no Up/Down annotations found")]
    NoAnnotations,

    #[error("statement in {0} section does not end with a semicolon or StatementEnd")]
    UnterminatedStatement(MigrationDirection),

    #[error("StatementBegin in {0} section has no matching StatementEnd")]
    UnterminatedBlock(MigrationDirection),

    #[error("StatementEnd without StatementBegin on line {0}")]
    UnexpectedStatementEnd(usize),

    #[error("StatementBegin outside an Up/Down section on line {0}")]
    BlockOutsideSection(usize),

    #[error("unknown annotation '{command}' on line {line}")]
    UnknownCommand { command: String, line: usize },
}

/// Statements and transaction flags extracted from one file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedMigration {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub up_no_transaction: bool,
    pub down_no_transaction: bool,
}

impl ParsedMigration {
    fn push(&mut self, direction: MigrationDirection, statement: &str) {
        let statement = statement.trim();
        if statement.is_empty() {
            return;
        }
        match direction {
            MigrationDirection::Up => self.up.push(statement.to_string()),
            MigrationDirection::Down => self.down.push(statement.to_string()),
        }
    }

    fn set_no_transaction(&mut self, direction: MigrationDirection) {
        match direction {
            MigrationDirection::Up => self.up_no_transaction = true,
            MigrationDirection::Down => self.down_no_transaction = true,
        }
    }
}

struct Parser {
    parsed: ParsedMigration,
    section: Option<MigrationDirection>,
    in_block: bool,
    buffer: String,
}

impl Parser {
    fn new() -> Self {
        Self {
            parsed: ParsedMigration::default(),
            section: None,
            in_block: false,
            buffer: String::new(),
        }
    }

    fn close_section(&mut self) -> Result<(), ParseError> {
        let Some(direction) = self.section else {
            return Ok(());
        };
        if self.in_block {
            return Err(ParseError::UnterminatedBlock(direction));
        }
        if !self.buffer.trim().is_empty() {
            return Err(ParseError::UnterminatedStatement(direction));
        }
        Ok(())
    }

    fn annotation(&mut self, rest: &str, line_no: usize) -> Result<(), ParseError> {
        let mut words = rest.split_whitespace();
        let command = words.next().unwrap_or_default();

        match command {
            "Up" | "Down" => {
                self.close_section()?;
                let direction = if command == "Up" {
                    MigrationDirection::Up
                } else {
                    MigrationDirection::Down
                };
                if words.any(|w| w == "notransaction") {
                    self.parsed.set_no_transaction(direction);
                }
                self.section = Some(direction);
                self.buffer.clear();
            }
            "StatementBegin" => {
                if self.section.is_none() {
                    return Err(ParseError::BlockOutsideSection(line_no));
                }
                self.in_block = true;
            }
            "StatementEnd" => {
                let Some(direction) = self.section.filter(|_| self.in_block) else {
                    return Err(ParseError::UnexpectedStatementEnd(line_no));
                };
                self.parsed.push(direction, &self.buffer);
                self.buffer.clear();
                self.in_block = false;
            }
            other => {
                return Err(ParseError::UnknownCommand {
                    command: other.to_string(),
                    line: line_no,
                })
            }
        }
        Ok(())
    }

    fn line(&mut self, line: &str) {
        let Some(direction) = self.section else {
            return;
        };
        let trimmed = line.trim();

        if !self.in_block
            && self.buffer.trim().is_empty()
            && (trimmed.is_empty() || trimmed.starts_with("--"))
        {
            return;
        }

        self.buffer.push_str(line);
        self.buffer.push('\n');

        if !self.in_block && ends_statement(trimmed) {
            self.parsed.push(direction, &self.buffer);
            self.buffer.clear();
        }
    }
}

/// A line ends a statement when its last word before any `--` comment word ends with `;`.
///
/// Only whitespace-separated words starting with `--` open a comment, so `--`
/// inside a literal such as `'a--b'` is kept as code.
fn ends_statement(trimmed: &str) -> bool {
    trimmed
        .split_whitespace()
        .take_while(|word| !word.starts_with("--"))
        .last()
        .map_or(false, |word| word.ends_with(';'))
}

/// Split a migration file into its Up and Down statements
pub fn parse_migration(content: &str) -> Result<ParsedMigration, ParseError> {
    let mut parser = Parser::new();
    let mut annotated = false;

    for (index, line) in content.lines().enumerate() {
        if let Some(rest) = line.trim_start().strip_prefix(ANNOTATION) {
            annotated = true;
            parser.annotation(rest, index + 1)?;
        } else {
            parser.line(line);
        }
    }

    if !annotated {
        return Err(ParseError::NoAnnotations);
    }
    parser.close_section()?;

    Ok(parser.parsed)
}
