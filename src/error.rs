use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedHeader,
    MalformedMetadata,
    ReservedNameMisuse,
    DuplicateBlockName,
    ManifestInconsistency,
    CsvParse,
    UnknownReferenceTarget,
    UnknownReferenceColumn,
    CyclicReference,
    Encode,
    Io,
}

/// Failure of the pure metadata grammar, without location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("unbalanced `[` or `]`")]
    UnbalancedBrackets,
    #[error("unterminated quoted string")]
    UnterminatedQuote,
    #[error("nested lists are not supported")]
    NestedList,
    #[error("expected `key=value`, found `{0}`")]
    MissingEquals(String),
    #[error("empty key")]
    EmptyKey,
    #[error("invalid key `{0}`")]
    InvalidKey(String),
    #[error("key `{0}` has no value")]
    MissingValue(String),
    #[error("duplicate key `{0}`")]
    DuplicateKey(String),
    #[error("unexpected character `{found}` in value of `{key}`")]
    UnexpectedCharacter { key: String, found: char },
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),
    #[error("trailing content after closing quote in value of `{0}`")]
    TrailingContent(String),
    #[error("empty list item in value of `{0}`")]
    EmptyListItem(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("line {line}: malformed header: {reason}")]
    MalformedHeader { line: usize, reason: String },

    #[error("line {line}: malformed metadata on block `{block}`: {source}")]
    MalformedMetadata {
        block: SmolStr,
        line: usize,
        #[source]
        source: MetadataError,
    },

    #[error("line {line}: block name `manifest` is reserved for the first block")]
    ReservedNameMisuse { line: usize },

    #[error("duplicate block name `{name}`{}", fmt_duplicate(.line, .first_line))]
    DuplicateBlockName {
        name: SmolStr,
        line: Option<usize>,
        first_line: Option<usize>,
    },

    #[error("invalid block name `{name}`: {reason}")]
    InvalidBlockName { name: SmolStr, reason: String },

    #[error("manifest line {line}: {reason}")]
    ManifestInconsistency {
        table: Option<SmolStr>,
        line: usize,
        reason: String,
    },

    #[error("block `{block}`{}: {message}", fmt_line(.line))]
    CsvParse {
        block: SmolStr,
        line: Option<usize>,
        message: String,
    },

    #[error("table `{table}` row {row} column `{column}`: unknown reference target `{target}`")]
    UnknownReferenceTarget {
        table: SmolStr,
        row: usize,
        column: SmolStr,
        target: SmolStr,
    },

    #[error("table `{table}`: refs column `{column}` is not in the header")]
    UnknownReferenceColumn { table: SmolStr, column: SmolStr },

    #[error(
        "table `{table}` row {row} column `{column}`: cyclic reference {}",
        .path.join(" -> ")
    )]
    CyclicReference {
        table: SmolStr,
        row: usize,
        column: SmolStr,
        path: Vec<SmolStr>,
    },

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("read failed: {0}")]
    Io(String),
}

fn fmt_duplicate(line: &Option<usize>, first_line: &Option<usize>) -> String {
    match (line, first_line) {
        (Some(line), Some(first)) => format!(" on line {line} (first defined on line {first})"),
        (Some(line), None) => format!(" on line {line}"),
        _ => String::new(),
    }
}

fn fmt_line(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" line {line}"),
        None => String::new(),
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedHeader { .. } => ErrorKind::MalformedHeader,
            Error::MalformedMetadata { .. } => ErrorKind::MalformedMetadata,
            Error::ReservedNameMisuse { .. } => ErrorKind::ReservedNameMisuse,
            Error::DuplicateBlockName { .. } => ErrorKind::DuplicateBlockName,
            Error::InvalidBlockName { .. } => ErrorKind::MalformedHeader,
            Error::ManifestInconsistency { .. } => ErrorKind::ManifestInconsistency,
            Error::CsvParse { .. } => ErrorKind::CsvParse,
            Error::UnknownReferenceTarget { .. } => ErrorKind::UnknownReferenceTarget,
            Error::UnknownReferenceColumn { .. } => ErrorKind::UnknownReferenceColumn,
            Error::CyclicReference { .. } => ErrorKind::CyclicReference,
            Error::Encode(_) => ErrorKind::Encode,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// 1-based line in the source text, when the error has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::MalformedHeader { line, .. }
            | Error::MalformedMetadata { line, .. }
            | Error::ReservedNameMisuse { line }
            | Error::ManifestInconsistency { line, .. } => Some(*line),
            Error::CsvParse { line, .. } | Error::DuplicateBlockName { line, .. } => *line,
            _ => None,
        }
    }

    pub fn is_reference_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnknownReferenceTarget
                | ErrorKind::UnknownReferenceColumn
                | ErrorKind::CyclicReference
        )
    }

    pub(crate) fn malformed_header(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedHeader {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn manifest(table: Option<&str>, line: usize, reason: impl Into<String>) -> Self {
        Error::ManifestInconsistency {
            table: table.map(SmolStr::new),
            line,
            reason: reason.into(),
        }
    }
}
