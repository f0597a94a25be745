pub mod config;
pub mod error;
pub mod header;
pub mod normalize;
pub mod pipeline;
pub mod rows;
pub mod rules;
pub mod table;
pub(crate) mod util;

pub use config::ParserConfig;
pub use error::{ConfigError, ParseError};
pub use header::{CanonicalField, FormatVariant, HeaderMapping, MatchTier};
pub use pipeline::{DropCounts, ParseReport, RowWarning, StatementParser};
pub use rules::{MatchType, TransferRule, TransferRuleEngine};
pub use table::{RawTable, TextEncoding};

