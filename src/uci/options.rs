//! Engine configuration and its UCI `setoption` surface.

use std::path::PathBuf;

use crate::engine::search::SearchParams;
use crate::engine::tt::TableKind;
use crate::error::OptionError;

pub const MIN_HASH_MB: usize = 1;
pub const MAX_HASH_MB: usize = 4096;
pub const MAX_CONTEMPT: i32 = 500;

/// Every tunable the front-end exposes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub tt_kind: TableKind,
    pub own_book: bool,
    pub book_file: Option<PathBuf>,
    pub search: SearchParams,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            hash_mb: 64,
            tt_kind: TableKind::default(),
            own_book: true,
            book_file: None,
            search: SearchParams::default(),
        }
    }
}

/// What a successful `setoption` requires of the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionChange {
    /// Size or replacement policy changed; the table must be rebuilt
    Table,
    /// Book file changed; reload it
    Book,
    /// A search parameter changed
    Search,
    ClearHash,
    /// Stored, nothing to rebuild
    Stored,
}

/// Option names compare case-insensitively, ignoring spaces and underscores
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, OptionError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(OptionError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_spin<T>(name: &'static str, value: &str, min: T, max: T) -> Result<T, OptionError>
where
    T: std::str::FromStr + PartialOrd,
{
    value
        .parse::<T>()
        .ok()
        .filter(|v| *v >= min && *v <= max)
        .ok_or_else(|| OptionError::InvalidValue {
            name,
            value: value.to_string(),
        })
}

impl EngineOptions {
    pub fn contempt(&self) -> i32 {
        self.search.contempt
    }

    /// `option name ...` lines for the `uci` reply, advertising current values
    pub fn uci_lines(&self) -> Vec<String> {
        let check = |name: &str, on: bool| format!("option name {name} type check default {on}");
        let params = &self.search;
        let tables = TableKind::NAMES
            .iter()
            .map(|n| format!(" var {n}"))
            .collect::<String>();
        let book = self
            .book_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<empty>".to_string());

        vec![
            format!(
                "option name Hash type spin default {} min {MIN_HASH_MB} max {MAX_HASH_MB}",
                self.hash_mb
            ),
            format!("option name TranspositionTable type combo default {}{tables}", self.tt_kind),
            "option name Clear Hash type button".to_string(),
            check("OwnBook", self.own_book),
            format!("option name BookFile type string default {book}"),
            format!(
                "option name Contempt type spin default {} min -{MAX_CONTEMPT} max {MAX_CONTEMPT}",
                params.contempt
            ),
            check("NullMove", params.null_move),
            check("StaticNullMove", params.static_null_move),
            check("LMR", params.lmr),
            check("IID", params.iid),
            check("Futility", params.futility),
            check("Razoring", params.razoring),
            check("SingularExtension", params.singular_extension()),
        ]
    }

    /// Apply one `setoption`. On error nothing changes.
    pub fn apply(&mut self, name: &str, value: Option<&str>) -> Result<OptionChange, OptionError> {
        let value = value.map(str::trim).unwrap_or("");
        let params = &mut self.search;
        let change = match normalize(name).as_str() {
            "hash" => {
                self.hash_mb = parse_spin("Hash", value, MIN_HASH_MB, MAX_HASH_MB)?;
                OptionChange::Table
            }
            "transpositiontable" => {
                self.tt_kind = value.parse().map_err(|_| OptionError::InvalidValue {
                    name: "TranspositionTable",
                    value: value.to_string(),
                })?;
                OptionChange::Table
            }
            "clearhash" => OptionChange::ClearHash,
            "ownbook" => {
                self.own_book = parse_bool("OwnBook", value)?;
                OptionChange::Stored
            }
            "bookfile" => {
                self.book_file = match value {
                    "" | "<empty>" => None,
                    path => Some(PathBuf::from(path)),
                };
                OptionChange::Book
            }
            "contempt" => {
                params.contempt = parse_spin("Contempt", value, -MAX_CONTEMPT, MAX_CONTEMPT)?;
                OptionChange::Search
            }
            "nullmove" => {
                params.null_move = parse_bool("NullMove", value)?;
                OptionChange::Search
            }
            "staticnullmove" => {
                params.static_null_move = parse_bool("StaticNullMove", value)?;
                OptionChange::Search
            }
            "lmr" => {
                params.lmr = parse_bool("LMR", value)?;
                OptionChange::Search
            }
            "iid" => {
                params.iid = parse_bool("IID", value)?;
                OptionChange::Search
            }
            "futility" => {
                params.futility = parse_bool("Futility", value)?;
                OptionChange::Search
            }
            "razoring" => {
                params.razoring = parse_bool("Razoring", value)?;
                OptionChange::Search
            }
            "singularextension" => {
                let on = parse_bool("SingularExtension", value)?;
                params.set_singular_extension(on);
                OptionChange::Search
            }
            _ => return Err(OptionError::Unknown(name.to_string())),
        };
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.hash_mb, 64);
        assert_eq!(options.tt_kind, TableKind::Multiprobe);
        assert!(options.own_book);
        assert!(options.book_file.is_none());
        assert_eq!(options.contempt(), 90);
    }

    #[test]
    fn test_name_normalization() {
        let mut options = EngineOptions::default();
        assert_eq!(options.apply("Hash", Some("128")), Ok(OptionChange::Table));
        assert_eq!(options.hash_mb, 128);
        assert_eq!(options.apply("clear hash", None), Ok(OptionChange::ClearHash));
        assert_eq!(options.apply("Null_Move", Some("false")), Ok(OptionChange::Search));
        assert!(!options.search.null_move);
        assert_eq!(options.apply("transposition table", Some("two-tier")), Ok(OptionChange::Table));
        assert_eq!(options.tt_kind, TableKind::TwoTier);
    }

    #[test]
    fn test_invalid_values_leave_options_unchanged() {
        let mut options = EngineOptions::default();
        assert!(matches!(
            options.apply("Hash", Some("0")),
            Err(OptionError::InvalidValue { name: "Hash", .. })
        ));
        assert!(options.apply("LMR", Some("maybe")).is_err());
        assert!(options.apply("Contempt", Some("1000")).is_err());
        assert_eq!(options.apply("Threads", Some("4")), Err(OptionError::Unknown("Threads".to_string())));
        assert_eq!(options, EngineOptions::default());
    }

    #[test]
    fn test_book_file_and_singular() {
        let mut options = EngineOptions::default();
        assert_eq!(options.apply("BookFile", Some("book.bin")), Ok(OptionChange::Book));
        assert_eq!(options.book_file, Some(PathBuf::from("book.bin")));
        options.apply("BookFile", Some("<empty>")).unwrap();
        assert!(options.book_file.is_none());

        options.apply("SingularExtension", Some("false")).unwrap();
        assert!(!options.search.singular_extension());
        options.apply("Contempt", Some("-20")).unwrap();
        assert_eq!(options.contempt(), -20);
    }

    #[test]
    fn test_uci_lines_reflect_values() {
        let mut options = EngineOptions::default();
        options.apply("Hash", Some("32")).unwrap();
        let lines = options.uci_lines();
        assert!(lines.contains(&"option name Hash type spin default 32 min 1 max 4096".to_string()));
        assert!(lines.contains(
            &"option name TranspositionTable type combo default Multiprobe var Multiprobe var MultiprobeV2 var TwoTier"
                .to_string()
        ));
        assert!(lines.contains(&"option name Clear Hash type button".to_string()));
        assert!(lines.contains(&"option name OwnBook type check default true".to_string()));
    }
}
