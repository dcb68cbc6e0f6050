// pluck.txt -- a text based score compiler for string actuators
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Named chords that can stand in for the digit pairs of a tuple.
//!
//! ```text
//! # name  pairs
//! C       11233241
//! Am      21233141
//! ```
//!
//! With this table, `(Am)4` in a score reads as `(21233141)4`.

use std::collections::BTreeMap;

use log::debug;
use snafu::Snafu;

use crate::latency::numbered_lines;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChordTable {
    aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ChordError {
    #[snafu(display("line {}: expected a chord name followed by digit pairs", line))]
    Malformed { line: usize },
    #[snafu(display("line {}: invalid chord name {:?}", line, name))]
    InvalidName { line: usize, name: String },
    #[snafu(display("line {}: chord {} is not a sequence of digit pairs: {:?}", line, name, pairs))]
    InvalidPairs {
        line: usize,
        name: String,
        pairs: String,
    },
    #[snafu(display("line {}: chord {} is defined twice", line, name))]
    DuplicateChord { line: usize, name: String },
}

impl ChordTable {
    pub fn load(text: &str) -> Result<ChordTable, ChordError> {
        let mut table = ChordTable::default();
        for (line, content) in numbered_lines(text) {
            let content = content.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            let words: Vec<&str> = content.split_whitespace().collect();
            if let [name, pairs] = words[..] {
                table.insert(line, name, pairs)?;
            } else {
                return Err(ChordError::Malformed { line });
            }
        }
        debug!("loaded {} chords", table.len());
        Ok(table)
    }

    fn insert(&mut self, line: usize, name: &str, pairs: &str) -> Result<(), ChordError> {
        let mut chars = name.chars();
        let valid_name = chars.next().map_or(false, |ch| ch.is_ascii_alphabetic())
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '#' || ch == '_');
        if !valid_name {
            return Err(ChordError::InvalidName {
                line,
                name: name.to_string(),
            });
        }
        if pairs.is_empty() || pairs.len() % 2 != 0 || !pairs.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ChordError::InvalidPairs {
                line,
                name: name.to_string(),
                pairs: pairs.to_string(),
            });
        }
        if self.aliases.contains_key(name) {
            return Err(ChordError::DuplicateChord {
                line,
                name: name.to_string(),
            });
        }
        self.aliases.insert(name.to_string(), pairs.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Replace every parenthesized chord name by its digit pairs.
    pub fn substitute(&self, score: &str) -> String {
        let mut out = score.to_string();
        for (name, pairs) in &self.aliases {
            out = out.replace(&format!("({})", name), &format!("({})", pairs));
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn substitution() {
        let table = ChordTable::load("# chords\nC 11233241\n\nAm 21233141\nF#m 3132\n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("Am"), Some("21233141"));
        assert_eq!(
            table.substitute("(C)2 ^(Am)1 (F#m)4 (Cmaj)1 C(11)1"),
            "(11233241)2 ^(21233141)1 (3132)4 (Cmaj)1 C(11)1"
        );
    }

    #[test]
    fn invalid_tables() {
        assert_eq!(
            ChordTable::load("C 112\n"),
            Err(ChordError::InvalidPairs {
                line: 1,
                name: "C".to_string(),
                pairs: "112".to_string()
            })
        );
        assert_eq!(
            ChordTable::load("C 11\nC 12\n"),
            Err(ChordError::DuplicateChord {
                line: 2,
                name: "C".to_string()
            })
        );
        assert_eq!(
            ChordTable::load("7th 11\n"),
            Err(ChordError::InvalidName {
                line: 1,
                name: "7th".to_string()
            })
        );
        assert_eq!(ChordTable::load("C\n"), Err(ChordError::Malformed { line: 1 }));
    }

    #[test]
    fn carriage_returns() {
        let table = ChordTable::load("C 11233241\r\nAm 21233141\r\n").unwrap();
        assert_eq!(table.get("C"), Some("11233241"));
        assert_eq!(
            ChordTable::load("C 11\rAm 21\rC 12\r"),
            Err(ChordError::DuplicateChord {
                line: 3,
                name: "C".to_string()
            })
        );
    }
}
