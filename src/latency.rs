// pluck.txt -- a text based score compiler for string actuators
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Mechanical latencies of the actuator, loaded from a line based configuration.
//!
//! ```text
//! fret_latency 10
//! press_latency 5
//! release_latency 5
//! move_latency 1 2 20
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use log::{debug, info};
use snafu::Snafu;

use crate::actuator::{Position, MAX_POSITION};

/// Latencies in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyTable {
    fret: u32,
    press: u32,
    release: u32,
    /// Undirected move graph. Every edge is stored in both directions.
    moves: BTreeMap<Position, BTreeMap<Position, u32>>,
}

/// Errors while loading a latency configuration. Line numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ConfigError {
    #[snafu(display("line {}: wrong number of arguments to {}", line, directive))]
    WrongArity { line: usize, directive: &'static str },
    #[snafu(display("line {}: conflicting assignment of {}", line, directive))]
    DuplicateScalar { line: usize, directive: &'static str },
    #[snafu(display("line {}: conflicting assignment of move_latency {} {}", line, from, to))]
    DuplicateMove {
        line: usize,
        from: Position,
        to: Position,
    },
    #[snafu(display(
        "line {}: move_latency position {} exceeds the maximum position {}",
        line,
        position,
        MAX_POSITION
    ))]
    PositionOutOfRange { line: usize, position: u32 },
    #[snafu(display("line {}: move_latency cannot apply to the same position {}", line, position))]
    SelfMove { line: usize, position: Position },
    #[snafu(display(
        "line {}: argument #{} of {} is not a positive integer: {:?}",
        line,
        argument,
        directive,
        text
    ))]
    InvalidNumber {
        line: usize,
        directive: &'static str,
        argument: usize,
        text: String,
    },
    #[snafu(display("missing {} directive", directive))]
    MissingDirective { directive: &'static str },
}

/// Failed lookups in a loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum LookupError {
    #[snafu(display("no move latency defined between positions {} and {}", from, to))]
    MissingLatency { from: Position, to: Position },
}

const FRET: &str = "fret_latency";
const PRESS: &str = "press_latency";
const RELEASE: &str = "release_latency";
const MOVE: &str = "move_latency";

impl LatencyTable {
    /// Parse a latency configuration and close the move graph under symmetry.
    ///
    /// # Examples
    ///
    /// ```
    /// # use pluck_txt::latency::LatencyTable;
    /// let table = LatencyTable::load(
    ///     "fret_latency 10\npress_latency 5\nrelease_latency 5\nmove_latency 1 2 20\n",
    /// )
    /// .unwrap();
    /// assert_eq!(table.latency_between(2, 1), Ok(20));
    /// ```
    pub fn load(config: &str) -> Result<LatencyTable, ConfigError> {
        let mut fret = None;
        let mut press = None;
        let mut release = None;
        let mut moves: BTreeMap<Position, BTreeMap<Position, u32>> = BTreeMap::new();

        for (line, text) in numbered_lines(config) {
            let words: Vec<&str> = text.split_whitespace().collect();
            let (directive, args) = match words.split_first() {
                Some(split) => split,
                None => continue,
            };
            match *directive {
                FRET => set_scalar(&mut fret, FRET, line, args)?,
                PRESS => set_scalar(&mut press, PRESS, line, args)?,
                RELEASE => set_scalar(&mut release, RELEASE, line, args)?,
                MOVE => {
                    if args.len() != 3 {
                        return Err(ConfigError::WrongArity {
                            line,
                            directive: MOVE,
                        });
                    }
                    let from = position_arg(line, 1, args[0])?;
                    let to = position_arg(line, 2, args[1])?;
                    let latency: u32 = positive_arg(MOVE, line, 3, args[2])?;
                    if from == to {
                        return Err(ConfigError::SelfMove {
                            line,
                            position: from,
                        });
                    }
                    let exact = moves.get(&from).and_then(|row| row.get(&to));
                    let mirror = moves.get(&to).and_then(|row| row.get(&from));
                    // A mirrored directive is only redundant if it agrees.
                    if exact.is_some() || mirror.map_or(false, |&v| v != latency) {
                        return Err(ConfigError::DuplicateMove { line, from, to });
                    }
                    moves.entry(from).or_default().insert(to, latency);
                }
                other => info!("line {}: ignoring unknown directive {:?}", line, other),
            }
        }

        let table = LatencyTable {
            fret: fret.ok_or(ConfigError::MissingDirective { directive: FRET })?,
            press: press.ok_or(ConfigError::MissingDirective { directive: PRESS })?,
            release: release.ok_or(ConfigError::MissingDirective { directive: RELEASE })?,
            moves: symmetric_closure(moves),
        };
        debug!(
            "latencies: fret {} ms, press {} ms, release {} ms, {} move edges",
            table.fret,
            table.press,
            table.release,
            table.moves.values().map(|row| row.len()).sum::<usize>() / 2
        );
        Ok(table)
    }

    /// Time for the string to settle after an attack before it can be operated again.
    pub fn fret(&self) -> u32 {
        self.fret
    }

    pub fn press(&self) -> u32 {
        self.press
    }

    pub fn release(&self) -> u32 {
        self.release
    }

    /// Direct lookup of the move latency between two positions.
    /// No path through intermediate positions is searched.
    pub fn latency_between(&self, from: Position, to: Position) -> Result<u32, LookupError> {
        self.moves
            .get(&from)
            .and_then(|row| row.get(&to))
            .copied()
            .ok_or(LookupError::MissingLatency { from, to })
    }
}

fn set_scalar(
    slot: &mut Option<u32>,
    directive: &'static str,
    line: usize,
    args: &[&str],
) -> Result<(), ConfigError> {
    if args.len() != 1 {
        return Err(ConfigError::WrongArity { line, directive });
    }
    if slot.is_some() {
        return Err(ConfigError::DuplicateScalar { line, directive });
    }
    *slot = Some(positive_arg(directive, line, 1, args[0])?);
    Ok(())
}

fn positive_arg<T: FromStr>(
    directive: &'static str,
    line: usize,
    argument: usize,
    text: &str,
) -> Result<T, ConfigError> {
    parse_positive(text).ok_or_else(|| ConfigError::InvalidNumber {
        line,
        directive,
        argument,
        text: text.to_string(),
    })
}

fn position_arg(line: usize, argument: usize, text: &str) -> Result<Position, ConfigError> {
    let position: u32 = positive_arg(MOVE, line, argument, text)?;
    if position > u32::from(MAX_POSITION) {
        return Err(ConfigError::PositionOutOfRange { line, position });
    }
    Ok(position as Position)
}

/// Split a text into lines at `\n`, `\r` or `\r\n`, numbered from 1.
pub(crate) fn numbered_lines(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut line = 1;
    let mut begin = 0;
    let mut after_cr = false;
    for (pos, ch) in text.char_indices() {
        match ch {
            '\n' if after_cr => begin = pos + 1,
            '\n' | '\r' => {
                lines.push((line, &text[begin..pos]));
                line += 1;
                begin = pos + 1;
            }
            _ => {}
        }
        after_cr = ch == '\r';
    }
    if begin < text.len() {
        lines.push((line, &text[begin..]));
    }
    lines
}

/// Accepts a plain positive decimal without sign or leading zeros,
/// optionally padded by whitespace.
fn parse_positive<T: FromStr>(text: &str) -> Option<T> {
    let digits = text.trim();
    let mut chars = digits.chars();
    match chars.next() {
        Some('1'..='9') if chars.all(|ch| ch.is_ascii_digit()) => digits.parse().ok(),
        _ => None,
    }
}

/// Add the reverse of every edge that was only given in one direction.
fn symmetric_closure(
    mut moves: BTreeMap<Position, BTreeMap<Position, u32>>,
) -> BTreeMap<Position, BTreeMap<Position, u32>> {
    let edges: Vec<(Position, Position, u32)> = moves
        .iter()
        .flat_map(|(&from, row)| row.iter().map(move |(&to, &latency)| (from, to, latency)))
        .collect();
    for (from, to, latency) in edges {
        moves.entry(to).or_default().entry(from).or_insert(latency);
    }
    moves
}

#[cfg(test)]
mod test {
    use super::*;

    const BASE: &str = "fret_latency 10\npress_latency 5\nrelease_latency 7\n";

    fn load_with(extra: &str) -> Result<LatencyTable, ConfigError> {
        LatencyTable::load(&format!("{}{}", BASE, extra))
    }

    #[test]
    fn scalars() {
        let table = load_with("").unwrap();
        assert_eq!(table.fret(), 10);
        assert_eq!(table.press(), 5);
        assert_eq!(table.release(), 7);
    }

    #[test]
    fn closure_is_symmetric() {
        let table = load_with("move_latency 1 2 20\nmove_latency 3 1 15\nmove_latency 2 3 9\n").unwrap();
        for &(a, b) in &[(1, 2), (1, 3), (2, 3)] {
            assert!(table.latency_between(a, b).is_ok());
            assert_eq!(table.latency_between(a, b), table.latency_between(b, a));
        }
        assert_eq!(table.latency_between(3, 1), Ok(15));
    }

    #[test]
    fn no_transitive_lookup() {
        let table = load_with("move_latency 1 2 20\nmove_latency 2 3 20\n").unwrap();
        assert_eq!(
            table.latency_between(1, 3),
            Err(LookupError::MissingLatency { from: 1, to: 3 })
        );
    }

    #[test]
    fn agreeing_mirror_is_accepted() {
        let table = load_with("move_latency 1 2 20\nmove_latency 2 1 20\n").unwrap();
        assert_eq!(table.latency_between(2, 1), Ok(20));
    }

    #[test]
    fn conflicting_moves() {
        assert_eq!(
            load_with("move_latency 1 2 20\nmove_latency 1 2 20\n"),
            Err(ConfigError::DuplicateMove { line: 5, from: 1, to: 2 })
        );
        assert_eq!(
            load_with("move_latency 1 2 20\nmove_latency 2 1 30\n"),
            Err(ConfigError::DuplicateMove { line: 5, from: 2, to: 1 })
        );
    }

    #[test]
    fn self_move() {
        assert_eq!(
            load_with("move_latency 4 4 20\n"),
            Err(ConfigError::SelfMove { line: 4, position: 4 })
        );
    }

    #[test]
    fn duplicate_scalar() {
        assert_eq!(
            load_with("press_latency 3\n"),
            Err(ConfigError::DuplicateScalar {
                line: 4,
                directive: "press_latency"
            })
        );
    }

    #[test]
    fn malformed_numbers() {
        for bad in &["0", "-3", "07", "1.5", "x"] {
            match load_with(&format!("move_latency 1 2 {}\n", bad)) {
                Err(ConfigError::InvalidNumber { argument: 3, .. }) => {}
                other => panic!("unexpected result for {:?}: {:?}", bad, other),
            }
        }
        assert_eq!(
            LatencyTable::load("fret_latency 1 2\n"),
            Err(ConfigError::WrongArity {
                line: 1,
                directive: "fret_latency"
            })
        );
        assert_eq!(
            load_with("move_latency 1 2\n"),
            Err(ConfigError::WrongArity {
                line: 4,
                directive: "move_latency"
            })
        );
    }

    #[test]
    fn missing_and_unknown_directives() {
        assert_eq!(
            LatencyTable::load("fret_latency 1\n\nrelease_latency 2\ntempo 90\n"),
            Err(ConfigError::MissingDirective {
                directive: "press_latency"
            })
        );
        assert!(load_with("\r\nvolume 11\n").is_ok());
    }

    #[test]
    fn carriage_returns() {
        let table = LatencyTable::load("fret_latency 10\rpress_latency 5\rrelease_latency 5\r").unwrap();
        assert_eq!(table.press(), 5);
        assert_eq!(
            LatencyTable::load("fret_latency 1\r\npress_latency 2\r\npress_latency 3\r\n"),
            Err(ConfigError::DuplicateScalar {
                line: 3,
                directive: "press_latency"
            })
        );
        assert_eq!(
            load_with("\rmove_latency 2 2 5\r"),
            Err(ConfigError::SelfMove { line: 5, position: 2 })
        );
    }

    #[test]
    fn line_splitting() {
        assert_eq!(
            numbered_lines("a\r\nb\rc\n\nd"),
            vec![(1, "a"), (2, "b"), (3, "c"), (4, ""), (5, "d")]
        );
        assert_eq!(numbered_lines(""), vec![]);
    }

    #[test]
    fn positions_beyond_the_actuator() {
        assert_eq!(
            load_with("move_latency 1 300 20\n"),
            Err(ConfigError::PositionOutOfRange { line: 4, position: 300 })
        );
        assert_eq!(
            load_with("move_latency 6 1 20\n"),
            Err(ConfigError::PositionOutOfRange { line: 4, position: 6 })
        );
        assert!(load_with("move_latency 5 1 20\n").is_ok());
    }

    #[test]
    fn positive_parsing() {
        assert_eq!(parse_positive::<u32>(" 42 "), Some(42));
        assert_eq!(parse_positive::<u8>("300"), None);
        assert_eq!(parse_positive::<u32>("300"), Some(300));
        assert_eq!(parse_positive::<u32>(""), None);
    }
}
