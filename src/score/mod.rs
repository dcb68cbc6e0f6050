// pluck.txt -- a text based score compiler for string actuators
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Parser for the score notation.
//!
//! A score is free text in which every occurrence of
//!
//! ```text
//! [^](<string><position>...)<duration>
//! ```
//!
//! denotes one tuple: all string/position digit pairs inside the parentheses are
//! attacked at the same time, and the next tuple starts `duration` divisions later.
//! A leading `^` marks the tuple as a brush (strum) when brush detection is enabled.
//! Anything that does not form a tuple is ignored.

pub mod scan;
pub mod span;

use std::collections::BTreeMap;

use log::debug;
use snafu::Snafu;

use crate::actuator::{Position, StringId, MAX_POSITION};
use scan::Scan;
use span::Span;

/// Time on the score, measured in divisions.
pub type Time = i64;

pub const BRUSH_MARKER: char = '^';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub start: Time,
    pub position: Position,
    pub duration: u32,
}

/// The notes of one string, ordered by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    events: BTreeMap<Time, NoteEvent>,
}

impl Timeline {
    /// Add a note, refusing to replace another note starting at the same time.
    pub fn insert(&mut self, event: NoteEvent) -> Result<(), NoteEvent> {
        if let Some(existing) = self.events.get(&event.start) {
            return Err(*existing);
        }
        self.events.insert(event.start, event);
        Ok(())
    }

    /// Iterate the notes in the order they are played.
    pub fn iter(&self) -> impl Iterator<Item = &NoteEvent> {
        self.events.values()
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// A strum across a contiguous run of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushEvent {
    pub start: Time,
    /// First string touched, in textual order.
    pub first: StringId,
    /// Last string touched, in textual order.
    pub last: StringId,
}

/// Everything extracted from a score.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Score {
    strings: BTreeMap<StringId, Timeline>,
    brushes: Vec<BrushEvent>,
    /// Time at which the next tuple would have started.
    length: Time,
}

impl Score {
    /// Iterate the strings that are played, in ascending order of their id.
    pub fn strings(&self) -> impl Iterator<Item = (StringId, &Timeline)> {
        self.strings.iter().map(|(&id, timeline)| (id, timeline))
    }

    pub fn timeline(&self, string: StringId) -> Option<&Timeline> {
        self.strings.get(&string)
    }

    pub fn brushes(&self) -> &[BrushEvent] {
        &self.brushes
    }

    pub fn length(&self) -> Time {
        self.length
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ParseError {
    #[snafu(display("invalid string id {}", id))]
    InvalidString { span: Span, id: u8 },
    #[snafu(display("position {} exceeds the maximum position {}", position, MAX_POSITION))]
    PositionOutOfRange { span: Span, position: u8 },
    #[snafu(display("duration must be positive"))]
    ZeroDuration { span: Span },
    #[snafu(display("duration {:?} is too long", text))]
    DurationOverflow { span: Span, text: String },
    #[snafu(display("conflicting operations on string {} at time {}", string, time))]
    Conflict {
        span: Span,
        string: StringId,
        time: Time,
    },
    #[snafu(display("brush skips from string {} to string {}", from, to))]
    DiscontinuousBrush {
        span: Span,
        from: StringId,
        to: StringId,
    },
    #[snafu(display("brush needs at least two strings"))]
    TooFewPitches { span: Span },
}

impl ParseError {
    /// The tuple that caused the error.
    pub fn span(&self) -> Span {
        match self {
            ParseError::InvalidString { span, .. }
            | ParseError::PositionOutOfRange { span, .. }
            | ParseError::ZeroDuration { span }
            | ParseError::DurationOverflow { span, .. }
            | ParseError::Conflict { span, .. }
            | ParseError::DiscontinuousBrush { span, .. }
            | ParseError::TooFewPitches { span } => *span,
        }
    }
}

/// Parse a score into per-string timelines.
/// Brush markers are only interpreted if `brush` is set and ignored otherwise.
///
/// # Examples
///
/// ```
/// # use pluck_txt::actuator::StringId;
/// # use pluck_txt::score::parse_score;
/// let score = parse_score("intro: (1223)2 (10)1", false).unwrap();
/// let first = score.timeline(StringId::new(1).unwrap()).unwrap();
/// assert_eq!(first.iter().map(|n| (n.start, n.position)).collect::<Vec<_>>(), vec![(0, 2), (2, 0)]);
/// assert_eq!(score.length(), 3);
/// ```
pub fn parse_score(input: &str, brush: bool) -> Result<Score, ParseError> {
    let mut p = Parser::new(input, brush);
    p.parse_score()
}

/// The raw text of a tuple, before interpretation.
struct Tuple<'a> {
    span: Span,
    brush: bool,
    pairs: &'a str,
    duration: &'a str,
}

struct Parser<'a> {
    stream: Scan<'a>,
    brush: bool,
    time: Time,
    score: Score,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, brush: bool) -> Self {
        Self {
            stream: Scan::new(input),
            brush,
            time: 0,
            score: Score::default(),
        }
    }

    fn parse_score(&mut self) -> Result<Score, ParseError> {
        let mut tuples = 0;
        while let Some(tuple) = self.next_tuple() {
            self.add_tuple(&tuple)?;
            tuples += 1;
        }
        self.score.length = self.time;
        debug!(
            "parsed {} tuples on {} strings, {} brushes, {} divisions",
            tuples,
            self.score.strings.len(),
            self.score.brushes.len(),
            self.time
        );
        Ok(std::mem::take(&mut self.score))
    }

    /// Find the next well-formed tuple, skipping everything else.
    fn next_tuple(&mut self) -> Option<Tuple<'a>> {
        loop {
            let open = self.stream.skip_past('(')?;
            let mut attempt = self.stream.clone();
            let pairs = attempt.take_while(|ch| ch.is_ascii_digit());
            if pairs.is_empty() || pairs.len() % 2 != 0 || !attempt.eat(')') {
                continue;
            }
            let duration = attempt.take_while(|ch| ch.is_ascii_digit());
            if duration.is_empty() {
                continue;
            }
            self.stream = attempt;

            let brush = self.brush && self.stream.input()[..open].ends_with(BRUSH_MARKER);
            let begin = if brush {
                open - BRUSH_MARKER.len_utf8()
            } else {
                open
            };
            return Some(Tuple {
                span: Span {
                    begin,
                    end: self.stream.offset(),
                },
                brush,
                pairs,
                duration,
            });
        }
    }

    fn add_tuple(&mut self, tuple: &Tuple<'a>) -> Result<(), ParseError> {
        let span = tuple.span;
        let duration = parse_duration(tuple)?;

        let digits: Vec<u8> = tuple.pairs.bytes().map(|b| b - b'0').collect();
        let mut touched = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks_exact(2) {
            let string = StringId::new(pair[0])
                .ok_or(ParseError::InvalidString { span, id: pair[0] })?;
            let position = pair[1];
            if position > MAX_POSITION {
                return Err(ParseError::PositionOutOfRange { span, position });
            }
            let event = NoteEvent {
                start: self.time,
                position,
                duration,
            };
            self.score
                .strings
                .entry(string)
                .or_default()
                .insert(event)
                .map_err(|_| ParseError::Conflict {
                    span,
                    string,
                    time: self.time,
                })?;
            touched.push(string);
        }

        if tuple.brush {
            let brush = brush_range(span, self.time, &touched)?;
            self.score.brushes.push(brush);
        }

        self.time += Time::from(duration);
        Ok(())
    }
}

fn parse_duration(tuple: &Tuple<'_>) -> Result<u32, ParseError> {
    let span = tuple.span;
    match tuple.duration.parse::<u32>() {
        Ok(0) => Err(ParseError::ZeroDuration { span }),
        Ok(duration) => Ok(duration),
        Err(_) => Err(ParseError::DurationOverflow {
            span,
            text: tuple.duration.to_string(),
        }),
    }
}

/// Check that the strings form a contiguous run, in either direction.
fn brush_range(span: Span, start: Time, touched: &[StringId]) -> Result<BrushEvent, ParseError> {
    if touched.len() < 2 {
        return Err(ParseError::TooFewPitches { span });
    }
    for step in touched.windows(2) {
        let (from, to) = (step[0], step[1]);
        if (i16::from(from.get()) - i16::from(to.get())).abs() != 1 {
            return Err(ParseError::DiscontinuousBrush { span, from, to });
        }
    }
    Ok(BrushEvent {
        start,
        first: touched[0],
        last: touched[touched.len() - 1],
    })
}
