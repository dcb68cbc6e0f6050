// pluck.txt -- a text based score compiler for string actuators
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Turn the per-string timelines of a score into one timeline of actuator commands.

use std::collections::HashMap;
use std::str::FromStr;

use log::{debug, info, trace};
use snafu::{ResultExt, Snafu};

use crate::actuator::{Command, StringActuator, StringId};
use crate::latency::{LatencyTable, LookupError};
use crate::score::{Score, Time};

/// Converts divisions to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    bpm: u32,
    divisions: u32,
}

impl Tempo {
    /// Returns `None` if either argument is zero.
    pub fn new(bpm: u32, divisions: u32) -> Option<Tempo> {
        if bpm > 0 && divisions > 0 {
            Some(Tempo { bpm, divisions })
        } else {
            None
        }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Number of divisions per beat.
    pub fn divisions(&self) -> u32 {
        self.divisions
    }

    /// Length of one division in whole milliseconds.
    ///
    /// # Examples
    ///
    /// ```
    /// # use pluck_txt::schedule::Tempo;
    /// assert_eq!(Tempo::default().unit_ms(), 1000);
    /// assert_eq!(Tempo::new(120, 4).unwrap().unit_ms(), 125);
    /// assert_eq!(Tempo::new(90, 1).unwrap().unit_ms(), 667);
    /// ```
    pub fn unit_ms(&self) -> i64 {
        (60_000.0 / f64::from(self.bpm) / f64::from(self.divisions)).round() as i64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            bpm: 60,
            divisions: 1,
        }
    }
}

/// What a brush does to the commands that already happen at its instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushPolicy {
    /// The brush is the only command at its instant.
    Replace,
    /// The brush is issued after the string commands at its instant.
    Append,
}

impl Default for BrushPolicy {
    fn default() -> Self {
        BrushPolicy::Replace
    }
}

impl FromStr for BrushPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(BrushPolicy::Replace),
            "append" => Ok(BrushPolicy::Append),
            other => Err(format!("unknown brush policy {:?}", other)),
        }
    }
}

/// All commands issued at one instant, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub time: i64,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ScheduleError {
    #[snafu(display("string {} at division {}: {}", string, time, source))]
    MissingMove {
        string: StringId,
        time: Time,
        source: LookupError,
    },
    #[snafu(display(
        "not enough time for playing string {} at division {}: command at {} ms, string busy until {} ms",
        string,
        time,
        at,
        busy_until
    ))]
    InsufficientLatency {
        string: StringId,
        time: Time,
        at: i64,
        busy_until: i64,
    },
    #[snafu(display(
        "string {} at division {}: time exceeds the representable range",
        string,
        time
    ))]
    TimeOverflow { string: StringId, time: Time },
    #[snafu(display("command at {} ms cannot be shifted to the origin at {} ms", at, origin))]
    ShiftOverflow { at: i64, origin: i64 },
}

/// Simulate every string of the score and merge the resulting commands.
///
/// Strings are processed in ascending order of their id, so commands falling
/// on the same instant are ordered by string and then by generation order.
/// The returned ticks are sorted by time, and the earliest tick is at time 0.
pub fn schedule(
    score: &Score,
    latency: &LatencyTable,
    tempo: Tempo,
    brush: BrushPolicy,
) -> Result<Vec<Tick>, ScheduleError> {
    let unit = tempo.unit_ms();
    let settle = i64::from(latency.fret());
    info!("scheduling at {} bpm, {} ms per division", tempo.bpm(), unit);

    let mut buckets: HashMap<i64, Vec<Command>> = HashMap::new();

    for (string, timeline) in score.strings() {
        let mut actuator = StringActuator::new(string);
        let mut last_attack: Option<i64> = None;
        for note in timeline.iter() {
            let overflow = || ScheduleError::TimeOverflow {
                string,
                time: note.start,
            };
            let attack = note.start.checked_mul(unit).ok_or_else(overflow)?;
            let actions = actuator
                .play(note.position, latency)
                .context(MissingMove {
                    string,
                    time: note.start,
                })?;
            for action in actions {
                let at = attack.checked_add(action.offset).ok_or_else(overflow)?;
                if let Some(previous) = last_attack {
                    let busy_until = previous.checked_add(settle).ok_or_else(overflow)?;
                    if at < busy_until {
                        return Err(ScheduleError::InsufficientLatency {
                            string,
                            time: note.start,
                            at,
                            busy_until,
                        });
                    }
                }
                trace!("{:7}: {:?}", at, action.command);
                buckets.entry(at).or_default().push(action.command);
            }
            last_attack = Some(attack);
        }
        debug!("string {}: {} notes", string, timeline.len());
    }

    for event in score.brushes() {
        let at = event
            .start
            .checked_mul(unit)
            .ok_or(ScheduleError::TimeOverflow {
                string: event.first,
                time: event.start,
            })?;
        let command = Command::Brush {
            first: event.first,
            last: event.last,
        };
        trace!("{:7}: {:?}", at, command);
        match brush {
            BrushPolicy::Replace => {
                buckets.insert(at, vec![command]);
            }
            BrushPolicy::Append => buckets.entry(at).or_default().push(command),
        }
    }

    // The buckets were filled in no particular order of time.
    let mut ticks: Vec<Tick> = buckets
        .into_iter()
        .map(|(time, commands)| Tick { time, commands })
        .collect();
    ticks.sort_by_key(|tick| tick.time);

    if let Some(origin) = ticks.first().map(|tick| tick.time) {
        for tick in ticks.iter_mut() {
            tick.time = tick
                .time
                .checked_sub(origin)
                .ok_or(ScheduleError::ShiftOverflow {
                    at: tick.time,
                    origin,
                })?;
        }
    }
    info!(
        "{} commands at {} distinct times",
        ticks.iter().map(|tick| tick.commands.len()).sum::<usize>(),
        ticks.len()
    );
    Ok(ticks)
}
