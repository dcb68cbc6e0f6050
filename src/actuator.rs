// pluck.txt -- a text based score compiler for string actuators
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Simulation of a single string on the actuator.

use std::fmt;

use crate::latency::{LatencyTable, LookupError};

/// A fret position on a string. `0` releases the string (open string).
pub type Position = u8;

/// The open string.
pub const OPEN: Position = 0;

/// The position a string rests at before it is played the first time.
pub const REST: Position = 1;

/// Largest fret position. Larger digits would be indistinguishable from
/// the press, release and fret codes in the output.
pub const MAX_POSITION: Position = 5;

/// Identifies one of the (at most 16) physical strings, counting from 1.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StringId(u8);

impl StringId {
    pub const MAX: u8 = 16;

    /// # Examples
    ///
    /// ```
    /// # use pluck_txt::actuator::StringId;
    /// assert!(StringId::new(0).is_none());
    /// assert_eq!(StringId::new(16).map(|id| id.index()), Some(15));
    /// assert!(StringId::new(17).is_none());
    /// ```
    pub fn new(id: u8) -> Option<StringId> {
        if id >= 1 && id <= Self::MAX {
            Some(StringId(id))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero based index used by the hardware.
    pub fn index(self) -> u8 {
        self.0 - 1
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a string does in response to a command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    Press,
    Release,
    Move(Position),
    /// Marks the attack itself.
    FretConfirm,
}

/// A single instruction for the actuator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    String { string: StringId, op: Operation },
    /// Strum over all strings from `first` to `last`, in that direction.
    Brush { first: StringId, last: StringId },
}

/// A command together with its offset in milliseconds relative to the attack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Action {
    pub offset: i64,
    pub command: Command,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StringState {
    pub position: Position,
    pub pressed: bool,
}

impl Default for StringState {
    fn default() -> Self {
        Self {
            position: REST,
            pressed: false,
        }
    }
}

/// Keeps track of where the finger of one string currently is.
#[derive(Debug, Clone)]
pub struct StringActuator {
    id: StringId,
    state: StringState,
}

impl StringActuator {
    pub fn new(id: StringId) -> Self {
        Self {
            id,
            state: StringState::default(),
        }
    }

    pub fn state(&self) -> StringState {
        self.state
    }

    /// Determine the commands needed to attack the string at `position`,
    /// starting from the current state.
    ///
    /// The actions are returned in the order press, move, release, fret
    /// (whichever apply). Offsets are non-positive; the fret confirmation is
    /// always present at offset 0. The state is only updated on success.
    pub fn play(
        &mut self,
        position: Position,
        latency: &LatencyTable,
    ) -> Result<Vec<Action>, LookupError> {
        let mut actions = Vec::with_capacity(4);
        let mut time = 0;
        let mut next = self.state;

        if position == OPEN {
            if self.state.pressed {
                time -= i64::from(latency.release());
                actions.push(self.action(time, Operation::Release));
            }
            next.pressed = false;
        } else {
            if self.state.position != position {
                let travel = latency.latency_between(self.state.position, position)?;
                time -= i64::from(latency.press());
                actions.push(self.action(time, Operation::Press));
                time -= i64::from(travel);
                actions.push(self.action(time, Operation::Move(position)));
                if self.state.pressed {
                    time -= i64::from(latency.release());
                    actions.push(self.action(time, Operation::Release));
                }
            } else if !self.state.pressed {
                time -= i64::from(latency.press());
                actions.push(self.action(time, Operation::Press));
            }
            next = StringState {
                position,
                pressed: true,
            };
        }
        actions.push(self.action(0, Operation::FretConfirm));

        self.state = next;
        Ok(actions)
    }

    fn action(&self, offset: i64, op: Operation) -> Action {
        Action {
            offset,
            command: Command::String {
                string: self.id,
                op,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> LatencyTable {
        LatencyTable::load(
            "fret_latency 10\npress_latency 5\nrelease_latency 7\nmove_latency 1 2 20\nmove_latency 2 3 11\n",
        )
        .unwrap()
    }

    fn ops(actions: &[Action]) -> Vec<(i64, Operation)> {
        actions
            .iter()
            .map(|action| match action.command {
                Command::String { op, .. } => (action.offset, op),
                Command::Brush { .. } => panic!("strings never brush"),
            })
            .collect()
    }

    fn string() -> StringActuator {
        StringActuator::new(StringId::new(3).unwrap())
    }

    #[test]
    fn move_from_rest() {
        let mut s = string();
        let actions = s.play(2, &table()).unwrap();
        assert_eq!(
            ops(&actions),
            vec![
                (-5, Operation::Press),
                (-25, Operation::Move(2)),
                (0, Operation::FretConfirm)
            ]
        );
        assert_eq!(
            s.state(),
            StringState {
                position: 2,
                pressed: true
            }
        );
    }

    #[test]
    fn move_while_pressed_releases_first() {
        let mut s = string();
        s.play(2, &table()).unwrap();
        let actions = s.play(3, &table()).unwrap();
        assert_eq!(
            ops(&actions),
            vec![
                (-5, Operation::Press),
                (-16, Operation::Move(3)),
                (-23, Operation::Release),
                (0, Operation::FretConfirm)
            ]
        );
    }

    #[test]
    fn press_in_place_and_reattack() {
        let mut s = string();
        assert_eq!(
            ops(&s.play(REST, &table()).unwrap()),
            vec![(-5, Operation::Press), (0, Operation::FretConfirm)]
        );
        assert_eq!(
            ops(&s.play(REST, &table()).unwrap()),
            vec![(0, Operation::FretConfirm)]
        );
    }

    #[test]
    fn open_string() {
        let mut s = string();
        assert_eq!(
            ops(&s.play(OPEN, &table()).unwrap()),
            vec![(0, Operation::FretConfirm)]
        );
        s.play(2, &table()).unwrap();
        assert_eq!(
            ops(&s.play(OPEN, &table()).unwrap()),
            vec![(-7, Operation::Release), (0, Operation::FretConfirm)]
        );
        // The finger stays where it was.
        assert_eq!(
            s.state(),
            StringState {
                position: 2,
                pressed: false
            }
        );
    }

    #[test]
    fn missing_move_keeps_state() {
        let mut s = string();
        assert_eq!(
            s.play(3, &table()),
            Err(LookupError::MissingLatency { from: 1, to: 3 })
        );
        assert_eq!(s.state(), StringState::default());
    }
}
