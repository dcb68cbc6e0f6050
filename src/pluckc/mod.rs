// pluck.txt -- a text based score compiler for string actuators
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Implementation of the score compiler (pluckc).

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use snafu::{ResultExt, Snafu};
use structopt::StructOpt;

use crate::chord::{ChordError, ChordTable};
use crate::emit;
use crate::latency::{ConfigError, LatencyTable};
use crate::schedule::{self, BrushPolicy, ScheduleError, Tempo, Tick};
use crate::score::span::{LineMap, Pos};
use crate::score::{self, ParseError};

#[derive(Debug, StructOpt)]
#[structopt(name = "pluckc", about = "Compiling scores into string actuator commands")]
pub struct Opt {
    /// Log more details. Log messages share stdout with the commands unless `--output` is given.
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    pub verbose: usize,

    /// Latency configuration of the actuator.
    #[structopt(parse(from_os_str))]
    pub config: PathBuf,

    /// The score to compile.
    #[structopt(parse(from_os_str))]
    pub score: PathBuf,

    /// Chord names that may be used instead of digit pairs in the score.
    #[structopt(short, long, parse(from_os_str))]
    pub chords: Option<PathBuf>,

    /// Beats per minute.
    #[structopt(long, default_value = "60")]
    pub tempo: u32,

    /// Divisions per beat.
    #[structopt(long, default_value = "1")]
    pub divisions: u32,

    /// Strum `^`-marked tuples. The brush either replaces or is appended to the
    /// commands at its instant.
    #[structopt(long, possible_values = &["replace", "append"])]
    pub brush: Option<BrushPolicy>,

    /// Output file. Commands are written to stdout if not given.
    #[structopt(short, long, parse(from_os_str))]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cannot read {}: {}", path.display(), source))]
    ReadFile { path: PathBuf, source: io::Error },
    #[snafu(display("cannot write output: {}", source))]
    WriteOutput { source: io::Error },
    #[snafu(display("invalid tempo {} bpm with {} divisions per beat", bpm, divisions))]
    InvalidTempo { bpm: u32, divisions: u32 },
    #[snafu(display("latency configuration: {}", source))]
    Config { source: ConfigError },
    #[snafu(display("chord table: {}", source))]
    Chords { source: ChordError },
    #[snafu(display("score {}: {}", pos, source))]
    Parse { pos: Pos, source: ParseError },
    #[snafu(display("{}", source))]
    Schedule { source: ScheduleError },
}

/// Settings of a single compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub tempo: Tempo,
    /// Brush markers are ignored if this is `None`.
    pub brush: Option<BrushPolicy>,
}

/// Compile a score into actuator commands.
///
/// Chord names are substituted before the score is parsed, so positions in
/// parse errors refer to the substituted text.
pub fn compile(
    config: &str,
    score: &str,
    chords: Option<&ChordTable>,
    options: Options,
) -> Result<Vec<Tick>, Error> {
    let latency = LatencyTable::load(config).context(Config)?;

    let text = match chords {
        Some(table) => table.substitute(score),
        None => score.to_string(),
    };
    let parsed = score::parse_score(&text, options.brush.is_some()).map_err(|source| {
        let lines = LineMap::new(&text);
        debug!("\n{}", lines.excerpt(source.span()));
        Error::Parse {
            pos: lines.offset_to_pos(source.span().begin),
            source,
        }
    })?;

    schedule::schedule(
        &parsed,
        &latency,
        options.tempo,
        options.brush.unwrap_or_default(),
    )
    .context(Schedule)
}

/// Run the compiler as instructed on the command line.
/// Nothing is written unless compilation succeeds.
pub fn run(opt: &Opt) -> Result<(), Error> {
    let tempo = Tempo::new(opt.tempo, opt.divisions).ok_or(Error::InvalidTempo {
        bpm: opt.tempo,
        divisions: opt.divisions,
    })?;
    let config = read(&opt.config)?;
    let source = read(&opt.score)?;
    let chords = match &opt.chords {
        Some(path) => Some(ChordTable::load(&read(path)?).context(Chords)?),
        None => None,
    };

    info!("compiling {}", opt.score.display());
    let options = Options {
        tempo,
        brush: opt.brush,
    };
    let ticks = compile(&config, &source, chords.as_ref(), options)?;
    let rendered = emit::render(&ticks);

    match &opt.output {
        Some(path) => std::fs::write(path, rendered).context(WriteOutput),
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(rendered.as_bytes())
                .and_then(|_| out.flush())
                .context(WriteOutput)
        }
    }
}

fn read(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).context(ReadFile { path })
}

#[cfg(test)]
mod test {
    use super::*;
    use expect_test::{expect, Expect};

    const CONFIG: &str = "\
fret_latency 10
press_latency 5
release_latency 5
move_latency 1 2 20
move_latency 3 2 15
move_latency 1 3 30
";

    fn check(score: &str, options: Options, output: Expect) {
        let ticks = compile(CONFIG, score, None, options).unwrap();
        output.assert_eq(emit::render(&ticks).trim_end());
    }

    fn brush(policy: BrushPolicy) -> Options {
        Options {
            brush: Some(policy),
            ..Options::default()
        }
    }

    #[test]
    fn single_move() {
        check(
            "(12)4",
            Options::default(),
            expect![[r#"
                0 02
                20 06
                25 08"#]],
        );
    }

    #[test]
    fn melody() {
        check(
            "(11)1 (12)1 (13)2 (10)1 (2131)1",
            Options::default(),
            expect![[r#"
                0 06
                5 08
                975 07
                980 02
                1000 06
                1005 08
                1980 07
                1985 03
                2000 06
                2005 08
                4000 07
                4005 08
                5000 16 26
                5005 18 28"#]],
        );
    }

    #[test]
    fn brushed_chord() {
        let score = "(11)1 ^(314151)2";
        check(
            score,
            brush(BrushPolicy::Replace),
            expect![[r#"
                0 06
                5 08
                1000 26 36 46
                1005 CE"#]],
        );
        check(
            score,
            brush(BrushPolicy::Append),
            expect![[r#"
                0 06
                5 08
                1000 26 36 46
                1005 28 38 48 CE"#]],
        );
    }

    #[test]
    fn tempo_scales_time() {
        let options = Options {
            tempo: Tempo::new(120, 4).unwrap(),
            ..Options::default()
        };
        check(
            "(11)1 (11)1 (10)1",
            options,
            expect![[r#"
                0 06
                5 08
                130 08
                250 07
                255 08"#]],
        );
    }

    #[test]
    fn chords() {
        let table = ChordTable::load("E 1121\n").unwrap();
        let ticks = compile(CONFIG, "(E)1", Some(&table), Options::default()).unwrap();
        assert_eq!(emit::render(&ticks), "0 06 16\n5 08 18\n");
    }

    #[test]
    fn idempotent() {
        let score = "(1121)2 (12)1 ^(2232)1 (1020)1";
        let first = compile(CONFIG, score, None, brush(BrushPolicy::Append)).unwrap();
        let second = compile(CONFIG, score, None, brush(BrushPolicy::Append)).unwrap();
        assert_eq!(emit::render(&first), emit::render(&second));
        assert_eq!(first.first().map(|tick| tick.time), Some(0));
    }

    #[test]
    fn errors_are_located() {
        let err = compile(CONFIG, "(11)1\n  (1112)1", None, Options::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "score 2:3: conflicting operations on string 1 at time 1"
        );
        match compile("fret_latency 1\n", "(11)1", None, Options::default()) {
            Err(Error::Config { .. }) => {}
            other => panic!("expected a configuration error, got {:?}", other),
        }
        match compile(CONFIG, "(11)1 (14)1", None, Options::default()) {
            Err(Error::Schedule { .. }) => {}
            other => panic!("expected a scheduling error, got {:?}", other),
        }
    }
}
