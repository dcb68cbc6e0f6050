// pluck.txt -- a text based score compiler for string actuators
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `pluckc` - the compiler from scores to string actuator commands.

use simple_logger;
use structopt::StructOpt;

use pluck_txt::pluckc::{self, Opt};

fn main() {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level).unwrap();

    if let Err(err) = pluckc::run(&opt) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
