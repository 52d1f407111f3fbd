//! `cat` — copy files (or stdin) to stdout.

use std::fs::File;

use crate::args::{print_usage, wants_help};
use crate::{Io, UtilError, report};

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    if wants_help(argv) {
        return print_usage(io, "cat [file...]", &[]);
    }

    let files = &argv[1..];
    if files.is_empty() {
        return match std::io::copy(io.stdin, io.stdout) {
            Ok(_) => 0,
            Err(err) => report(io, "cat", &err.into()),
        };
    }

    // A file that will not open is diagnosed and skipped; the rest still
    // print. The exit code remembers the failure.
    let mut status = 0;
    for path in files {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                status = report(io, "cat", &UtilError::at(path, err));
                continue;
            }
        };
        if let Err(err) = std::io::copy(&mut file, io.stdout) {
            status = report(io, "cat", &UtilError::at(path, err));
        }
    }
    status
}
