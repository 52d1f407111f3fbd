//! `mkdir` — create directories.

use std::io::Write;
use std::os::unix::fs::DirBuilderExt;

use crate::args::{print_usage, wants_help};
use crate::{Io, UtilError, report};

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    if wants_help(argv) {
        return print_usage(io, "mkdir <path...>", &[]);
    }

    let operands = &argv[1..];
    if operands.is_empty() {
        let code = report(io, "mkdir", &UtilError::MissingOperand);
        print_usage(io, "mkdir <path...>", &[]);
        return code;
    }

    let mut status = 0;
    for path in operands {
        match std::fs::DirBuilder::new().mode(0o755).create(path) {
            Ok(()) => {
                let _ = writeln!(io.stdout, "Directory '{path}' created successfully.");
            }
            Err(err) => {
                status = report(io, "mkdir", &UtilError::at(path, err));
            }
        }
    }
    status
}
