//! `touch` — create files, or bump their timestamps.

use std::fs::{File, FileTimes, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::time::SystemTime;

use crate::args::{print_usage, wants_help};
use crate::{Io, UtilError, UtilResult, report};

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    if wants_help(argv) {
        return print_usage(io, "touch <path...>", &[]);
    }

    let operands = &argv[1..];
    if operands.is_empty() {
        let code = report(io, "touch", &UtilError::MissingOperand);
        print_usage(io, "touch <path...>", &[]);
        return code;
    }

    let mut status = 0;
    for path in operands {
        if let Err(err) = touch_one(path) {
            status = report(io, "touch", &err);
        }
    }
    status
}

fn touch_one(path: &str) -> UtilResult<()> {
    // Create-if-missing without truncating what exists; 0644 for new files.
    let file: File = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o644)
        .open(path)
        .map_err(|e| UtilError::at(path, e))?;

    let now = SystemTime::now();
    file.set_times(FileTimes::new().set_accessed(now).set_modified(now))
        .map_err(|e| UtilError::at(path, e))?;
    Ok(())
}
