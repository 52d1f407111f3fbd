//! Shared argument scanning helpers.
//!
//! Option handling in the utilities is a plain linear pass over
//! `argv[1..]`, with `-h`/`--help` recognized everywhere.

use std::io::Write;

use crate::Io;

/// True if any argument asks for the usage text.
pub fn wants_help(argv: &[String]) -> bool {
    argv.iter().skip(1).any(|a| a == "-h" || a == "--help")
}

/// Print the standard usage block: a synopsis line, then the option
/// descriptions (each already formatted as `    -x    text`).
pub fn print_usage(io: &mut Io, synopsis: &str, options: &[&str]) -> i32 {
    let _ = writeln!(io.stdout, "Usage: {synopsis}");
    let _ = writeln!(io.stdout, "Options:");
    let _ = writeln!(io.stdout, "    -h | --help    Print this help message");
    for line in options {
        let _ = writeln!(io.stdout, "{line}");
    }
    0
}
