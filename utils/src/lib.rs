//! The file utilities the shell ships as builtins.
//!
//! Each utility is an ordinary library function: it takes the argument
//! vector (`argv[0]` is the utility name) and an [`Io`] handle set, and
//! returns a process-style exit code. Diagnostics go to the provided
//! stderr as `name: message`; nothing in here prints to the real stdio
//! directly, so the shell can run these in-process, in a forked pipeline
//! stage, or under a captured substitution without special cases.

use std::io::{Read, Write};

pub mod args;
pub mod cat;
pub mod chmod;
pub mod chown;
pub mod cp;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod rm;
pub mod touch;

mod error;

pub use error::{UtilError, UtilResult};

/// Stream set a utility runs against.
pub struct Io<'a> {
    pub stdin: &'a mut dyn Read,
    pub stdout: &'a mut dyn Write,
    pub stderr: &'a mut dyn Write,
}

impl<'a> Io<'a> {
    pub fn new(
        stdin: &'a mut dyn Read,
        stdout: &'a mut dyn Write,
        stderr: &'a mut dyn Write,
    ) -> Self {
        Io {
            stdin,
            stdout,
            stderr,
        }
    }
}

/// Report a failure the way every utility does: `name: error` on stderr,
/// exit code 1.
fn report(io: &mut Io, name: &str, err: &UtilError) -> i32 {
    let _ = writeln!(io.stderr, "{name}: {err}");
    1
}
