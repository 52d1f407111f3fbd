//! Environment builtins: export, unset, env, set.

use std::io::Write;

use cshell_utils::Io;

use crate::env::split_assignment;
use crate::state::Shell;

pub fn cmd_export(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    if argv.len() == 1 {
        let mut pairs: Vec<(String, String)> = std::env::vars().collect();
        pairs.sort();
        for (key, value) in pairs {
            let _ = writeln!(io.stdout, "{key}={value}");
        }
        return 0;
    }

    let mut status = 0;
    for arg in &argv[1..] {
        match split_assignment(arg) {
            Some((key, value)) => shell.vars.export(key, value),
            // A bare name publishes an existing local variable.
            None if !arg.is_empty() && !arg.contains('=') => shell.vars.promote(arg),
            None => {
                let _ = writeln!(io.stderr, "export: `{arg}`: not a valid assignment");
                status = 1;
            }
        }
    }
    status
}

pub fn cmd_unset(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    if argv.len() == 1 {
        let _ = writeln!(io.stderr, "unset: missing operand");
        return 1;
    }
    for name in &argv[1..] {
        shell.vars.unset(name);
    }
    0
}

pub fn cmd_env(_shell: &mut Shell, _argv: &[String], io: &mut Io) -> i32 {
    let mut pairs: Vec<(String, String)> = std::env::vars().collect();
    pairs.sort();
    for (key, value) in pairs {
        let _ = writeln!(io.stdout, "{key}={value}");
    }
    0
}

pub fn cmd_set(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    if argv.len() == 1 {
        for (key, value) in shell.vars.locals_sorted() {
            let _ = writeln!(io.stdout, "{key}={value}");
        }
        return 0;
    }

    let mut status = 0;
    for arg in &argv[1..] {
        match split_assignment(arg) {
            Some((key, value)) => shell.vars.set_local(key, value),
            None => {
                let _ = writeln!(io.stderr, "set: `{arg}`: not a valid assignment");
                status = 1;
            }
        }
    }
    status
}
