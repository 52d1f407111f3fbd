//! System builtins: help, echo, clear, exit.

use std::io::Write;

use cshell_utils::Io;

use crate::builtins::{BUILTINS, BuiltinCategory};
use crate::state::Shell;

pub fn cmd_help(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    if let Some(name) = argv.get(1) {
        let Some(entry) = crate::builtins::find(name) else {
            let _ = writeln!(io.stderr, "help: no builtin named `{name}`");
            return 1;
        };
        let _ = writeln!(io.stdout, "{} - {}", entry.name, entry.desc);
        let _ = writeln!(io.stdout, "Usage: {}", entry.usage);
        let _ = writeln!(io.stdout);
        let _ = writeln!(io.stdout, "{}", entry.detail);
        return 0;
    }

    for category in BuiltinCategory::ALL {
        let _ = writeln!(io.stdout, "{}:", category.label());
        for entry in BUILTINS.iter().filter(|e| e.category == *category) {
            let _ = writeln!(io.stdout, "  {:<8} {}", entry.name, entry.desc);
        }
        let _ = writeln!(io.stdout);
    }
    let _ = writeln!(io.stdout, "Type 'help <command>' for details.");
    0
}

pub fn cmd_echo(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    let _ = writeln!(io.stdout, "{}", argv[1..].join(" "));
    0
}

pub fn cmd_clear(_shell: &mut Shell, _argv: &[String], io: &mut Io) -> i32 {
    let _ = io.stdout.write_all(b"\x1b[2J\x1b[H");
    let _ = io.stdout.flush();
    0
}

pub fn cmd_exit(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    let code = match argv.get(1) {
        None => shell.last_status,
        Some(arg) => match arg.parse::<i32>() {
            Ok(code) => code,
            Err(_) => {
                let _ = writeln!(io.stderr, "exit: {arg}: numeric argument required");
                2
            }
        },
    };
    shell.exit = Some(code);
    code
}
