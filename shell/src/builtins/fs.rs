//! Filesystem builtins: cd and pwd, plus thin dispatch into the utility
//! crate for the rest. `ls` and `cp` honor the shell's `-a` startup flag.

use std::io::Write;
use std::path::PathBuf;

use cshell_utils::Io;
use cshell_utils::ls::LsFlags;

use crate::state::Shell;

pub fn cmd_cd(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    if cshell_utils::args::wants_help(argv) {
        return cshell_utils::args::print_usage(io, "cd [dir]", &[]);
    }
    if argv.len() > 2 {
        let _ = writeln!(io.stderr, "cd: too many arguments");
        return 1;
    }

    let target = match argv.get(1).map(String::as_str) {
        None | Some("~") => match shell.vars.get("HOME") {
            Some(home) => PathBuf::from(home),
            None => {
                let _ = writeln!(io.stderr, "cd: HOME not set");
                return 1;
            }
        },
        Some("-") => match shell.prev_dir.clone() {
            Some(prev) => {
                let _ = writeln!(io.stdout, "{}", prev.display());
                prev
            }
            None => {
                let _ = writeln!(io.stderr, "cd: no previous directory");
                return 1;
            }
        },
        Some(path) => PathBuf::from(path),
    };

    let before = std::env::current_dir().ok();
    match std::env::set_current_dir(&target) {
        Ok(()) => {
            if let Some(prev) = &before {
                shell.vars.export("OLDPWD", &prev.display().to_string());
            }
            shell.prev_dir = before;
            if let Ok(now) = std::env::current_dir() {
                shell.vars.export("PWD", &now.display().to_string());
            }
            0
        }
        Err(err) => {
            let _ = writeln!(io.stderr, "cd: {}: {err}", target.display());
            1
        }
    }
}

pub fn cmd_pwd(_shell: &mut Shell, _argv: &[String], io: &mut Io) -> i32 {
    match std::env::current_dir() {
        Ok(dir) => {
            let _ = writeln!(io.stdout, "{}", dir.display());
            0
        }
        Err(err) => {
            let _ = writeln!(io.stderr, "pwd: {err}");
            1
        }
    }
}

pub fn cmd_ls(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    let default = if shell.options.show_hidden {
        LsFlags::ALL
    } else {
        LsFlags::empty()
    };
    cshell_utils::ls::run_with_default(argv, io, default)
}

pub fn cmd_cat(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    cshell_utils::cat::run(argv, io)
}

pub fn cmd_cp(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    if shell.options.show_hidden && !argv.iter().any(|a| a == "-a") {
        let mut with_all: Vec<String> = argv.to_vec();
        with_all.insert(1, "-a".to_string());
        return cshell_utils::cp::run(&with_all, io);
    }
    cshell_utils::cp::run(argv, io)
}

pub fn cmd_mv(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    cshell_utils::mv::run(argv, io)
}

pub fn cmd_rm(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    cshell_utils::rm::run(argv, io)
}

pub fn cmd_mkdir(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    cshell_utils::mkdir::run(argv, io)
}

pub fn cmd_touch(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    cshell_utils::touch::run(argv, io)
}

pub fn cmd_chmod(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    cshell_utils::chmod::run(argv, io)
}

pub fn cmd_chown(_shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    cshell_utils::chown::run(argv, io)
}
