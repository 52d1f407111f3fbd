//! CShell: an interactive POSIX command interpreter with a small set of
//! file utilities built in.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

mod builtins;
mod editor;
mod env;
mod exec;
mod history;
mod jobs;
mod logger;
mod repl;
mod state;

use state::{Shell, ShellOptions};

#[derive(Parser)]
#[command(name = "cshell", about = "A small interactive shell")]
struct Cli {
    /// Verbose, debug mode
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Allow hidden files/folders in builtin listings and copies
    #[arg(short = 'a', long = "all")]
    show_hidden: bool,

    /// Run a single command string and exit
    #[arg(short = 'c', value_name = "CMD")]
    command: Option<String>,

    /// Script file to run
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = logger::init(level);

    let interactive =
        cli.command.is_none() && cli.script.is_none() && std::io::stdin().is_terminal();
    let mut shell = Shell::new(
        ShellOptions {
            show_hidden: cli.show_hidden,
        },
        interactive,
    );

    let status = if let Some(command) = &cli.command {
        shell.run_input(command)
    } else if let Some(script) = &cli.script {
        match std::fs::read_to_string(script) {
            Ok(text) => shell.run_input(&text),
            Err(err) => {
                eprintln!("cshell: {}: {err}", script.display());
                127
            }
        }
    } else if interactive {
        shell.init_job_control();
        repl::run(&mut shell)
    } else {
        // Stdin is a pipe or file: read it all, no prompt, no terminal
        // fiddling.
        let mut text = String::new();
        match std::io::Read::read_to_string(&mut std::io::stdin().lock(), &mut text) {
            Ok(_) => shell.run_input(&text),
            Err(err) => {
                eprintln!("cshell: stdin: {err}");
                1
            }
        }
    };

    let status = shell.exit.unwrap_or(status);
    ExitCode::from((status & 0xff) as u8)
}
