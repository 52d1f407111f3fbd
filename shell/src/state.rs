//! Shared interpreter state.

use std::path::PathBuf;

use nix::sys::signal::{SigHandler, Signal, signal};
use nix::unistd::{Pid, getpgrp};

use crate::env::Vars;
use crate::history::History;
use crate::jobs::JobTable;

/// Startup options carried for the life of the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellOptions {
    /// `-a`: builtin `ls`/`cp` include hidden entries by default.
    pub show_hidden: bool,
}

pub struct Shell {
    pub options: ShellOptions,
    pub vars: Vars,
    pub jobs: JobTable,
    pub history: History,
    /// `$?`.
    pub last_status: i32,
    /// `$!`.
    pub last_bg_pid: Option<Pid>,
    /// Set by the `exit` builtin; checked between commands.
    pub exit: Option<i32>,
    /// Stdin is a terminal and job control is on.
    pub interactive: bool,
    /// Where `cd -` goes back to.
    pub prev_dir: Option<PathBuf>,
    /// Our own process group, to take the terminal back after a
    /// foreground job.
    pub pgid: Pid,
}

impl Shell {
    pub fn new(options: ShellOptions, interactive: bool) -> Self {
        Shell {
            options,
            vars: Vars::default(),
            jobs: JobTable::default(),
            history: History::default(),
            last_status: 0,
            last_bg_pid: None,
            exit: None,
            interactive,
            prev_dir: None,
            pgid: getpgrp(),
        }
    }

    /// Put the shell in its own process group, grab the terminal, and shut
    /// out the keyboard signals. Children undo the signal part before
    /// exec, so Ctrl-C and Ctrl-Z reach the foreground job and only it.
    pub fn init_job_control(&mut self) {
        let _ = nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
        self.pgid = getpgrp();

        for sig in [
            Signal::SIGINT,
            Signal::SIGQUIT,
            Signal::SIGTSTP,
            Signal::SIGTTOU,
        ] {
            // Single-threaded process, disposition set before any fork.
            unsafe {
                let _ = signal(sig, SigHandler::SigIgn);
            }
        }

        let _ = nix::unistd::tcsetpgrp(std::io::stdin(), self.pgid);
        log::debug!("job control on, shell pgid {}", self.pgid);
    }
}
