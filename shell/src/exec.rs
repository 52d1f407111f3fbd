//! Command execution: expansion, pipelines, redirection, job launch.
//!
//! A lone foreground builtin runs in-process with its redirections applied
//! by `dup`/`dup2` and restored afterwards. Everything else forks one
//! child per pipeline stage: children join one process group (the first
//! child's pid), pipe ends are wired with `dup2` and every surplus
//! descriptor is closed on both sides, redirections are applied after the
//! pipes so they win, and builtins inside a pipeline just exit with their
//! code from the child.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::sys::signal::{SigHandler, Signal, killpg, signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, dup, dup2, fork, pipe, setpgid, tcsetpgrp};

use cshell_parse::{
    AndOrList, AndOrOp, Command, ParseError, ParseResult, Pipeline, RedirectKind, Script,
    WordContext, expand_word, parse_line,
};
use cshell_utils::Io;

use crate::builtins::{self, BuiltinEntry};
use crate::jobs::JobState;
use crate::state::Shell;

/// A command after expansion: plain argument strings and resolved
/// redirection targets.
#[derive(Debug, Clone)]
struct PreparedCommand {
    argv: Vec<String>,
    redirects: Vec<PreparedRedirect>,
}

#[derive(Debug, Clone)]
struct PreparedRedirect {
    kind: RedirectKind,
    target: String,
}

/// An in-process redirection to undo: `target` was replaced, `backup`
/// holds the original descriptor.
struct SavedFd {
    target: RawFd,
    backup: RawFd,
}

impl WordContext for Shell {
    fn var(&mut self, name: &str) -> Option<String> {
        match name {
            "?" => Some(self.last_status.to_string()),
            "!" => self.last_bg_pid.map(|pid| pid.to_string()),
            "$" => Some(nix::unistd::getpid().to_string()),
            _ => self.vars.get(name),
        }
    }

    fn command_output(&mut self, script: &str) -> ParseResult<String> {
        self.run_captured(script)
            .map_err(ParseError::Substitution)
    }

    fn home(&mut self, user: Option<&str>) -> Option<String> {
        match user {
            None => self.vars.get("HOME").or_else(|| {
                nix::unistd::User::from_uid(nix::unistd::getuid())
                    .ok()
                    .flatten()
                    .map(|u| u.dir.display().to_string())
            }),
            Some(name) => nix::unistd::User::from_name(name)
                .ok()
                .flatten()
                .map(|u| u.dir.display().to_string()),
        }
    }
}

impl Shell {
    /// Parse and run one chunk of input; the return value is also `$?`.
    pub fn run_input(&mut self, input: &str) -> i32 {
        match parse_line(input) {
            Ok(script) => self.run_script(&script),
            Err(err) => {
                eprintln!("cshell: {err}");
                self.last_status = 2;
                2
            }
        }
    }

    pub fn run_script(&mut self, script: &Script) -> i32 {
        let mut status = 0;
        for list in &script.lists {
            if self.exit.is_some() {
                break;
            }
            status = if list.background {
                self.run_background_list(list)
            } else {
                self.run_and_or(list)
            };
        }
        status
    }

    fn run_and_or(&mut self, list: &AndOrList) -> i32 {
        let mut status = self.run_pipeline(&list.head, false);
        for (op, pipeline) in &list.tail {
            if self.exit.is_some() {
                break;
            }
            let take = match op {
                AndOrOp::AndIf => status == 0,
                AndOrOp::OrIf => status != 0,
            };
            if take {
                status = self.run_pipeline(pipeline, false);
            }
        }
        status
    }

    /// `... &`: a single pipeline backgrounds directly; a whole `&&`/`||`
    /// chain runs inside one forked child so its sequencing is preserved.
    fn run_background_list(&mut self, list: &AndOrList) -> i32 {
        if list.tail.is_empty() {
            return self.run_pipeline(&list.head, true);
        }

        let text = list_text(list);
        let _ = std::io::stdout().flush();
        match unsafe { fork() } {
            Err(errno) => {
                eprintln!("cshell: fork: {errno}");
                self.last_status = 1;
                1
            }
            Ok(ForkResult::Child) => {
                let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
                default_signals();
                let code = self.run_and_or(list);
                let _ = std::io::stdout().flush();
                std::process::exit(code);
            }
            Ok(ForkResult::Parent { child }) => {
                let _ = setpgid(child, child);
                let id = self
                    .jobs
                    .add(child, vec![child], JobState::Running, &text);
                println!("[{id}] {child}");
                self.last_bg_pid = Some(child);
                self.last_status = 0;
                0
            }
        }
    }

    fn run_pipeline(&mut self, pipeline: &Pipeline, background: bool) -> i32 {
        let mut prepared = Vec::with_capacity(pipeline.commands.len());
        let mut vanished = false;
        for command in &pipeline.commands {
            match self.prepare_command(command) {
                Ok(Some(ready)) => prepared.push(ready),
                Ok(None) => vanished = true,
                Err(err) => {
                    eprintln!("cshell: {err}");
                    self.last_status = 1;
                    return 1;
                }
            }
        }
        if vanished {
            // A word list that expanded away entirely. Alone that is a
            // no-op; inside a pipeline it is a hole.
            let status = if prepared.is_empty() { 0 } else { 2 };
            if status != 0 {
                eprintln!("cshell: missing command");
            }
            self.last_status = status;
            return status;
        }

        if !background
            && prepared.len() == 1
            && let Some(entry) = builtins::find(&prepared[0].argv[0])
        {
            let command = prepared.remove(0);
            let status = self.run_builtin_inprocess(entry, &command);
            self.last_status = status;
            return status;
        }

        let text = pipeline_text(&prepared);
        let status = self.run_forked_pipeline(&prepared, background, &text);
        self.last_status = status;
        status
    }

    fn prepare_command(&mut self, command: &Command) -> ParseResult<Option<PreparedCommand>> {
        let mut argv = Vec::with_capacity(command.words.len());
        for word in &command.words {
            let text = expand_word(word, self)?;
            if text.is_empty() && !word.has_quoted_segment() {
                continue;
            }
            argv.push(text);
        }

        let mut redirects = Vec::with_capacity(command.redirects.len());
        for redirect in &command.redirects {
            let target = expand_word(&redirect.target, self)?;
            if target.is_empty() {
                return Err(ParseError::MissingRedirectTarget);
            }
            redirects.push(PreparedRedirect {
                kind: redirect.kind,
                target,
            });
        }

        if argv.is_empty() {
            return Ok(None);
        }
        Ok(Some(PreparedCommand { argv, redirects }))
    }

    fn run_builtin_inprocess(&mut self, entry: &BuiltinEntry, command: &PreparedCommand) -> i32 {
        let saved = match apply_redirects_inprocess(&command.redirects) {
            Ok(saved) => saved,
            Err(err) => {
                eprintln!("cshell: {err}");
                return 1;
            }
        };
        let code = self.call_builtin(entry, &command.argv);
        restore_redirects(saved);
        code
    }

    fn call_builtin(&mut self, entry: &BuiltinEntry, argv: &[String]) -> i32 {
        let mut stdin = std::io::stdin().lock();
        let mut stdout = std::io::stdout().lock();
        let mut stderr = std::io::stderr().lock();
        let mut io = Io::new(&mut stdin, &mut stdout, &mut stderr);
        let code = (entry.func)(self, argv, &mut io);
        let _ = io.stdout.flush();
        code
    }

    fn run_forked_pipeline(
        &mut self,
        prepared: &[PreparedCommand],
        background: bool,
        text: &str,
    ) -> i32 {
        let count = prepared.len();
        let mut pgid: Option<Pid> = None;
        let mut pids: Vec<Pid> = Vec::with_capacity(count);
        let mut prev_read: Option<OwnedFd> = None;
        let mut spawn_failed = false;
        // Without a terminal there is no job to hand it to; foreground
        // children then stay in the shell's own group so a tty read does
        // not stop them with SIGTTIN.
        let manage_group = self.interactive || background;

        let _ = std::io::stdout().flush();

        for (idx, command) in prepared.iter().enumerate() {
            let (next_read, write_end) = if idx + 1 < count {
                match pipe() {
                    Ok((read, write)) => (Some(read), Some(write)),
                    Err(errno) => {
                        eprintln!("cshell: pipe: {errno}");
                        spawn_failed = true;
                        break;
                    }
                }
            } else {
                (None, None)
            };

            match unsafe { fork() } {
                Err(errno) => {
                    eprintln!("cshell: fork: {errno}");
                    spawn_failed = true;
                    break;
                }
                Ok(ForkResult::Child) => {
                    let group = if manage_group {
                        // Pid 0 starts a fresh group owned by this child.
                        Some(pgid.unwrap_or(Pid::from_raw(0)))
                    } else {
                        None
                    };
                    self.child_exec(command, prev_read.take(), write_end, next_read, group);
                }
                Ok(ForkResult::Parent { child }) => {
                    let group = *pgid.get_or_insert(child);
                    if manage_group {
                        // Both sides race to set the group; either one wins.
                        let _ = setpgid(child, group);
                    }
                    pids.push(child);
                    prev_read = next_read;
                    // write_end drops here: the parent keeps no pipe ends
                    // except the read side feeding the next stage.
                }
            }
        }
        drop(prev_read);

        let Some(pgid) = pgid else {
            return 1;
        };

        if background {
            let id = self.jobs.add(pgid, pids, JobState::Running, text);
            println!("[{id}] {pgid}");
            self.last_bg_pid = Some(pgid);
            return if spawn_failed { 1 } else { 0 };
        }

        let status = self.wait_foreground(pgid, pids, text);
        if spawn_failed { 1 } else { status }
    }

    /// Give the job the terminal, wait for every stage, take the terminal
    /// back. A stop (Ctrl-Z) parks the job in the table as Stopped.
    pub(crate) fn wait_foreground(&mut self, pgid: Pid, pids: Vec<Pid>, text: &str) -> i32 {
        if self.interactive {
            let _ = tcsetpgrp(std::io::stdin(), pgid);
        }

        let mut status = 0;
        let mut stopped = false;
        let mut remaining = pids.clone();
        for pid in &pids {
            if stopped {
                break;
            }
            loop {
                match waitpid(*pid, Some(WaitPidFlag::WUNTRACED)) {
                    Ok(WaitStatus::Exited(done, code)) => {
                        remaining.retain(|p| p != &done);
                        status = code;
                        break;
                    }
                    Ok(WaitStatus::Signaled(done, sig, _)) => {
                        remaining.retain(|p| p != &done);
                        status = 128 + sig as i32;
                        break;
                    }
                    Ok(WaitStatus::Stopped(..)) => {
                        stopped = true;
                        status = 128 + Signal::SIGTSTP as i32;
                        break;
                    }
                    Ok(_) => continue,
                    Err(Errno::EINTR) => continue,
                    Err(_) => {
                        remaining.retain(|p| p != pid);
                        break;
                    }
                }
            }
        }

        if self.interactive {
            let _ = tcsetpgrp(std::io::stdin(), self.pgid);
        }

        if stopped {
            let id = self.jobs.add(pgid, remaining, JobState::Stopped, text);
            println!("\n[{id}] Stopped  {text}");
        }
        status
    }

    /// Run `script`, capturing its stdout, for `$(...)`.
    pub fn run_captured(&mut self, script: &str) -> Result<String, String> {
        let parsed = parse_line(script).map_err(|e| e.to_string())?;
        let (read_end, write_end) = pipe().map_err(|e| e.to_string())?;
        let _ = std::io::stdout().flush();

        match unsafe { fork() } {
            Err(errno) => Err(errno.to_string()),
            Ok(ForkResult::Child) => {
                if dup2(write_end.as_raw_fd(), 1).is_err() {
                    std::process::exit(1);
                }
                drop(write_end);
                drop(read_end);
                default_signals();
                let code = self.run_script(&parsed);
                let _ = std::io::stdout().flush();
                std::process::exit(code);
            }
            Ok(ForkResult::Parent { child }) => {
                drop(write_end);
                let mut output = String::new();
                let mut pipe_file = File::from(read_end);
                let _ = pipe_file.read_to_string(&mut output);
                loop {
                    match waitpid(child, None) {
                        Err(Errno::EINTR) => continue,
                        _ => break,
                    }
                }
                Ok(output)
            }
        }
    }

    /// The child side of a pipeline stage. Never returns.
    ///
    /// `group` is `None` to stay in the shell's process group, or the
    /// group to join (pid 0 starting a fresh one).
    fn child_exec(
        &mut self,
        command: &PreparedCommand,
        stdin_pipe: Option<OwnedFd>,
        stdout_pipe: Option<OwnedFd>,
        next_read: Option<OwnedFd>,
        group: Option<Pid>,
    ) -> ! {
        if let Some(pgid) = group {
            let _ = setpgid(Pid::from_raw(0), pgid);
        }
        default_signals();

        if let Some(fd) = &stdin_pipe
            && dup2(fd.as_raw_fd(), 0).is_err()
        {
            eprintln!("cshell: dup2 stdin failed");
            std::process::exit(1);
        }
        if let Some(fd) = &stdout_pipe
            && dup2(fd.as_raw_fd(), 1).is_err()
        {
            eprintln!("cshell: dup2 stdout failed");
            std::process::exit(1);
        }
        // Close every pipe end this stage inherited; without this the
        // downstream reader never sees EOF.
        drop(stdin_pipe);
        drop(stdout_pipe);
        drop(next_read);

        // Explicit redirections go last so they override the pipe wiring.
        for redirect in &command.redirects {
            match open_redirect(redirect) {
                Ok((target_fd, file)) => {
                    if dup2(file.as_raw_fd(), target_fd).is_err() {
                        eprintln!("cshell: redirection failed");
                        std::process::exit(1);
                    }
                }
                Err(err) => {
                    eprintln!("cshell: {err}");
                    std::process::exit(1);
                }
            }
        }

        if let Some(entry) = builtins::find(&command.argv[0]) {
            let code = self.call_builtin(entry, &command.argv);
            let _ = std::io::stdout().flush();
            std::process::exit(code);
        }

        self.exec_external(&command.argv)
    }

    fn exec_external(&mut self, argv: &[String]) -> ! {
        let name = &argv[0];

        // `./` and friends: a directory is not a program.
        if name.contains('/')
            && let Ok(meta) = std::fs::metadata(name)
            && meta.is_dir()
        {
            eprintln!("cshell: {name}: is a directory");
            std::process::exit(126);
        }

        let mut cargs = Vec::with_capacity(argv.len());
        for arg in argv {
            match CString::new(arg.as_str()) {
                Ok(carg) => cargs.push(carg),
                Err(_) => {
                    eprintln!("cshell: {name}: invalid argument");
                    std::process::exit(1);
                }
            }
        }

        let errno = match nix::unistd::execvp(&cargs[0], &cargs) {
            Ok(never) => match never {},
            Err(errno) => errno,
        };
        match errno {
            Errno::ENOENT => {
                eprintln!("cshell: {name}: command not found");
                std::process::exit(127);
            }
            Errno::EACCES => {
                eprintln!("cshell: {name}: permission denied");
                std::process::exit(126);
            }
            other => {
                eprintln!("cshell: {name}: {other}");
                std::process::exit(126);
            }
        }
    }
}

/// Continue a job's process group and wait for it as the foreground job.
/// Shared by `fg`.
pub(crate) fn continue_job(shell: &mut Shell, pgid: Pid, pids: Vec<Pid>, text: &str) -> i32 {
    let _ = killpg(pgid, Signal::SIGCONT);
    shell.wait_foreground(pgid, pids, text)
}

fn default_signals() {
    for sig in [
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGTSTP,
        Signal::SIGTTOU,
    ] {
        // Child setup between fork and exec; nothing else is running.
        unsafe {
            let _ = signal(sig, SigHandler::SigDfl);
        }
    }
}

fn open_redirect(redirect: &PreparedRedirect) -> Result<(RawFd, File), String> {
    let open = |kind: &RedirectKind, path: &str| -> std::io::Result<(RawFd, File)> {
        match kind {
            RedirectKind::Input => Ok((0, File::open(path)?)),
            RedirectKind::OutputTruncate => Ok((
                1,
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)?,
            )),
            RedirectKind::OutputAppend => {
                Ok((1, OpenOptions::new().append(true).create(true).open(path)?))
            }
        }
    };
    open(&redirect.kind, &redirect.target).map_err(|err| format!("{}: {err}", redirect.target))
}

fn apply_redirects_inprocess(redirects: &[PreparedRedirect]) -> Result<Vec<SavedFd>, String> {
    let mut saved = Vec::with_capacity(redirects.len());
    let _ = std::io::stdout().flush();

    for redirect in redirects {
        let (target_fd, file) = match open_redirect(redirect) {
            Ok(opened) => opened,
            Err(err) => {
                restore_redirects(saved);
                return Err(err);
            }
        };
        let backup = match dup(target_fd) {
            Ok(fd) => fd,
            Err(errno) => {
                restore_redirects(saved);
                return Err(format!("dup: {errno}"));
            }
        };
        if dup2(file.as_raw_fd(), target_fd).is_err() {
            let _ = nix::unistd::close(backup);
            restore_redirects(saved);
            return Err("redirection failed".to_string());
        }
        saved.push(SavedFd {
            target: target_fd,
            backup,
        });
    }
    Ok(saved)
}

fn restore_redirects(saved: Vec<SavedFd>) {
    let _ = std::io::stdout().flush();
    for slot in saved {
        let _ = dup2(slot.backup, slot.target);
        let _ = nix::unistd::close(slot.backup);
    }
}

fn pipeline_text(prepared: &[PreparedCommand]) -> String {
    prepared
        .iter()
        .map(|c| c.argv.join(" "))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn list_text(list: &AndOrList) -> String {
    let mut out = raw_pipeline_text(&list.head);
    for (op, pipeline) in &list.tail {
        out.push_str(match op {
            AndOrOp::AndIf => " && ",
            AndOrOp::OrIf => " || ",
        });
        out.push_str(&raw_pipeline_text(pipeline));
    }
    out
}

fn raw_pipeline_text(pipeline: &Pipeline) -> String {
    pipeline
        .commands
        .iter()
        .map(|c| {
            c.words
                .iter()
                .map(|w| w.flatten())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
