//! Process-control builtins: jobs, fg, bg, kill, wait.

use std::io::Write;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill, killpg};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

use cshell_utils::Io;

use crate::jobs::{JobState, parse_job_ref};
use crate::state::Shell;

pub fn cmd_jobs(shell: &mut Shell, _argv: &[String], io: &mut Io) -> i32 {
    shell.jobs.refresh();
    for job in shell.jobs.iter() {
        let _ = writeln!(
            io.stdout,
            "[{}] {}  {}",
            job.id,
            job.state.label(),
            job.command
        );
    }
    0
}

pub fn cmd_fg(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    let Some(id) = argv.get(1).and_then(|a| parse_job_ref(a)) else {
        let _ = writeln!(io.stderr, "fg: usage: fg %job");
        return 1;
    };
    let Some(job) = shell.jobs.remove(id) else {
        let _ = writeln!(io.stderr, "fg: %{id}: no such job");
        return 1;
    };

    let _ = writeln!(io.stdout, "{}", job.command);
    let _ = io.stdout.flush();
    crate::exec::continue_job(shell, job.pgid, job.pids, &job.command)
}

pub fn cmd_bg(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    let Some(id) = argv.get(1).and_then(|a| parse_job_ref(a)) else {
        let _ = writeln!(io.stderr, "bg: usage: bg %job");
        return 1;
    };
    let Some(job) = shell.jobs.get(id) else {
        let _ = writeln!(io.stderr, "bg: %{id}: no such job");
        return 1;
    };
    if job.state != JobState::Stopped {
        let _ = writeln!(io.stderr, "bg: job %{id} already running");
        return 1;
    }

    let pgid = job.pgid;
    let command = job.command.clone();
    if let Err(errno) = killpg(pgid, Signal::SIGCONT) {
        let _ = writeln!(io.stderr, "bg: {errno}");
        return 1;
    }
    shell.jobs.mark_running(id);
    let _ = writeln!(io.stdout, "[{id}] {command} &");
    0
}

pub fn cmd_kill(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    let Some(target) = argv.get(1) else {
        let _ = writeln!(io.stderr, "kill: usage: kill <pid | %job>");
        return 1;
    };

    if let Some(id) = parse_job_ref(target) {
        let Some(job) = shell.jobs.get(id) else {
            let _ = writeln!(io.stderr, "kill: %{id}: no such job");
            return 1;
        };
        return match killpg(job.pgid, Signal::SIGTERM) {
            Ok(()) => 0,
            Err(errno) => {
                let _ = writeln!(io.stderr, "kill: {errno}");
                1
            }
        };
    }

    match target.parse::<i32>() {
        Ok(raw) => match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => 0,
            Err(errno) => {
                let _ = writeln!(io.stderr, "kill: ({raw}): {errno}");
                1
            }
        },
        Err(_) => {
            let _ = writeln!(io.stderr, "kill: {target}: invalid target");
            1
        }
    }
}

pub fn cmd_wait(shell: &mut Shell, argv: &[String], io: &mut Io) -> i32 {
    let Some(raw) = argv.get(1).and_then(|a| a.parse::<i32>().ok()) else {
        let _ = writeln!(io.stderr, "wait: usage: wait <pid>");
        return 1;
    };
    let pid = Pid::from_raw(raw);

    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                shell.jobs.refresh();
                return code;
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                shell.jobs.refresh();
                return 128 + sig as i32;
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                let _ = writeln!(io.stderr, "wait: pid {raw} is not a child of this shell");
                return 1;
            }
            Err(errno) => {
                let _ = writeln!(io.stderr, "wait: {errno}");
                return 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Shell, ShellOptions};

    fn run(
        func: crate::builtins::BuiltinFn,
        shell: &mut Shell,
        argv: &[&str],
    ) -> (i32, String, String) {
        let args: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        let mut stdin = std::io::empty();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = {
            let mut io = Io::new(&mut stdin, &mut stdout, &mut stderr);
            func(shell, &args, &mut io)
        };
        (
            code,
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
        )
    }

    #[test]
    fn jobs_lists_the_table() {
        let mut shell = Shell::new(ShellOptions::default(), false);
        shell
            .jobs
            .add(Pid::from_raw(999999), vec![], JobState::Stopped, "vi notes");
        let (code, out, _) = run(cmd_jobs, &mut shell, &["jobs"]);
        assert_eq!(code, 0);
        assert!(out.contains("[1] Stopped  vi notes"));
    }

    #[test]
    fn fg_and_bg_reject_unknown_jobs() {
        let mut shell = Shell::new(ShellOptions::default(), false);
        let (code, _, err) = run(cmd_fg, &mut shell, &["fg", "%7"]);
        assert_eq!(code, 1);
        assert!(err.contains("no such job"));

        let (code, _, err) = run(cmd_bg, &mut shell, &["bg", "%7"]);
        assert_eq!(code, 1);
        assert!(err.contains("no such job"));

        let (code, _, err) = run(cmd_fg, &mut shell, &["fg"]);
        assert_eq!(code, 1);
        assert!(err.contains("usage"));
    }

    #[test]
    fn wait_reaps_a_real_child() {
        let mut shell = Shell::new(ShellOptions::default(), false);
        let child = match unsafe { nix::unistd::fork() }.unwrap() {
            nix::unistd::ForkResult::Child => std::process::exit(9),
            nix::unistd::ForkResult::Parent { child } => child,
        };
        let (code, _, _) = run(cmd_wait, &mut shell, &["wait", &child.to_string()]);
        assert_eq!(code, 9);
    }

    #[test]
    fn wait_on_a_stranger_fails() {
        let mut shell = Shell::new(ShellOptions::default(), false);
        let (code, _, err) = run(cmd_wait, &mut shell, &["wait", "1"]);
        assert_eq!(code, 1);
        assert!(err.contains("not a child"));
    }

    #[test]
    fn kill_rejects_garbage() {
        let mut shell = Shell::new(ShellOptions::default(), false);
        let (code, _, err) = run(cmd_kill, &mut shell, &["kill", "banana"]);
        assert_eq!(code, 1);
        assert!(err.contains("invalid target"));
    }
}
