//! Background and stopped job bookkeeping.
//!
//! Every backgrounded pipeline (and every foreground one stopped with
//! Ctrl-Z) gets an entry: job id, process group, the pids still alive in
//! it, and the command text for display. The table is refreshed with
//! non-blocking waits before each prompt; that is where `Done` entries
//! are reported and dropped.

use std::io::Write;

use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

impl JobState {
    pub fn label(self) -> &'static str {
        match self {
            JobState::Running => "Running",
            JobState::Stopped => "Stopped",
            JobState::Done => "Done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: u32,
    pub pgid: Pid,
    /// Children not yet reaped.
    pub pids: Vec<Pid>,
    pub state: JobState,
    pub command: String,
}

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: u32,
}

impl JobTable {
    pub fn add(&mut self, pgid: Pid, pids: Vec<Pid>, state: JobState, command: &str) -> u32 {
        self.next_id += 1;
        let id = self.next_id;
        self.jobs.push(Job {
            id,
            pgid,
            pids,
            state,
            command: command.to_string(),
        });
        log::debug!("job [{id}] added, pgid {pgid}");
        id
    }

    pub fn get(&self, id: u32) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Take a job out of the table (for `fg`).
    pub fn remove(&mut self, id: u32) -> Option<Job> {
        let idx = self.jobs.iter().position(|j| j.id == id)?;
        Some(self.jobs.remove(idx))
    }

    pub fn mark_running(&mut self, id: u32) -> bool {
        match self.jobs.iter_mut().find(|j| j.id == id) {
            Some(job) => {
                job.state = JobState::Running;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Non-blocking reap of every tracked child; jobs whose children are
    /// all gone become `Done`.
    pub fn refresh(&mut self) {
        for job in &mut self.jobs {
            if job.state == JobState::Done {
                continue;
            }
            job.pids.retain(|pid| {
                match waitpid(*pid, Some(WaitPidFlag::WNOHANG)) {
                    Ok(WaitStatus::StillAlive) => true,
                    Ok(WaitStatus::Stopped(..)) => true,
                    // Exited, signaled, or no longer ours.
                    Ok(_) | Err(_) => false,
                }
            });
            if job.pids.is_empty() {
                job.state = JobState::Done;
            }
        }
    }

    /// Refresh, report finished jobs as `[id] Done  command`, drop them.
    pub fn notify_completed(&mut self, out: &mut dyn Write) {
        self.refresh();
        self.jobs.retain(|job| {
            if job.state == JobState::Done {
                let _ = writeln!(out, "[{}] Done  {}", job.id, job.command);
                false
            } else {
                true
            }
        });
    }
}

/// `%N` job references used by `fg`, `bg` and `kill`.
pub fn parse_job_ref(arg: &str) -> Option<u32> {
    arg.strip_prefix('%')?.parse().ok()
}
