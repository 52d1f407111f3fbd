//! `ls` — list directory contents.

use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use bitflags::bitflags;
use chrono::{Local, TimeZone};
use nix::unistd::{Gid, Group, Uid, User};

use crate::args::{print_usage, wants_help};
use crate::{Io, UtilError, UtilResult, report};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LsFlags: u8 {
        /// `-a`: include entries whose names start with a dot.
        const ALL = 1 << 0;
        /// `-l`: long format.
        const LONG = 1 << 1;
    }
}

fn usage(io: &mut Io) -> i32 {
    print_usage(
        io,
        "ls [Options] [path...]",
        &[
            "    -l             List in long format",
            "    -a             List all files, including hidden ones",
        ],
    )
}

fn parse_arguments(argv: &[String]) -> UtilResult<(LsFlags, Vec<String>)> {
    let mut flags = LsFlags::empty();
    let mut paths = Vec::new();
    for arg in &argv[1..] {
        match arg.as_str() {
            "-a" => flags |= LsFlags::ALL,
            "-l" => flags |= LsFlags::LONG,
            opt if opt.starts_with('-') && opt.len() > 1 => {
                return Err(UtilError::UnknownOption(opt.to_string()));
            }
            path => paths.push(path.to_string()),
        }
    }
    if paths.is_empty() {
        paths.push(".".to_string());
    }
    Ok((flags, paths))
}

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    run_with_default(argv, io, LsFlags::empty())
}

/// Entry point for the shell, which may force `-a` on (its own `-a`
/// startup flag).
pub fn run_with_default(argv: &[String], io: &mut Io, default: LsFlags) -> i32 {
    if wants_help(argv) {
        return usage(io);
    }
    let (flags, paths) = match parse_arguments(argv) {
        Ok(parsed) => parsed,
        Err(err) => return report(io, "ls", &err),
    };
    let flags = flags | default;

    let mut status = 0;
    let many = paths.len() > 1;
    for (idx, path) in paths.iter().enumerate() {
        if many {
            if idx > 0 {
                let _ = writeln!(io.stdout);
            }
            let _ = writeln!(io.stdout, "{path}:");
        }
        if let Err(err) = list_dir(Path::new(path), flags, io) {
            status = report(io, "ls", &err);
        }
    }
    status
}

fn list_dir(path: &Path, flags: LsFlags, io: &mut Io) -> UtilResult<()> {
    let entries = std::fs::read_dir(path).map_err(|e| UtilError::at(path.display().to_string(), e))?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| UtilError::at(path.display().to_string(), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !flags.contains(LsFlags::ALL) && name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();

    if !flags.contains(LsFlags::LONG) {
        for name in &names {
            let _ = write!(io.stdout, "{name}  ");
        }
        let _ = writeln!(io.stdout);
        return Ok(());
    }

    for name in &names {
        let full = path.join(name);
        let meta = match std::fs::symlink_metadata(&full) {
            Ok(m) => m,
            Err(err) => {
                let _ = writeln!(io.stderr, "ls: {}: {err}", full.display());
                continue;
            }
        };
        let line = long_entry(name, &meta);
        let _ = writeln!(io.stdout, "{line}");
    }
    Ok(())
}

fn long_entry(name: &str, meta: &std::fs::Metadata) -> String {
    let owner = User::from_uid(Uid::from_raw(meta.uid()))
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| meta.uid().to_string());
    let group = Group::from_gid(Gid::from_raw(meta.gid()))
        .ok()
        .flatten()
        .map(|g| g.name)
        .unwrap_or_else(|| meta.gid().to_string());
    let date = Local
        .timestamp_opt(meta.mtime(), 0)
        .single()
        .map(|t| t.format("%b %d %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string());

    format!(
        "{} {} {} {} {:5} {} {}",
        mode_string(meta.mode()),
        meta.nlink(),
        owner,
        group,
        meta.size(),
        date,
        name
    )
}

/// `drwxr-xr-x`-style rendering of a raw `st_mode`.
pub fn mode_string(mode: u32) -> String {
    let kind = match mode & libc::S_IFMT {
        libc::S_IFDIR => 'd',
        libc::S_IFLNK => 'l',
        libc::S_IFCHR => 'c',
        libc::S_IFBLK => 'b',
        libc::S_IFIFO => 'p',
        libc::S_IFSOCK => 's',
        _ => '-',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
