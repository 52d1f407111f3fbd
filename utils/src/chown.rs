//! `chown` — change file ownership.

use std::io::Write;
use std::path::Path;

use nix::unistd::{Gid, Group, Uid, User};

use crate::args::{print_usage, wants_help};
use crate::{Io, UtilError, UtilResult, report};

fn usage(io: &mut Io) -> i32 {
    print_usage(io, "chown <owner[:group]> <path...>", &[])
}

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    if wants_help(argv) {
        return usage(io);
    }

    let operands = &argv[1..];
    if operands.len() < 2 {
        let code = report(io, "chown", &UtilError::MissingOperand);
        usage(io);
        return code;
    }

    let spec = &operands[0];
    let (owner, group) = match resolve_spec(spec) {
        Ok(resolved) => resolved,
        Err(err) => return report(io, "chown", &err),
    };

    let mut status = 0;
    for path in &operands[1..] {
        match nix::unistd::chown(Path::new(path), owner, group) {
            Ok(()) => {
                let _ = writeln!(io.stdout, "Changed ownership of '{path}' to '{spec}'");
            }
            Err(errno) => {
                status = report(io, "chown", &errno.into());
            }
        }
    }
    status
}

/// Split `owner[:group]` and resolve both halves against the passwd and
/// group databases; numeric ids pass straight through.
fn resolve_spec(spec: &str) -> UtilResult<(Option<Uid>, Option<Gid>)> {
    let (owner, group) = split_spec(spec);
    if owner.is_none() && group.is_none() {
        return Err(UtilError::MissingOperand);
    }
    let uid = owner.map(|name| resolve_user(name)).transpose()?;
    let gid = group.map(|name| resolve_group(name)).transpose()?;
    Ok((uid, gid))
}

fn split_spec(spec: &str) -> (Option<&str>, Option<&str>) {
    match spec.split_once(':') {
        Some((owner, group)) => (
            (!owner.is_empty()).then_some(owner),
            (!group.is_empty()).then_some(group),
        ),
        None => ((!spec.is_empty()).then_some(spec), None),
    }
}

fn resolve_user(name: &str) -> UtilResult<Uid> {
    if let Ok(raw) = name.parse::<u32>() {
        return Ok(Uid::from_raw(raw));
    }
    User::from_name(name)
        .map_err(UtilError::Sys)?
        .map(|user| user.uid)
        .ok_or_else(|| UtilError::UnknownUser(name.to_string()))
}

fn resolve_group(name: &str) -> UtilResult<Gid> {
    if let Ok(raw) = name.parse::<u32>() {
        return Ok(Gid::from_raw(raw));
    }
    Group::from_name(name)
        .map_err(UtilError::Sys)?
        .map(|group| group.gid)
        .ok_or_else(|| UtilError::UnknownGroup(name.to_string()))
}
