//! `chmod` — change permission bits.
//!
//! Octal modes replace the permission bits outright; symbolic clauses
//! (`[ugoa...][+-=][rwx...]`, comma separated) edit the bits read back
//! from `stat`.

use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;

use crate::args::{print_usage, wants_help};
use crate::{Io, UtilError, UtilResult, report};

fn usage(io: &mut Io) -> i32 {
    print_usage(io, "chmod <mode> <path...>", &[])
}

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    if wants_help(argv) {
        return usage(io);
    }

    let operands = &argv[1..];
    if operands.len() < 2 {
        let code = report(io, "chmod", &UtilError::MissingOperand);
        usage(io);
        return code;
    }
    let spec = &operands[0];

    let mut status = 0;
    for path in &operands[1..] {
        let result = std::fs::metadata(path)
            .map_err(|e| UtilError::at(path, e))
            .and_then(|meta| {
                let current = meta.permissions().mode() & 0o7777;
                let next = apply_mode(spec, current)?;
                std::fs::set_permissions(path, Permissions::from_mode(next))
                    .map_err(|e| UtilError::at(path, e))
            });
        if let Err(err) = result {
            status = report(io, "chmod", &err);
        }
    }
    status
}

/// Compute the new permission bits for `spec` applied over `current`.
pub fn apply_mode(spec: &str, current: u32) -> UtilResult<u32> {
    if !spec.is_empty() && spec.chars().all(|c| ('0'..='7').contains(&c)) {
        if spec.len() > 4 {
            return Err(UtilError::InvalidMode(spec.to_string()));
        }
        return u32::from_str_radix(spec, 8)
            .map_err(|_| UtilError::InvalidMode(spec.to_string()));
    }

    let mut mode = current;
    for clause in spec.split(',') {
        mode = apply_clause(clause, mode)
            .ok_or_else(|| UtilError::InvalidMode(spec.to_string()))?;
    }
    Ok(mode)
}

fn apply_clause(clause: &str, current: u32) -> Option<u32> {
    let op_at = clause.find(['+', '-', '='])?;
    let (who, rest) = clause.split_at(op_at);
    let op = rest.chars().next()?;
    let perms = &rest[1..];

    let mut shifts: Vec<u32> = Vec::new();
    for c in who.chars() {
        match c {
            'u' => shifts.push(6),
            'g' => shifts.push(3),
            'o' => shifts.push(0),
            'a' => shifts.extend([6, 3, 0]),
            _ => return None,
        }
    }
    if shifts.is_empty() {
        shifts.extend([6, 3, 0]);
    }

    let mut bits = 0u32;
    for c in perms.chars() {
        bits |= match c {
            'r' => 0o4,
            'w' => 0o2,
            'x' => 0o1,
            _ => return None,
        };
    }

    let mut mode = current;
    for shift in shifts {
        match op {
            '+' => mode |= bits << shift,
            '-' => mode &= !(bits << shift),
            '=' => {
                mode &= !(0o7 << shift);
                mode |= bits << shift;
            }
            _ => return None,
        }
    }
    Some(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Capture, argv};

    #[test]
    fn octal_replaces_bits() {
        assert_eq!(apply_mode("644", 0o777).unwrap(), 0o644);
        assert_eq!(apply_mode("0755", 0o600).unwrap(), 0o755);
    }

    #[test]
    fn symbolic_add_remove_set() {
        assert_eq!(apply_mode("u+x", 0o644).unwrap(), 0o744);
        assert_eq!(apply_mode("go-r", 0o644).unwrap(), 0o600);
        assert_eq!(apply_mode("a=r", 0o777).unwrap(), 0o444);
        assert_eq!(apply_mode("+x", 0o644).unwrap(), 0o755);
        assert_eq!(apply_mode("u=rwx,go=rx", 0o000).unwrap(), 0o755);
    }

    #[test]
    fn garbage_modes_are_rejected()  {
        assert!(apply_mode("banana", 0o644).is_err());
        assert!(apply_mode("u~x", 0o644).is_err());
        assert!(apply_mode("u+q", 0o644).is_err());
        assert!(apply_mode("77777", 0o644).is_err());
    }

    #[test]
    fn applies_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "").unwrap();

        let mut cap = Capture::new(b"");
        let code = run(&argv(&["chmod", "600", path.to_str().unwrap()]), &mut cap.io());
        assert_eq!(code, 0);
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn missing_path_is_an_error() {
        let mut cap = Capture::new(b"");
        let code = run(&argv(&["chmod", "644", "/no/such/file"]), &mut cap.io());
        assert_eq!(code, 1);
    }

    #[test]
    fn too_few_arguments_prints_usage() {
        let mut cap = Capture::new(b"");
        let code = run(&argv(&["chmod", "644"]), &mut cap.io());
        assert_eq!(code, 1);
        assert!(cap.stdout_str().contains("Usage: chmod"));
    }
}
