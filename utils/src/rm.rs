//! `rm` — remove files, and with `-r` whole directory trees.

use std::io::Write;
use std::path::Path;

use bitflags::bitflags;

use crate::args::{print_usage, wants_help};
use crate::{Io, UtilError, UtilResult, report};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RmFlags: u8 {
        /// `-r`: remove directories and their contents, depth first.
        const RECURSIVE = 1 << 0;
        /// `-v`: narrate each removal.
        const VERBOSE = 1 << 1;
        /// `-f`: ignore missing operands and removal errors.
        const FORCE = 1 << 2;
    }
}

fn usage(io: &mut Io) -> i32 {
    print_usage(
        io,
        "rm [Options] <path...>",
        &[
            "    -r             Remove directories and their contents recursively",
            "    -v             Enable verbose mode",
            "    -f             Ignore nonexistent files and arguments, never prompt",
        ],
    )
}

fn parse_arguments(argv: &[String]) -> UtilResult<(RmFlags, Vec<String>)> {
    let mut flags = RmFlags::empty();
    let mut operands = Vec::new();
    for arg in &argv[1..] {
        if let Some(cluster) = arg.strip_prefix('-')
            && !cluster.is_empty()
        {
            for c in cluster.chars() {
                match c {
                    'r' => flags |= RmFlags::RECURSIVE,
                    'v' => flags |= RmFlags::VERBOSE,
                    'f' => flags |= RmFlags::FORCE,
                    _ => return Err(UtilError::UnknownOption(arg.clone())),
                }
            }
        } else {
            operands.push(arg.clone());
        }
    }
    Ok((flags, operands))
}

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    if wants_help(argv) {
        return usage(io);
    }
    let (flags, operands) = match parse_arguments(argv) {
        Ok(parsed) => parsed,
        Err(err) => return report(io, "rm", &err),
    };
    if operands.is_empty() {
        if flags.contains(RmFlags::FORCE) {
            return 0;
        }
        let code = report(io, "rm", &UtilError::MissingOperand);
        usage(io);
        return code;
    }

    let mut status = 0;
    for operand in &operands {
        let path = Path::new(operand);
        let meta = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(err) => {
                if !flags.contains(RmFlags::FORCE) {
                    status = report(io, "rm", &UtilError::at(operand, err));
                }
                continue;
            }
        };

        let result = if meta.is_dir() {
            if flags.contains(RmFlags::RECURSIVE) {
                remove_tree(path, flags, io)
            } else {
                Err(UtilError::IsDirectory(operand.clone()))
            }
        } else {
            remove_file(path, flags, io)
        };

        if let Err(err) = result
            && !flags.contains(RmFlags::FORCE)
        {
            status = report(io, "rm", &err);
        }
    }
    status
}

fn remove_file(path: &Path, flags: RmFlags, io: &mut Io) -> UtilResult<()> {
    std::fs::remove_file(path).map_err(|e| UtilError::at(path.display().to_string(), e))?;
    if flags.contains(RmFlags::VERBOSE) {
        let _ = writeln!(io.stdout, "Removed file '{}'", path.display());
    }
    Ok(())
}

/// Depth-first removal of a directory tree.
pub fn remove_tree(path: &Path, flags: RmFlags, io: &mut Io) -> UtilResult<()> {
    let entries =
        std::fs::read_dir(path).map_err(|e| UtilError::at(path.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| UtilError::at(path.display().to_string(), e))?;
        let child = entry.path();
        let meta = std::fs::symlink_metadata(&child)
            .map_err(|e| UtilError::at(child.display().to_string(), e))?;
        if meta.is_dir() {
            remove_tree(&child, flags, io)?;
        } else {
            remove_file(&child, flags, io)?;
        }
    }

    std::fs::remove_dir(path).map_err(|e| UtilError::at(path.display().to_string(), e))?;
    if flags.contains(RmFlags::VERBOSE) {
        let _ = writeln!(io.stdout, "Removed directory '{}'", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Capture, argv};

    #[test]
    fn removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();

        let mut cap = Capture::new(b"");
        let code = run(
            &argv(&["rm", a.to_str().unwrap(), b.to_str().unwrap()]),
            &mut cap.io(),
        );
        assert_eq!(code, 0);
        assert!(!a.exists() && !b.exists());
    }

    #[test]
    fn directory_without_r_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let mut cap = Capture::new(b"");
        let code = run(&argv(&["rm", sub.to_str().unwrap()]), &mut cap.io());
        assert_eq!(code, 1);
        assert!(sub.exists());
        assert!(cap.stderr_str().contains("is a directory"));
    }

    #[test]
    fn recursive_removal_takes_the_whole_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tree");
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("a/file"), "x").unwrap();
        std::fs::write(root.join("a/b/deep"), "y").unwrap();

        let mut cap = Capture::new(b"");
        let code = run(&argv(&["rm", "-r", root.to_str().unwrap()]), &mut cap.io());
        assert_eq!(code, 0);
        assert!(!root.exists());
    }

    #[test]
    fn clustered_flags_parse() {
        let (flags, operands) = parse_arguments(&argv(&["rm", "-rf", "x"])).unwrap();
        assert!(flags.contains(RmFlags::RECURSIVE | RmFlags::FORCE));
        assert_eq!(operands, ["x"]);
    }

    #[test]
    fn force_swallows_missing_operands() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let mut cap = Capture::new(b"");
        let code = run(&argv(&["rm", "-f", missing.to_str().unwrap()]), &mut cap.io());
        assert_eq!(code, 0);
        assert!(cap.stderr_str().is_empty());

        let mut cap = Capture::new(b"");
        let code = run(&argv(&["rm", missing.to_str().unwrap()]), &mut cap.io());
        assert_eq!(code, 1);
    }

    #[test]
    fn verbose_narrates() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, "").unwrap();

        let mut cap = Capture::new(b"");
        run(&argv(&["rm", "-v", a.to_str().unwrap()]), &mut cap.io());
        assert!(cap.stdout_str().contains("Removed file"));
    }
}
