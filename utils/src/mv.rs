//! `mv` — move or rename.
//!
//! `rename` first; only a cross-device failure falls back to copy plus
//! delete.

use std::io::Write;
use std::path::Path;

use crate::args::{print_usage, wants_help};
use crate::cp::{self, CpFlags, CpOptions};
use crate::{Io, UtilError, report, rm};

fn usage(io: &mut Io) -> i32 {
    print_usage(io, "mv [Options] <old_path> <new_path>", &[])
}

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    if wants_help(argv) {
        return usage(io);
    }

    let operands: Vec<&String> = argv[1..].iter().filter(|a| !a.starts_with('-')).collect();
    if operands.len() < 2 {
        let code = report(io, "mv", &UtilError::MissingOperand);
        usage(io);
        return code;
    }
    let (src, dst) = (operands[0].as_str(), operands[1].as_str());

    match std::fs::rename(src, dst) {
        Ok(()) => {
            let _ = writeln!(io.stdout, "Moved '{src}' to '{dst}'");
            0
        }
        Err(err) if err.raw_os_error() == Some(libc::EXDEV) => {
            log::debug!("mv: rename {src} -> {dst} crossed devices, copying");
            match copy_then_delete(Path::new(src), Path::new(dst), io) {
                Ok(()) => {
                    let _ = writeln!(io.stdout, "Moved '{src}' to '{dst}'");
                    0
                }
                Err(err) => report(io, "mv", &err),
            }
        }
        Err(err) => report(io, "mv", &UtilError::at(src, err)),
    }
}

fn copy_then_delete(src: &Path, dst: &Path, io: &mut Io) -> Result<(), UtilError> {
    let options = CpOptions {
        flags: CpFlags::ALL,
        ..CpOptions::default()
    };
    cp::copy_any(src, dst, options, io)?;
    let meta = std::fs::metadata(src).map_err(|e| UtilError::at(src.display().to_string(), e))?;
    if meta.is_dir() {
        rm::remove_tree(src, rm::RmFlags::empty(), io)
    } else {
        std::fs::remove_file(src).map_err(|e| UtilError::at(src.display().to_string(), e))
    }
}
