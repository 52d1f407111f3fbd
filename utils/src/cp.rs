//! `cp` — copy a file or directory tree.
//!
//! Regular files go through `copy_file_range` in chunks, falling back to a
//! plain read/write loop when the kernel refuses (cross-device, old
//! kernels). The destination is created fresh; an existing file is an
//! error. Permission bits follow the source.

use std::fs::{File, OpenOptions, Permissions};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use bitflags::bitflags;
use nix::errno::Errno;

use crate::args::{print_usage, wants_help};
use crate::{Io, UtilError, UtilResult, report};

pub const DEFAULT_BUFFER: usize = 4096;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpFlags: u8 {
        /// `-v`: narrate each file and directory copied.
        const VERBOSE = 1 << 0;
        /// `-a`: include hidden entries when copying a directory.
        const ALL = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CpOptions {
    pub flags: CpFlags,
    pub buffer: usize,
}

impl Default for CpOptions {
    fn default() -> Self {
        CpOptions {
            flags: CpFlags::empty(),
            buffer: DEFAULT_BUFFER,
        }
    }
}

fn usage(io: &mut Io) -> i32 {
    print_usage(
        io,
        "cp [Options] <input_path> <output_path>",
        &[
            "    -v               Verbose, narrate each copy",
            "    -a               Allow copy of hidden files/folders",
            "    --buffer SIZE    Bytes per copy chunk (default 4096)",
        ],
    )
}

fn parse_arguments(argv: &[String]) -> UtilResult<(CpOptions, Vec<String>)> {
    let mut options = CpOptions::default();
    let mut operands = Vec::new();
    let mut iter = argv.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" => options.flags |= CpFlags::VERBOSE,
            "-a" => options.flags |= CpFlags::ALL,
            "--buffer" => {
                let size = iter.next().ok_or(UtilError::MissingOperand)?;
                options.buffer = size
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| UtilError::InvalidBufferSize(size.clone()))?;
            }
            opt if opt.starts_with('-') && opt.len() > 1 => {
                return Err(UtilError::UnknownOption(opt.to_string()));
            }
            operand => operands.push(operand.to_string()),
        }
    }
    Ok((options, operands))
}

pub fn run(argv: &[String], io: &mut Io) -> i32 {
    if wants_help(argv) {
        return usage(io);
    }
    let (options, operands) = match parse_arguments(argv) {
        Ok(parsed) => parsed,
        Err(err) => return report(io, "cp", &err),
    };
    if operands.len() < 2 {
        let code = report(io, "cp", &UtilError::MissingOperand);
        usage(io);
        return code;
    }

    match copy_any(Path::new(&operands[0]), Path::new(&operands[1]), options, io) {
        Ok(()) => 0,
        Err(err) => report(io, "cp", &err),
    }
}

/// Copy `src` to `dst`, file or directory.
pub fn copy_any(src: &Path, dst: &Path, options: CpOptions, io: &mut Io) -> UtilResult<()> {
    let meta = std::fs::metadata(src).map_err(|e| UtilError::at(src.display().to_string(), e))?;
    if meta.is_dir() {
        copy_dir(src, dst, options, io)
    } else {
        copy_file(src, dst, options, io)
    }
}

fn copy_file(src: &Path, dst: &Path, options: CpOptions, io: &mut Io) -> UtilResult<()> {
    if options.flags.contains(CpFlags::VERBOSE) {
        let _ = writeln!(io.stdout, "Copying file '{}' to '{}'", src.display(), dst.display());
    }

    let src_file = File::open(src).map_err(|e| UtilError::at(src.display().to_string(), e))?;
    let dst_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|e| UtilError::at(dst.display().to_string(), e))?;

    let mode = src_file
        .metadata()
        .map_err(|e| UtilError::at(src.display().to_string(), e))?
        .permissions()
        .mode();

    copy_contents(&src_file, &dst_file, options.buffer)?;

    std::fs::set_permissions(dst, Permissions::from_mode(mode))
        .map_err(|e| UtilError::at(dst.display().to_string(), e))?;
    Ok(())
}

/// Chunked `copy_file_range` loop; read/write fallback where the kernel
/// call does not apply to this pair of descriptors.
fn copy_contents(src: &File, dst: &File, buffer: usize) -> UtilResult<()> {
    loop {
        match nix::fcntl::copy_file_range(src, None, dst, None, buffer) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(Errno::EXDEV | Errno::EINVAL | Errno::ENOSYS) => {
                return copy_fallback(src, dst, buffer);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn copy_fallback(mut src: &File, mut dst: &File, buffer: usize) -> UtilResult<()> {
    let mut chunk = vec![0u8; buffer];
    loop {
        let n = src.read(&mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        dst.write_all(&chunk[..n])?;
    }
}

fn copy_dir(src: &Path, dst: &Path, options: CpOptions, io: &mut Io) -> UtilResult<()> {
    if options.flags.contains(CpFlags::VERBOSE) {
        let _ = writeln!(
            io.stdout,
            "Copying folder '{}' to '{}'",
            src.display(),
            dst.display()
        );
    }

    let meta = std::fs::metadata(src).map_err(|e| UtilError::at(src.display().to_string(), e))?;
    std::fs::create_dir(dst).map_err(|e| UtilError::at(dst.display().to_string(), e))?;
    std::fs::set_permissions(dst, meta.permissions())
        .map_err(|e| UtilError::at(dst.display().to_string(), e))?;

    let entries =
        std::fs::read_dir(src).map_err(|e| UtilError::at(src.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| UtilError::at(src.display().to_string(), e))?;
        let name = entry.file_name();
        if !options.flags.contains(CpFlags::ALL)
            && name.to_string_lossy().starts_with('.')
        {
            continue;
        }
        copy_any(&entry.path(), &dst.join(&name), options, io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Capture, argv};

    #[test]
    fn copies_file_contents_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, "payload").unwrap();
        std::fs::set_permissions(&src, Permissions::from_mode(0o640)).unwrap();

        let mut cap = Capture::new(b"");
        let code = run(
            &argv(&["cp", src.to_str().unwrap(), dst.to_str().unwrap()]),
            &mut cap.io(),
        );
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "payload");
        let mode = std::fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::write(&src, "new").unwrap();
        std::fs::write(&dst, "old").unwrap();

        let mut cap = Capture::new(b"");
        let code = run(
            &argv(&["cp", src.to_str().unwrap(), dst.to_str().unwrap()]),
            &mut cap.io(),
        );
        assert_eq!(code, 1);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "old");
    }

    #[test]
    fn recurses_and_skips_hidden_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("file"), "x").unwrap();
        std::fs::write(src.join(".secret"), "y").unwrap();
        std::fs::write(src.join("sub/inner"), "z").unwrap();
        let dst = dir.path().join("copy");

        let mut cap = Capture::new(b"");
        let code = run(
            &argv(&["cp", src.to_str().unwrap(), dst.to_str().unwrap()]),
            &mut cap.io(),
        );
        assert_eq!(code, 0);
        assert!(dst.join("file").exists());
        assert!(dst.join("sub/inner").exists());
        assert!(!dst.join(".secret").exists());
    }

    #[test]
    fn dash_a_copies_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join(".secret"), "y").unwrap();
        let dst = dir.path().join("copy");

        let mut cap = Capture::new(b"");
        let code = run(
            &argv(&["cp", "-a", src.to_str().unwrap(), dst.to_str().unwrap()]),
            &mut cap.io(),
        );
        assert_eq!(code, 0);
        assert!(dst.join(".secret").exists());
    }

    #[test]
    fn buffer_size_must_be_positive_number() {
        let mut cap = Capture::new(b"");
        let code = run(&argv(&["cp", "--buffer", "0", "a", "b"]), &mut cap.io());
        assert_eq!(code, 1);
        assert!(cap.stderr_str().contains("invalid buffer size"));

        let mut cap = Capture::new(b"");
        let code = run(&argv(&["cp", "--buffer", "12x", "a", "b"]), &mut cap.io());
        assert_eq!(code, 1);
    }

    #[test]
    fn tiny_buffer_still_copies_everything() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let payload: String = "abcdefgh".repeat(100);
        std::fs::write(&src, &payload).unwrap();

        let mut cap = Capture::new(b"");
        let code = run(
            &argv(&[
                "cp",
                "--buffer",
                "7",
                src.to_str().unwrap(),
                dst.to_str().unwrap(),
            ]),
            &mut cap.io(),
        );
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), payload);
    }
}
