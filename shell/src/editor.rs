//! Raw-mode line editor.
//!
//! The terminal goes raw (echo and canonical mode off) only while a line
//! is being read; a guard restores the saved attributes on every way out.
//! Keys handled: printable insert at the cursor, DEL, left/right arrows,
//! up/down history, Ctrl-C (discard line), Ctrl-D on an empty line (EOF).
//! The line is repainted in place with `\r ESC[K` and the cursor parked
//! with `ESC[<n>C`.

use std::io::{Read, Write};

use nix::sys::termios::{
    LocalFlags, SetArg, SpecialCharacterIndices, Termios, tcgetattr, tcsetattr,
};

use crate::history::History;

/// A rendered prompt: the escape-laden string that gets written, and how
/// many columns of it are actually visible.
pub struct Prompt {
    pub rendered: String,
    pub visible_len: usize,
}

struct RawMode {
    saved: Termios,
}

impl RawMode {
    fn enable() -> std::io::Result<Self> {
        let saved = tcgetattr(std::io::stdin()).map_err(std::io::Error::from)?;
        let mut raw = saved.clone();
        raw.local_flags
            .remove(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::ISIG);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        tcsetattr(std::io::stdin(), SetArg::TCSAFLUSH, &raw).map_err(std::io::Error::from)?;
        Ok(RawMode { saved })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = tcsetattr(std::io::stdin(), SetArg::TCSAFLUSH, &self.saved);
    }
}

/// Read one line interactively. `Ok(None)` is end of input (Ctrl-D on an
/// empty line, or stdin closing).
pub fn read_line(prompt: &Prompt, history: &mut History) -> std::io::Result<Option<String>> {
    let _raw = RawMode::enable()?;
    let mut stdin = std::io::stdin().lock();

    let mut line: Vec<char> = Vec::new();
    let mut cursor = 0usize;
    redraw(prompt, &line, cursor)?;

    loop {
        let Some(byte) = read_byte(&mut stdin)? else {
            print_newline()?;
            return Ok(None);
        };

        match byte {
            // Enter.
            b'\n' | b'\r' => {
                print_newline()?;
                history.reset_cursor();
                return Ok(Some(line.into_iter().collect()));
            }
            // Ctrl-D: EOF on an empty line only.
            0x04 => {
                if line.is_empty() {
                    print_newline()?;
                    return Ok(None);
                }
            }
            // Ctrl-C: drop the line, fresh prompt.
            0x03 => {
                let mut out = std::io::stdout().lock();
                out.write_all(b"^C\n")?;
                out.flush()?;
                line.clear();
                cursor = 0;
                history.reset_cursor();
            }
            // DEL: erase before the cursor.
            0x7f => {
                if cursor > 0 {
                    line.remove(cursor - 1);
                    cursor -= 1;
                }
            }
            // Escape sequences (arrows).
            0x1b => {
                let Some(b'[') = read_byte(&mut stdin)? else {
                    continue;
                };
                match read_byte(&mut stdin)? {
                    Some(b'D') => cursor = cursor.saturating_sub(1),
                    Some(b'C') => cursor = (cursor + 1).min(line.len()),
                    Some(b'A') => {
                        let current: String = line.iter().collect();
                        if let Some(entry) = history.navigate_up(&current) {
                            line = entry.chars().collect();
                            cursor = line.len();
                        }
                    }
                    Some(b'B') => {
                        if let Some(entry) = history.navigate_down() {
                            line = entry.chars().collect();
                            cursor = line.len();
                        }
                    }
                    _ => {}
                }
            }
            // Other control bytes: ignored.
            b if b < 0x20 => {}
            // Printable, possibly multibyte.
            b => {
                if let Some(c) = read_char(&mut stdin, b)? {
                    line.insert(cursor, c);
                    cursor += 1;
                }
            }
        }

        redraw(prompt, &line, cursor)?;
    }
}

fn read_byte(stdin: &mut std::io::StdinLock) -> std::io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match stdin.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Finish decoding a UTF-8 character whose first byte is `first`.
fn read_char(stdin: &mut std::io::StdinLock, first: u8) -> std::io::Result<Option<char>> {
    let extra = match first {
        0x00..=0x7f => 0,
        0xc0..=0xdf => 1,
        0xe0..=0xef => 2,
        0xf0..=0xf7 => 3,
        _ => return Ok(None),
    };
    let mut bytes = vec![first];
    for _ in 0..extra {
        match read_byte(stdin)? {
            Some(b) => bytes.push(b),
            None => return Ok(None),
        }
    }
    Ok(std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.chars().next()))
}

fn print_newline() -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(b"\n")?;
    out.flush()
}

fn redraw(prompt: &Prompt, line: &[char], cursor: usize) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "\r\x1b[K{}", prompt.rendered)?;
    let text: String = line.iter().collect();
    out.write_all(text.as_bytes())?;
    let column = prompt.visible_len + cursor;
    write!(out, "\r")?;
    if column > 0 {
        write!(out, "\x1b[{column}C")?;
    }
    out.flush()
}
