//! Interactive session: prompt, line editor, dispatch.

use nix::unistd::{User, getuid};

use crate::editor::{self, Prompt};
use crate::state::Shell;

/// `user@CShell:cwd> `, user and cwd colored. The visible length drives
/// the editor's cursor math.
fn build_prompt() -> Prompt {
    let user = User::from_uid(getuid())
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| "no user".to_string());
    let cwd = std::env::current_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|_| "no directory".to_string());

    // "@CShell:" plus "> " around the two variable parts.
    let visible_len = user.chars().count() + cwd.chars().count() + 10;
    let rendered = format!(
        "\x1b[1;32m{user}\x1b[0m@\x1b[1;32mCShell\x1b[0m:\x1b[1;34m{cwd}\x1b[0m> "
    );
    Prompt {
        rendered,
        visible_len,
    }
}

pub fn run(shell: &mut Shell) -> i32 {
    loop {
        if !shell.jobs.is_empty() {
            let mut out = std::io::stdout().lock();
            shell.jobs.notify_completed(&mut out);
        }

        let prompt = build_prompt();
        match editor::read_line(&prompt, &mut shell.history) {
            Ok(Some(line)) => {
                if !line.trim().is_empty() {
                    shell.history.push(&line);
                }
                shell.run_input(&line);
                if let Some(code) = shell.exit {
                    return code;
                }
            }
            Ok(None) => break,
            Err(err) => {
                log::error!("terminal read failed: {err}");
                break;
            }
        }
    }
    shell.last_status
}
