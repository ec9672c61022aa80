//! Colon-command line: parses and executes the `:` command grammar against
//! `EditorState` (`:w`, `:q`, `:e`, buffer switching, `:syntax`, `:colo`,
//! and `:s/pattern/replacement/flags`).

use core_regex::Regex;
use core_state::{Buffer, EditorState};
use core_text::{Position, RawLine};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuitScope {
    /// `:q` — close the active buffer; quits the process if it was the last one.
    Active,
    /// `:qa` — close every buffer regardless of modified state.
    All,
    /// `:cq` — quit immediately with a nonzero exit status, bypassing the
    /// unsaved-changes check entirely.
    Force,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Ran,
    Quit(QuitScope),
    Error(String),
}

/// Splits a `:s/pattern/replacement/flags` command into its three fields.
/// The delimiter is always `/`; a literal `/` inside `pattern` or
/// `replacement` must be backslash-escaped.
fn split_substitution(rest: &str) -> Option<(String, String, String)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in rest.chars() {
        if escaped {
            if ch != '/' {
                current.push('\\');
            }
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '/' {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    parts.push(current);
    match parts.len() {
        2 => Some((parts[0].clone(), parts[1].clone(), String::new())),
        3 => Some((parts[0].clone(), parts[1].clone(), parts[2].clone())),
        _ => None,
    }
}

fn apply_substitution(buf: &mut Buffer, pattern: &str, replacement: &str, global: bool, whole_buffer: bool, current_line: usize) -> Result<usize, String> {
    let re = Regex::compile(pattern).map_err(|e| e.to_string())?;
    let mut matches = re.find_all(&buf.text);
    if !whole_buffer {
        matches.retain(|(from, _)| from.line == current_line);
    }
    if !global {
        // keep only the first match per line
        let mut seen = std::collections::HashSet::new();
        matches.retain(|(from, _)| seen.insert(from.line));
    }
    matches.sort_by_key(|(from, _)| *from);
    let count = matches.len();
    for (from, to) in matches.into_iter().rev() {
        let cursor_before = Position::new(from.line, from.col);
        buf.delete_range(from, to, cursor_before, from, true);
        buf.insert_range(from, &[RawLine::from_str(replacement)], 1, from, false);
    }
    Ok(count)
}

/// Executes `line` (without the leading `:`) against `state`, acting on the
/// active buffer/frame as needed. `cursor_line` is the frame's current line,
/// used to scope `:s` without a `%` range prefix to the current line only.
pub fn execute(state: &mut EditorState, line: &str, cursor_line: usize) -> CommandOutcome {
    let line = line.trim();
    if line.is_empty() {
        return CommandOutcome::Ran;
    }
    let whole_buffer = line.starts_with('%');
    let line = line.strip_prefix('%').unwrap_or(line);

    if let Some(rest) = line.strip_prefix("s/") {
        let Some((pattern, replacement, flags)) = split_substitution(rest) else {
            return CommandOutcome::Error("malformed substitution".into());
        };
        let Some(buf) = state.active_buffer_mut() else {
            return CommandOutcome::Error("no active buffer".into());
        };
        let global = flags.contains('g');
        return match apply_substitution(buf, &pattern, &replacement, global, whole_buffer, cursor_line) {
            Ok(_count) => CommandOutcome::Ran,
            Err(e) => CommandOutcome::Error(e),
        };
    }

    let mut words = line.split_whitespace();
    let Some(raw_cmd) = words.next() else {
        return CommandOutcome::Ran;
    };
    let arg = words.next();
    let force = raw_cmd.ends_with('!');
    let cmd = raw_cmd.trim_end_matches('!');

    match cmd {
        "w" | "write" => {
            let Some(buf) = state.active_buffer_mut() else {
                return CommandOutcome::Error("no active buffer".into());
            };
            if let Some(path) = arg {
                buf.path = Some(PathBuf::from(path));
            }
            match buf.write_file(force) {
                Ok(()) => {
                    tracing::trace!(target: "actions.command", op = "write", "write_ok");
                    CommandOutcome::Ran
                }
                Err(e) => {
                    tracing::warn!(target: "actions.command", op = "write", error = %e, "write_failed");
                    CommandOutcome::Error(e.to_string())
                }
            }
        }
        "wa" | "wall" => {
            for buf in state.buffers.iter_mut() {
                if buf.path.is_some() {
                    if let Err(e) = buf.write_file(force) {
                        return CommandOutcome::Error(e.to_string());
                    }
                }
            }
            CommandOutcome::Ran
        }
        "q" | "quit" => {
            let Some(buf) = state.active_buffer() else {
                return CommandOutcome::Quit(QuitScope::Active);
            };
            if buf.is_modified() && !force {
                tracing::warn!(target: "actions.command", op = "quit", "quit_refused_unsaved");
                CommandOutcome::Error("no write since last change (add ! to override)".into())
            } else {
                CommandOutcome::Quit(QuitScope::Active)
            }
        }
        "qa" | "qall" => CommandOutcome::Quit(QuitScope::All),
        "cq" => CommandOutcome::Quit(QuitScope::Force),
        "e" | "edit" => {
            let Some(path) = arg else {
                return CommandOutcome::Error("edit requires a path".into());
            };
            match state.open_file(std::path::Path::new(path)) {
                Ok(_) => CommandOutcome::Ran,
                Err(e) => CommandOutcome::Error(e.to_string()),
            }
        }
        "b" | "buffer" => {
            let Some(id) = arg.and_then(|a| a.parse::<usize>().ok()) else {
                return CommandOutcome::Error("buffer requires a numeric id".into());
            };
            if state.buffers.get(id).is_some() {
                state.active_buffer = Some(id);
                CommandOutcome::Ran
            } else {
                CommandOutcome::Error(format!("no buffer {id}"))
            }
        }
        "bn" | "bnext" => {
            cycle_buffer(state, 1);
            CommandOutcome::Ran
        }
        "bp" | "bprev" | "bprevious" => {
            cycle_buffer(state, -1);
            CommandOutcome::Ran
        }
        "syntax" => CommandOutcome::Ran,
        "colo" | "colorscheme" => CommandOutcome::Ran,
        _ => CommandOutcome::Error(format!("unknown command: {cmd}")),
    }
}

fn cycle_buffer(state: &mut EditorState, step: isize) {
    let ids: Vec<usize> = state.buffers.iter().map(|b| b.id).collect();
    if ids.is_empty() {
        return;
    }
    let current = state.active_buffer.unwrap_or(ids[0]);
    let idx = ids.iter().position(|&id| id == current).unwrap_or(0) as isize;
    let next = (idx + step).rem_euclid(ids.len() as isize) as usize;
    state.active_buffer = Some(ids[next]);
}
