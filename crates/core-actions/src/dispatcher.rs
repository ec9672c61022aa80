//! Top-level input dispatcher: bridges `core_events::KeyEvent` into the
//! `core-keymap` trie for Normal/Visual modes, handles Insert-mode keys
//! directly, and runs the command/search line editor.

use crate::command::{self, CommandOutcome, QuitScope};
use crate::insert;
use crate::motion_map::motion_for_char;
use crate::operator::{self, OperatorEffect};
use crate::registers::Registers;
use core_events::{KeyCode, KeyEvent, KeyModifiers};
use core_keymap::{
    compose_with_context, ctrl_char, baseline_normal_specs, ComposedAction, MappingOutput,
    MappingTrie, PendingContext, Resolution,
};
use core_model::{Frame, ViewState};
use core_state::{Buffer, EditorState, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Command,
    Search,
}

struct LineEditor {
    kind: LineKind,
    buf: String,
}

pub struct Dispatcher {
    keymap: MappingTrie,
    ctx: PendingContext,
    pending_chars: Vec<char>,
    registers: Registers,
    line_editor: Option<LineEditor>,
}

/// What the dispatcher wants its caller (the binary's event loop) to do
/// after processing one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub quit: Option<QuitScope>,
    pub status_message: Option<String>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            keymap: MappingTrie::build(baseline_normal_specs()),
            ctx: PendingContext::default(),
            pending_chars: Vec::new(),
            registers: Registers::new(),
            line_editor: None,
        }
    }

    /// The unnamed register's text, concatenated with newlines. Read by the
    /// binary's clipboard-owner thread after every key so the OS selection
    /// mirrors the last yank/delete, regardless of which named register (if
    /// any) also received it.
    pub fn unnamed_register_text(&self) -> String {
        self.registers
            .get(None)
            .map(|content| {
                content
                    .lines
                    .iter()
                    .map(|l| String::from_utf8_lossy(&l.0).into_owned())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }

    pub fn handle_key(&mut self, state: &mut EditorState, view: &mut ViewState, ev: KeyEvent) -> DispatchOutcome {
        if self.line_editor.is_some() {
            return self.handle_line_editor_key(state, view, ev);
        }
        match state.mode {
            Mode::Insert => {
                self.handle_insert_key(state, view, ev);
                DispatchOutcome::default()
            }
            _ => self.handle_normal_or_visual_key(state, view, ev),
        }
    }

    fn handle_insert_key(&mut self, state: &mut EditorState, view: &mut ViewState, ev: KeyEvent) {
        let (frame, buf) = active(view, state);
        match ev.code {
            KeyCode::Char(c) => insert::insert_char(frame, buf, c),
            KeyCode::Enter => insert::insert_newline(frame, buf, true),
            KeyCode::Backspace => insert::backspace(frame, buf),
            KeyCode::Tab => insert::insert_char(frame, buf, '\t'),
            KeyCode::Esc => {
                core_model::clip_to_mode(frame, buf, Mode::Normal);
                state.mode = Mode::Normal;
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down => {
                let motion = match ev.code {
                    KeyCode::Left => core_model::Motion::Left,
                    KeyCode::Right => core_model::Motion::Right,
                    KeyCode::Up => core_model::Motion::Up,
                    KeyCode::Down => core_model::Motion::Down,
                    _ => unreachable!(),
                };
                let page_height = frame.rect.height as usize;
                core_model::apply_motion(frame, buf, Mode::Insert, motion, 1, page_height);
            }
        }
    }

    fn handle_normal_or_visual_key(&mut self, state: &mut EditorState, view: &mut ViewState, ev: KeyEvent) -> DispatchOutcome {
        if ev.code == KeyCode::Esc {
            self.ctx.reset_transient();
            self.pending_chars.clear();
            if matches!(state.mode, Mode::Visual | Mode::VisualLine | Mode::VisualBlock) {
                view.frames.active_mut().exit_visual();
                state.mode = Mode::Normal;
            }
            return DispatchOutcome::default();
        }
        let Some(ch) = key_to_char(ev) else {
            return DispatchOutcome::default();
        };
        self.pending_chars.push(ch);
        let mut outcome = DispatchOutcome::default();
        loop {
            if self.pending_chars.is_empty() {
                break;
            }
            match self.keymap.resolve(&self.pending_chars) {
                Resolution::Matched { consumed, output, ambiguous } => {
                    if ambiguous {
                        break;
                    }
                    let out_tok = self.maybe_register_name(output);
                    let composed = compose_with_context(&mut self.ctx, &out_tok);
                    self.pending_chars.drain(0..consumed);
                    if let Some(quit) = self.apply_composed(composed, state, view) {
                        outcome.quit = Some(quit);
                    }
                }
                Resolution::NeedMore => break,
                Resolution::FallbackLiteral(c) => {
                    let out_tok = self.maybe_register_name(MappingOutput::Literal(c));
                    let composed = compose_with_context(&mut self.ctx, &out_tok);
                    self.pending_chars.remove(0);
                    if let Some(quit) = self.apply_composed(composed, state, view) {
                        outcome.quit = Some(quit);
                    }
                }
            }
        }
        outcome
    }

    fn maybe_register_name(&self, output: MappingOutput) -> MappingOutput {
        if self.ctx.awaiting_register {
            if let MappingOutput::Literal(c) = output {
                if c.is_ascii_alphanumeric() {
                    return MappingOutput::RegisterName(c);
                }
            }
        }
        output
    }

    fn apply_composed(&mut self, action: ComposedAction, state: &mut EditorState, view: &mut ViewState) -> Option<QuitScope> {
        match action {
            ComposedAction::None => {}
            ComposedAction::Motion { motion, count } => {
                if let Some(m) = motion_for_char(motion) {
                    view.apply_motion(state, state.mode, m, count as usize);
                }
            }
            ComposedAction::ApplyOperator { op, motion, count, register } => {
                let mode = state.mode;
                let (frame, buf) = active(view, state);
                let effect = operator::apply_operator_motion(op, motion, count as usize, register, frame, buf, mode, &mut self.registers);
                if matches!(effect, OperatorEffect::EnterInsert) {
                    state.mode = Mode::Insert;
                }
            }
            ComposedAction::LinewiseOperator { op, count, register } => {
                let (frame, buf) = active(view, state);
                let effect = operator::apply_operator_lines(op, count.max(1) as usize, register, frame, buf, &mut self.registers);
                if matches!(effect, OperatorEffect::EnterInsert) {
                    state.mode = Mode::Insert;
                }
            }
            ComposedAction::PasteAfter { register } => {
                let (frame, buf) = active(view, state);
                operator::paste(register, 1, false, frame, buf, &self.registers);
            }
            ComposedAction::PasteBefore { register } => {
                let (frame, buf) = active(view, state);
                operator::paste(register, 1, true, frame, buf, &self.registers);
            }
            ComposedAction::EnterInsert => state.mode = Mode::Insert,
            ComposedAction::EnterInsertAppend => {
                let (frame, buf) = active(view, state);
                let line_len = buf.text.line(frame.cur.line).map(|l| l.len()).unwrap_or(0);
                frame.cur.col = (frame.cur.col + 1).min(line_len);
                frame.vct = frame.cur.col;
                state.mode = Mode::Insert;
            }
            ComposedAction::EnterInsertLineStart => {
                let (frame, buf) = active(view, state);
                frame.cur.col = buf.line_indent(frame.cur.line);
                frame.vct = frame.cur.col;
                state.mode = Mode::Insert;
            }
            ComposedAction::EnterInsertLineEnd => {
                let (frame, buf) = active(view, state);
                let line_len = buf.text.line(frame.cur.line).map(|l| l.len()).unwrap_or(0);
                frame.cur.col = line_len;
                frame.vct = frame.cur.col;
                state.mode = Mode::Insert;
            }
            ComposedAction::OpenBelow { count } => {
                let (frame, buf) = active(view, state);
                open_line(frame, buf, false, count.max(1) as usize);
                state.mode = Mode::Insert;
            }
            ComposedAction::OpenAbove { count } => {
                let (frame, buf) = active(view, state);
                open_line(frame, buf, true, count.max(1) as usize);
                state.mode = Mode::Insert;
            }
            ComposedAction::Undo => {
                let (frame, buf) = active(view, state);
                if let Some(pos) = buf.undo() {
                    frame.cur = pos;
                }
            }
            ComposedAction::Redo => {
                let (frame, buf) = active(view, state);
                if let Some(pos) = buf.redo() {
                    frame.cur = pos;
                }
            }
            ComposedAction::ModeToggleVisualChar => toggle_visual(state, view, Mode::Visual),
            ComposedAction::ModeToggleVisualLine => toggle_visual(state, view, Mode::VisualLine),
            ComposedAction::ModeToggleVisualBlock => toggle_visual(state, view, Mode::VisualBlock),
            ComposedAction::EnterCommandLine => {
                self.line_editor = Some(LineEditor { kind: LineKind::Command, buf: String::new() });
            }
            ComposedAction::EnterSearch => {
                self.line_editor = Some(LineEditor { kind: LineKind::Search, buf: String::new() });
            }
            ComposedAction::DeleteUnder => {
                let (frame, buf) = active(view, state);
                let from = frame.cur;
                let line_len = buf.text.line(from.line).map(|l| l.len()).unwrap_or(0);
                if from.col < line_len {
                    let to = core_text::Position::new(from.line, from.col + 1);
                    let removed = buf.delete_range(from, to, from, from, false);
                    self.registers.set(None, crate::registers::RegisterContent { lines: removed, linewise: false });
                }
            }
            ComposedAction::DeleteLeft => {
                let (frame, buf) = active(view, state);
                let to = frame.cur;
                if to.col > 0 {
                    let from = core_text::Position::new(to.line, to.col - 1);
                    let removed = buf.delete_range(from, to, to, from, false);
                    self.registers.set(None, crate::registers::RegisterContent { lines: removed, linewise: false });
                    frame.cur = from;
                }
            }
            ComposedAction::Literal(_) => {}
        }
        None
    }

    fn handle_line_editor_key(&mut self, state: &mut EditorState, view: &mut ViewState, ev: KeyEvent) -> DispatchOutcome {
        let Some(editor) = self.line_editor.as_mut() else {
            return DispatchOutcome::default();
        };
        match ev.code {
            KeyCode::Char(c) => {
                editor.buf.push(c);
                DispatchOutcome::default()
            }
            KeyCode::Backspace => {
                editor.buf.pop();
                DispatchOutcome::default()
            }
            KeyCode::Esc => {
                self.line_editor = None;
                DispatchOutcome::default()
            }
            KeyCode::Enter => {
                let editor = self.line_editor.take().unwrap();
                match editor.kind {
                    LineKind::Command => {
                        let cursor_line = view.frames.active().cur.line;
                        match command::execute(state, &editor.buf, cursor_line) {
                            CommandOutcome::Ran => DispatchOutcome::default(),
                            CommandOutcome::Quit(scope) => DispatchOutcome { quit: Some(scope), status_message: None },
                            CommandOutcome::Error(msg) => DispatchOutcome { quit: None, status_message: Some(msg) },
                        }
                    }
                    LineKind::Search => {
                        let (_, buf) = active(view, state);
                        match buf.search_regex(&editor.buf) {
                            Ok(()) => DispatchOutcome::default(),
                            Err(e) => DispatchOutcome { quit: None, status_message: Some(e.to_string()) },
                        }
                    }
                }
            }
            _ => DispatchOutcome::default(),
        }
    }
}

fn active<'a>(view: &'a mut ViewState, state: &'a mut EditorState) -> (&'a mut Frame, &'a mut Buffer) {
    let frame = view.frames.active_mut();
    let buf = state
        .buffers
        .get_mut(frame.buf_id)
        .expect("active frame always points at a live buffer");
    (frame, buf)
}

fn toggle_visual(state: &mut EditorState, view: &mut ViewState, visual_mode: Mode) {
    let frame = view.frames.active_mut();
    if state.mode == visual_mode {
        frame.exit_visual();
        state.mode = Mode::Normal;
    } else {
        if frame.anchor.is_none() {
            frame.enter_visual();
        }
        state.mode = visual_mode;
    }
}

/// `o`/`O`: opens a new line below/above the cursor, carrying the current
/// line's indent, with the line-break recorded as the transient half of the
/// insert-session undo pair (the typed text that follows joins onto it).
fn open_line(frame: &mut Frame, buf: &mut Buffer, above: bool, _count: usize) {
    let indent = buf.line_indent(frame.cur.line);
    let cursor_before = frame.cur;
    let split_at = if above {
        core_text::Position::new(frame.cur.line, 0)
    } else {
        let line_len = buf.text.line(frame.cur.line).map(|l| l.len()).unwrap_or(0);
        core_text::Position::new(frame.cur.line, line_len)
    };
    buf.break_line(split_at, cursor_before, true);
    let new_line = if above { frame.cur.line } else { frame.cur.line + 1 };
    frame.cur = core_text::Position::new(new_line, 0);
    if indent > 0 {
        let pad = core_text::RawLine::from_str(&" ".repeat(indent));
        let end = buf.insert_range(frame.cur, &[pad], 1, frame.cur, false);
        frame.cur = end;
    }
    frame.vct = frame.cur.col;
}

fn key_to_char(ev: KeyEvent) -> Option<char> {
    match ev.code {
        KeyCode::Char(c) => {
            if ev.mods.contains(KeyModifiers::CTRL) {
                Some(ctrl_char(c))
            } else {
                Some(c)
            }
        }
        KeyCode::Left => Some('h'),
        KeyCode::Right => Some('l'),
        KeyCode::Up => Some('k'),
        KeyCode::Down => Some('j'),
        KeyCode::Enter | KeyCode::Tab | KeyCode::Backspace | KeyCode::Esc => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::LayoutRegion;

    fn new_state_with(lines: &[&str]) -> (EditorState, ViewState) {
        let mut state = EditorState::new();
        let id = state.active_buffer.unwrap();
        let buf = state.buffers.get_mut(id).unwrap();
        let src: Vec<core_text::RawLine> = lines.iter().map(|s| core_text::RawLine::from_str(s)).collect();
        buf.insert_range(core_text::Position::origin(), &src, 1, core_text::Position::origin(), false);
        let view = ViewState::new(LayoutRegion::new(0, 0, 80, 24), &state);
        (state, view)
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent { code: KeyCode::Char(c), mods: KeyModifiers::empty() }
    }

    #[test]
    fn i_enters_insert_mode_and_types() {
        let (mut state, mut view) = new_state_with(&[""]);
        let mut d = Dispatcher::new();
        d.handle_key(&mut state, &mut view, key('i'));
        assert_eq!(state.mode, Mode::Insert);
        d.handle_key(&mut state, &mut view, key('h'));
        d.handle_key(&mut state, &mut view, key('i'));
        let buf = state.active_buffer().unwrap();
        assert_eq!(buf.text.line(0).unwrap().as_str_lossy(), "hi");
    }

    #[test]
    fn dw_deletes_through_next_word_boundary_approximation() {
        let (mut state, mut view) = new_state_with(&["abc def"]);
        let mut d = Dispatcher::new();
        d.handle_key(&mut state, &mut view, key('d'));
        d.handle_key(&mut state, &mut view, key('$'));
        let buf = state.active_buffer().unwrap();
        assert_eq!(buf.text.line(0).unwrap().as_str_lossy(), "");
    }

    #[test]
    fn colon_w_command_line_parses_without_panicking() {
        let (mut state, mut view) = new_state_with(&["x"]);
        let mut d = Dispatcher::new();
        d.handle_key(&mut state, &mut view, key(':'));
        for c in "qa".chars() {
            d.handle_key(&mut state, &mut view, key(c));
        }
        let outcome = d.handle_key(&mut state, &mut view, KeyEvent { code: KeyCode::Enter, mods: KeyModifiers::empty() });
        assert_eq!(outcome.quit, Some(QuitScope::All));
    }

    #[test]
    fn o_opens_indented_line_below_and_enters_insert() {
        let (mut state, mut view) = new_state_with(&["  abc"]);
        let mut d = Dispatcher::new();
        d.handle_key(&mut state, &mut view, key('o'));
        assert_eq!(state.mode, Mode::Insert);
        let buf = state.active_buffer().unwrap();
        assert_eq!(buf.text.line(1).unwrap().as_str_lossy(), "  ");
    }
}
