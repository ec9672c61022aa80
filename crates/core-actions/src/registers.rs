//! Named registers for yank/delete/paste, keyed by the register letter after
//! `"` (§6 key surface: `v V <C-v> y d c`, `p P`). The unnamed register
//! (`"\""`) is updated by every yank/delete that doesn't target an explicit
//! register, matching Vim's convention.

use core_text::RawLine;
use std::collections::HashMap;

pub const UNNAMED: char = '"';

#[derive(Debug, Clone, Default)]
pub struct RegisterContent {
    pub lines: Vec<RawLine>,
    pub linewise: bool,
}

#[derive(Debug, Default)]
pub struct Registers {
    slots: HashMap<char, RegisterContent>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: Option<char>, content: RegisterContent) {
        self.slots.insert(UNNAMED, content.clone());
        if let Some(name) = name {
            self.slots.insert(name, content);
        }
    }

    pub fn get(&self, name: Option<char>) -> Option<&RegisterContent> {
        self.slots.get(&name.unwrap_or(UNNAMED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_write_also_updates_unnamed() {
        let mut regs = Registers::new();
        regs.set(
            Some('a'),
            RegisterContent {
                lines: vec![RawLine::from_str("x")],
                linewise: false,
            },
        );
        assert_eq!(regs.get(Some('a')).unwrap().lines, vec![RawLine::from_str("x")]);
        assert_eq!(regs.get(None).unwrap().lines, vec![RawLine::from_str("x")]);
    }
}
