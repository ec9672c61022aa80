//! Concrete highlight language for C-like source, grounded in the keyword
//! tables and state functions of the reference editor's C highlighter.

use crate::{HiClass, Language, StackedState, StateCtx};

const STATE_STRING: u8 = 1;
const STATE_COMMENT: u8 = 2;
const STATE_MULTI_COMMENT: u8 = 3;

const TYPES: &[&str] = &[
    "char", "double", "enum", "float", "int", "long", "short", "struct", "union", "void",
];

const TYPE_MODS: &[&str] = &[
    "auto", "const", "extern", "inline", "register", "restrict", "signed", "static", "typedef",
    "unsigned", "volatile",
];

const KEYWORDS: &[&str] = &[
    "break", "case", "continue", "default", "do", "else", "for", "goto", "if", "return",
    "sizeof", "switch", "while",
];

fn bin_search(table: &[&str], word: &[u8]) -> bool {
    table.iter().any(|k| k.as_bytes() == word)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Classifies a scanned identifier the way the reference table walk does: a
/// straight hit in one of the three keyword tables, or a `_t` suffix treated
/// as a type alias convention.
fn classify_identifier(word: &[u8]) -> HiClass {
    if bin_search(TYPES, word) {
        HiClass::Type
    } else if bin_search(TYPE_MODS, word) {
        HiClass::TypeMod
    } else if bin_search(KEYWORDS, word) {
        HiClass::Keyword
    } else if word.ends_with(b"_t") {
        HiClass::Type
    } else {
        HiClass::Identifier
    }
}

fn get_identifier(s: &[u8], i: usize, n: usize) -> usize {
    let mut j = i + 1;
    while j < n && is_ident_cont(s[j]) {
        j += 1;
    }
    j - i
}

fn get_number(s: &[u8], i: usize, n: usize) -> usize {
    let mut j = i;
    while j < n && (s[j].is_ascii_hexdigit() || s[j] == b'x' || s[j] == b'X' || s[j] == b'.') {
        j += 1;
    }
    (j - i).max(1)
}

/// Length of an escape sequence starting at the backslash, per the
/// reference's hex/unicode escape-length table: `\xNN`, `\uNNNN`, `\UNNNNNNNN`,
/// or a single-byte escape.
fn read_escapist(s: &[u8], i: usize, n: usize) -> usize {
    if i >= n || s[i] != b'\\' {
        return 0;
    }
    if i + 1 >= n {
        return 1;
    }
    let digits = match s[i + 1] {
        b'x' => 2,
        b'u' => 4,
        b'U' => 8,
        _ => 0,
    };
    if digits == 0 {
        return 2;
    }
    let mut j = i + 2;
    let end = (i + 2 + digits).min(n);
    while j < end && s[j].is_ascii_hexdigit() {
        j += 1;
    }
    j - i
}

fn get_char_literal(s: &[u8], i: usize, n: usize) -> usize {
    debug_assert_eq!(s[i], b'\'');
    let mut j = i + 1;
    if j < n && s[j] == b'\\' {
        j += read_escapist(s, j, n).max(1);
    } else if j < n {
        j += 1;
    }
    if j < n && s[j] == b'\'' {
        j += 1;
    }
    j - i
}

/// Language instance with no per-buffer state of its own; all state lives in
/// the [`StackedState`] the driver threads between dispatch calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct CLanguage;

impl CLanguage {
    fn state_start(&self, ctx: &StateCtx) -> (usize, HiClass, StackedState) {
        let s = ctx.s;
        let i = ctx.i;
        let n = ctx.n;
        let b = s[i];

        if is_ident_start(b) {
            let len = get_identifier(s, i, n);
            let class = classify_identifier(&s[i..i + len]);
            return (len, class, StackedState::default());
        }
        if b.is_ascii_digit() {
            let len = get_number(s, i, n);
            return (len, HiClass::Number, StackedState::default());
        }
        if b == b'\'' {
            let len = get_char_literal(s, i, n);
            return (len, HiClass::Char, StackedState::default());
        }
        if b == b'"' {
            return (1, HiClass::String, StackedState::default().set(STATE_STRING));
        }
        if b == b'/' && i + 1 < n && s[i + 1] == b'/' {
            return (2, HiClass::Comment, StackedState::default().set(STATE_COMMENT));
        }
        if b == b'/' && i + 1 < n && s[i + 1] == b'*' {
            return (2, HiClass::Comment, StackedState::default().set(STATE_MULTI_COMMENT));
        }
        (1, HiClass::Normal, StackedState::default())
    }

    fn state_string(&self, ctx: &StateCtx) -> (usize, HiClass, StackedState) {
        let s = ctx.s;
        let i = ctx.i;
        let n = ctx.n;

        if s[i] == b'\\' {
            if i + 1 >= n {
                // trailing backslash: the string continues onto the next line.
                return (1, HiClass::String, StackedState::default().set(STATE_STRING));
            }
            let len = read_escapist(s, i, n).max(1);
            return (len, HiClass::String, StackedState::default().set(STATE_STRING));
        }
        if s[i] == b'"' {
            return (1, HiClass::String, StackedState::default());
        }
        (1, HiClass::String, StackedState::default().set(STATE_STRING))
    }

    fn state_comment(&self, ctx: &StateCtx) -> (usize, HiClass, StackedState) {
        let s = ctx.s;
        let i = ctx.i;
        let n = ctx.n;
        let rest = n - i;
        if i == n - 1 && s[i] == b'\\' {
            return (1, HiClass::Comment, StackedState::default().set(STATE_COMMENT));
        }
        (rest, HiClass::Comment, StackedState::default())
    }

    fn state_multi_comment(&self, ctx: &StateCtx) -> (usize, HiClass, StackedState) {
        let s = ctx.s;
        let i = ctx.i;
        let n = ctx.n;

        if s[i] == b'*' && i + 1 < n && s[i + 1] == b'/' {
            return (2, HiClass::Comment, StackedState::default());
        }
        if s[i] == b'@' {
            let len = if is_ident_start(s.get(i + 1).copied().unwrap_or(0)) {
                1 + get_identifier(s, i + 1, n)
            } else {
                1
            };
            return (len, HiClass::Javadoc, StackedState::default().set(STATE_MULTI_COMMENT));
        }
        (1, HiClass::Comment, StackedState::default().set(STATE_MULTI_COMMENT))
    }
}

impl Language for CLanguage {
    fn dispatch(&self, state: StackedState, ctx: &StateCtx) -> (usize, HiClass, StackedState) {
        match state.current() {
            STATE_STRING => self.state_string(ctx),
            STATE_COMMENT => self.state_comment(ctx),
            STATE_MULTI_COMMENT => self.state_multi_comment(ctx),
            _ => self.state_start(ctx),
        }
    }

    fn is_open_paren(&self, b: u8) -> bool {
        matches!(b, b'(' | b'{' | b'[')
    }

    fn is_close_paren(&self, b: u8) -> bool {
        matches!(b, b')' | b'}' | b']')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_keyword_type_and_identifier() {
        assert_eq!(classify_identifier(b"int"), HiClass::Type);
        assert_eq!(classify_identifier(b"const"), HiClass::TypeMod);
        assert_eq!(classify_identifier(b"while"), HiClass::Keyword);
        assert_eq!(classify_identifier(b"size_t"), HiClass::Type);
        assert_eq!(classify_identifier(b"foo"), HiClass::Identifier);
    }

    #[test]
    fn char_literal_consumes_escape() {
        let s = br"'\n'";
        assert_eq!(get_char_literal(s, 0, s.len()), 4);
    }

    #[test]
    fn number_consumes_hex_literal() {
        let s = b"0x1F ";
        assert_eq!(get_number(s, 0, s.len()), 4);
    }
}
