//! Property-based tests for `Text`'s edit primitives.

use core_text::{Position, RawLine, Text};
use proptest::prelude::*;

fn single_line_text(s: &str) -> Text {
    Text::from_raw_lines(vec![RawLine::from_str(s)])
}

proptest! {
    // Inserting then deleting the same byte range restores the original line.
    #[test]
    fn insert_then_delete_is_identity(prefix in "[a-z]{0,10}", inserted in "[a-z]{0,10}", suffix in "[a-z]{0,10}") {
        let original = format!("{prefix}{suffix}");
        let mut text = single_line_text(&original);
        let pos = Position::new(0, prefix.len());
        let end = text.insert_range(pos, &[RawLine::from_str(&inserted)], 1);
        text.delete_range(pos, end);
        prop_assert_eq!(text.line(0).unwrap().as_str_lossy().into_owned(), original);
    }

    // repeat_text_block always produces `count` rows per input row, each
    // padded to the widest input row and tiled exactly `count` times.
    #[test]
    fn repeat_text_block_tiles_to_uniform_width(a in "[a-z]{1,5}", b in "[a-z]{1,5}", count in 1usize..5) {
        let src = vec![RawLine::from_str(&a), RawLine::from_str(&b)];
        let width = a.len().max(b.len());
        let out = Text::repeat_text_block(&src, count);
        prop_assert_eq!(out.len(), src.len());
        for row in &out {
            prop_assert_eq!(row.len(), width * count);
        }
    }
}
