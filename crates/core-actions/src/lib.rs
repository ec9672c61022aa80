//! Turns key input into buffer/view mutations: the Normal/Visual-mode
//! command composer (`dispatcher`, built on `core-keymap`'s trie), direct
//! Insert-mode key handling (`insert`), operator span resolution and
//! yank/delete/paste (`operator`, `registers`), the `char`-motion-token to
//! `core_model::Motion` mapping (`motion_map`), and the colon-command line
//! (`command`).

pub mod command;
pub mod dispatcher;
pub mod insert;
pub mod motion_map;
pub mod operator;
pub mod registers;

pub use command::{CommandOutcome, QuitScope};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use registers::{RegisterContent, Registers};
