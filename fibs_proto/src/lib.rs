//! Wire-level handling for the FIBS client protocol (CLIP).
//!
//! [`LineFramer`] turns the raw byte stream into clean lines and login
//! prompts; [`ClipReader`] classifies each line into a typed, numbered
//! [`ClipEvent`]; [`decode_board`] unpacks the 52-field `board:` line into
//! a [`gammon_core::Position`].

mod framer;
pub use framer::*;

mod event;
pub use event::*;

mod board;
pub use board::*;

mod reader;
pub use reader::*;
