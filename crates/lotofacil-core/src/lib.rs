//! Domain primitives for 15-of-25 number selections.
//!
//! - [`NumberSet`] - a subset of the 25-number universe stored as a bitmask
//! - [`Draw`] - a recorded historical outcome
//! - [`DrawHistory`] - the append-only ordered draw store
//! - [`Candidate`] - a proposed selection produced by the optimizer
//!
//! Every [`Draw`] and [`Candidate`] holds exactly [`PICK_SIZE`] distinct
//! numbers from `1..=25`. Constructors validate this and report
//! [`InvalidEntityError`] otherwise.

pub use self::{candidate::*, draw::*, history::*, number_set::*};

pub mod candidate;
pub mod draw;
pub mod history;
pub mod number_set;

/// Reason a number collection is not a valid 15-of-25 selection.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InvalidEntityError {
    #[display("number {number} is outside 1..=25")]
    OutOfRange { number: u32 },
    #[display("number {number} appears more than once")]
    Duplicate { number: u8 },
    #[display("expected exactly 15 distinct numbers, got {count}")]
    WrongCount { count: usize },
}
