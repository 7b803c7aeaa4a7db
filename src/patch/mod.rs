// Offset-indexed patch tables.
//
// - `range`: half-open byte ranges
// - `op`:    Copy / Literal / EndianSwap operations and their step results
// - `table`: entries, gap filling, coverage checks, reverse derivation

pub mod op;
pub mod range;
pub mod table;

pub use op::{Completion, PatchOp, Step, WordSize};
pub use range::Range;
pub use table::{PatchEntry, PatchError, PatchTable};
