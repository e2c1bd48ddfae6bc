// Markets: per-good price state, order bookkeeping, and the per-locality
// clearing pass.

pub mod clearing;
pub mod orders;
pub mod state;

pub use clearing::*;
pub use orders::*;
pub use state::*;
