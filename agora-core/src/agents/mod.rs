pub mod firm;
pub mod inventory;
pub mod pop;

pub use firm::*;
pub use inventory::*;
pub use pop::*;
