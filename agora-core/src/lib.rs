#[cfg(feature = "instrument")]
pub use tracerec;

mod agents;
mod catalog;
mod desires;
mod errors;
mod external;
mod market;
mod production;
mod turn;
mod types;
mod world;

pub use agents::*;
pub use catalog::*;
pub use desires::*;
pub use errors::*;
pub use external::*;
pub use market::*;
pub use production::*;
pub use turn::*;
pub use types::*;
pub use world::*;
