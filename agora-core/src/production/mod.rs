// Production: per-firm greedy scheduling under a time budget, with
// friction on process switches and degraded output for omitted
// excludable inputs.

pub mod scheduler;
pub mod scoring;

pub use scheduler::*;
pub use scoring::*;
