//! Pipeline stages.
//!
//! Each stage owns a handle to its collaborators and exposes one async entry
//! point. Stages never see each other; the coordinator passes data between
//! them.

pub mod charts;
pub mod content;
pub mod outline;
pub mod polish;

pub use charts::ChartStage;
pub use content::ContentStage;
pub use outline::OutlineStage;
pub use polish::PolishStage;
