pub mod clusters;
pub mod deployments;
pub mod scheduling;

// Re-export handler functions
pub use clusters::*;
pub use deployments::*;
pub use scheduling::*;
