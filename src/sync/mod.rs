//! Pushing cached stations into a SensorThings server.

pub mod entities;
pub mod filter;
pub mod observations;
pub mod window;

pub use entities::synchronize;
pub use filter::PropertyFilter;
pub use observations::upload;
pub use window::ObservationWindow;
