//! Route handlers, grouped by resource.

pub mod appointments;
pub mod health;
pub mod pubsub;
pub mod reports;
pub mod results;
