pub mod appointment;
pub mod enums;

pub use appointment::*;
pub use enums::*;
