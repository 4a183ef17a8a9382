pub mod coordinate;
pub mod error;
pub mod path;
pub mod session;
pub mod wire;
