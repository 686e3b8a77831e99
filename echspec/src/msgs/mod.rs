#[macro_use]
mod macros;

pub mod alert;
pub mod base;
pub mod ccs;
pub mod codec;
pub mod deframer;
pub mod ech;
pub mod enums;
pub mod handshake;
pub mod hsjoiner;
pub mod message;
