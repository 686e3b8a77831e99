//! The client side: building ECH offers and driving a handshake far
//! enough to see how the server reacts to them.

pub mod ech;
pub mod hs;
