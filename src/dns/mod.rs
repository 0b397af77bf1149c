//! DNS wire format: a position-tracked byte buffer (`buffer`) and the message types
//! built on top of it (`protocol`). Scoped to exactly what the forwarder needs: header,
//! question section, and A records, with compressed names decoded on read.

pub mod buffer;
pub mod protocol;
