//! Long-running tokio tasks behind the controller: the producer that fills
//! the frame queue and the playback scheduler that drains it.

pub mod playback;
pub mod producer;
