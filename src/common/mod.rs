//! Miscellaneous common structs used throughout the library.

mod id;
mod peer;
mod peer_distance_list;

pub use id::*;
pub use peer::*;
pub use peer_distance_list::*;
