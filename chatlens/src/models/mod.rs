mod analysis;
mod cluster;
mod message;

pub use analysis::*;
pub use cluster::*;
pub use message::*;
