pub mod analysis;
pub mod clustering;
pub(crate) mod health;

pub use health::health_check;
