pub mod intensity;
pub mod snapshot;
