pub mod align;
pub mod column;
pub mod executor;
pub mod scheduler;
