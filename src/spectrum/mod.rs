pub mod peak;
pub mod transform;
