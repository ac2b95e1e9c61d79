pub mod geo;
pub mod id;
