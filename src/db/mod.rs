pub mod error;
pub mod models;
pub mod normalize;
pub mod pool;
pub mod repo;
