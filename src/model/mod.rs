pub mod advertisement;
pub mod context;
