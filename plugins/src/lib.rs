pub mod docker;
pub mod factory;
