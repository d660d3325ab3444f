pub mod data;
pub mod exchange;
