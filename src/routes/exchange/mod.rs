pub mod handler;
pub mod model;

pub use handler::exchange_balance;
