pub mod filter;
pub mod panic;
pub mod runner;
