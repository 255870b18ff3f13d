pub mod error;
pub mod models;
pub mod schema;
pub mod state;
pub mod utils;

#[cfg(test)]
#[path = "shared.test.rs"]
mod tests;
