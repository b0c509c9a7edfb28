pub mod models;
pub mod password;

#[cfg(test)]
mod tests;

pub use models::*;
pub use password::*;
