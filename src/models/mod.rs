pub mod catalog;
pub mod health;
pub mod quote;
pub mod sizing;
