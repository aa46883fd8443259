pub mod catalog;
pub mod health;
pub mod reports;
pub mod stocks;
