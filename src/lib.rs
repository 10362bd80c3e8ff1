pub mod config;
pub mod marker;
pub mod platform;
pub mod presenter;
pub mod screen;
pub mod sim;
