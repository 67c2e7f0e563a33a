pub mod controller;
pub mod error;
pub mod ports;
pub mod session;
