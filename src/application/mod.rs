pub mod builder;
pub mod capture;
pub mod dto;
pub mod errors;
pub mod ports;
pub mod retention;
pub mod use_cases;
