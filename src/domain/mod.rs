pub mod authorization;
pub mod entities;
pub mod errors;
pub mod tracking;
pub mod value_objects;
