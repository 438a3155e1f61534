pub mod agent;
pub mod errors;
pub mod providers;
pub mod tools;
