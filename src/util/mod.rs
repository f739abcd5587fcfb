pub mod env;
pub mod trace;
