pub mod errors;
pub mod ratelimit;
pub mod routes;
pub mod startup;

pub use startup::run;
