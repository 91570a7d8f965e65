pub mod evaluation;
pub mod job;
