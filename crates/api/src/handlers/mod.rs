pub mod generation_jobs;
pub mod points;
