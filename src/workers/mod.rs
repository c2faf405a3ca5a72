pub mod job_expiry;
