mod compat;
pub mod inflight;
pub mod mapping;
pub mod mediator;
pub mod policy;
pub mod repository;
