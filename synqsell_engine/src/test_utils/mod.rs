//! Helpers for tests: database setup, in-memory remote clients and fixture data.
pub mod fakes;
pub mod prepare_env;
pub mod seed;
