pub mod app;
pub mod config;
pub mod domain;
pub mod infra;
pub mod jobs;
