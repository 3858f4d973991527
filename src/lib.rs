pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod normalize;
pub mod relay;
pub mod services;
pub mod sources;
