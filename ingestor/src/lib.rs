pub mod config;
pub mod db;
pub mod decode;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod mqtt;
pub mod rest;
