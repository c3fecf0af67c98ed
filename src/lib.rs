pub mod cli;
pub mod configuration;
pub mod dao;
pub mod error;
pub mod futures_set;
pub mod handler;
pub mod helpers;
pub mod mapper;
pub mod migration;
pub mod model;
pub mod provider;
pub mod types;
