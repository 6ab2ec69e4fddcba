pub mod app;
pub mod config;
pub mod db;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod graph;
pub mod hgnc;
pub mod mapping;
pub mod materialize;
pub mod output;
pub mod parser;
pub mod registry;
pub mod source;
pub mod store;
