pub mod api;
pub mod chrome;
pub mod classifier;
pub mod config;
pub mod data_models;
pub mod driver;
pub mod finder;
pub mod links;
pub mod matcher;
pub mod mutation;
pub mod search;
