pub mod brmh;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod http;
pub mod model;
pub mod shopify;
pub mod store;
pub mod webhook;
pub mod wizard;
