pub mod commands;
pub mod config;
pub mod forecast;
pub mod http;
pub mod manifest;
pub mod model;
pub mod runtime;
pub mod site;
pub mod weather;
