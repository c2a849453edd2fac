// Imageopto admin service library

pub mod admin;
pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod handler;
pub mod logging;
pub mod server;
pub mod snippets;
pub mod vcl;
