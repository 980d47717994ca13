pub mod app;
pub mod chain;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod identity;
pub mod images;
pub mod normalize;
pub mod output;
pub mod store;
pub mod view;
