// src/core/mod.rs

pub mod cache;
pub mod config_loader;
pub mod hierarchy;
pub mod navigator;
pub mod paths;
pub mod resolver;
pub mod routing;
pub mod validators;
