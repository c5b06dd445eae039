// src/cli/handlers/mod.rs

// One module per command family. Handlers take an `Invocation` and the
// session and return data for the renderer.

pub mod cache;
pub mod commons;
pub mod graph;
pub mod navigation;
pub mod routing;
pub mod set;
pub mod show;
