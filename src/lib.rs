// src/lib.rs

//! # netscope
//!
//! An interactive, hierarchical shell for exploring cloud network resources.
//! The user walks a tree of contexts (a VPC, then one of its route tables) and
//! issues queries whose scope follows the current position in that tree.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared interrupt flag. Set by the Ctrl-C listener, polled by long-running work.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod dev_utils;
pub mod models;
pub mod state;
pub mod system;
