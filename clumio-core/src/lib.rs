//! Clumio Core
//!
//! Resource model, provider abstraction and the polling primitive shared by
//! the Clumio provider and its command line.

pub mod diagnostics;
pub mod lifecycle;
pub mod poll;
pub mod provider;
pub mod resource;
