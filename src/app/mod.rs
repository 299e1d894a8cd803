//! Application module: the `hookwork` operator CLI

pub mod cli;
pub mod startup;
