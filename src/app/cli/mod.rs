//! Command line interface

pub mod args;
pub mod commands;
pub mod display;
pub mod error;

#[cfg(test)]
mod tests;
