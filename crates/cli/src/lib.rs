//! Command-line front end for the SerialAgent client crates.

pub mod cli;
