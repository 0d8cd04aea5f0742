//! Command implementations for the tagwatch CLI

pub mod send;
pub mod serve;
pub mod simulate;
