// Application layer: batch jobs wired to storage and configuration.

pub mod commands;
pub mod pipelines;
