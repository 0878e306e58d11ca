// Adapters layer: concrete implementations of the domain ports.

pub mod command_runner;

pub use command_runner::CommandRunner;
