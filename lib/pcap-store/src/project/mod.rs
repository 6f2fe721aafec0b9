//! Project reader and writer (C7/C8): the orchestrators that drive a data
//! file and the project's index tables together into one coherent project.

pub mod reader;
pub mod writer;

pub use reader::ProjectReader;
pub use writer::{ProjectWriter, ProjectWriterConfig, ProjectWriterConfigBuilder};

#[cfg(test)]
mod tests;
