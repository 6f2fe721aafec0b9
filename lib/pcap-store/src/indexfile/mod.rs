//! Index-file writer and reader (C5/C6): the project-level header and its
//! tables.

pub mod reader;
pub mod writer;

pub use reader::IndexFileReader;
pub use writer::IndexFileWriter;
