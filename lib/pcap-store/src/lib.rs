//! Writer and reader for packet-capture projects.
//!
//! A project is a single index file (the `.pcap` project file, C5/C6) plus
//! a companion directory of rolling data files (C3/C4), named and located
//! by the path resolver (C2). [`project::ProjectWriter`] and
//! [`project::ProjectReader`] are the orchestrators most callers want;
//! `datafile` and `indexfile` expose the lower layers they're built from.

pub mod datafile;
pub mod indexfile;
pub mod path;
pub mod project;

pub use project::{ProjectReader, ProjectWriter, ProjectWriterConfig, ProjectWriterConfigBuilder};
