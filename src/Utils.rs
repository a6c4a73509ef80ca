//! # Utils Module
//!
//! ## Purpose
//! Small pieces shared by the driver and the command line:
//! - `logger`: simplelog setup (terminal plus optional log file) from a verbosity level
//! - `file_set`: writes a group of output files all together or not at all
pub mod file_set;
pub mod logger;

pub use file_set::FileSet;
pub use logger::init_logger;
