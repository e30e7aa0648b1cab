//! Delimited text point files, one point per line, with the columns described by a format string of
//! LAStools-style literals (e.g. `xyzirnc`)

mod format;
pub use self::format::*;

mod reader;
pub use self::reader::*;

mod writer;
pub use self::writer::*;
