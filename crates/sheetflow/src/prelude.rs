//! Prelude module - common imports for sheetflow users
//!
//! ```rust
//! use sheetflow::prelude::*;
//! ```

pub use crate::{
    // Batch execution
    read_many,
    run_read_batch,
    run_write_batch,
    write_many,
    BatchOptions,
    BatchReport,
    // Backends
    FileFormat,
    FileReader,
    FileWriter,
    MemoryWorkbook,
    ReadBackend,
    WriteBackend,
    // Jobs
    ReadJob,
    SheetReads,
    SheetSelector,
    SheetWrites,
    WriteJob,
    // Range model
    LogicalType,
    Payload,
    Position,
    RangeSpec,
    Shape,
    Value,
    // Error types
    Error,
    ErrorKind,
    Result,
};
