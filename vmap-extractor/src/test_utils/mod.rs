//! Test utilities for the extraction pipeline
//!
//! The [`storage`] module provides in-memory storage and provider
//! implementations so the pipeline can run without a client installation.
//!
//! The [`builders`] module assembles chunked WDT, ADT and WMO files, M2
//! models and client tables byte by byte, the same way the parsers read them.
pub mod builders;
pub mod storage;

pub use builders::{
    AdtBuilder, GameObjectTableBuilder, GroupBuilder, M2Builder, MapTableBuilder, RootBuilder,
    WdtBuilder, chunk,
};
pub use storage::{MemoryProvider, MemoryStorage};
