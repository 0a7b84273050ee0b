// Adapters: concrete implementations of the domain ports for external systems.

pub mod hbase;
pub mod mongo;
pub mod shell;
pub mod storage;
