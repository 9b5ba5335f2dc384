use crate::{MemoryClientPrepared, MemoryConnection, MemoryServerPrepared, MemorySqlWriter};
use hatch_core::Driver;

#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryDriver {}

impl MemoryDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for MemoryDriver {
    type Connection = MemoryConnection;
    type ServerPrepared = MemoryServerPrepared;
    type ClientPrepared = MemoryClientPrepared;
    type SqlWriter = MemorySqlWriter;

    const NAME: &'static str = "memory";

    fn sql_writer(&self) -> MemorySqlWriter {
        MemorySqlWriter {}
    }
}
