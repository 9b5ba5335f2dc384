mod connection;
mod driver;
mod engine;
mod parser;
mod prepared;
mod server;
mod sql_writer;

pub use connection::*;
pub use driver::*;
pub use engine::Response;
pub use prepared::*;
pub use server::*;
pub use sql_writer::*;
