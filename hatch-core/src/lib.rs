mod as_value;
mod bindings;
mod cancel;
mod connection;
mod driver;
mod error;
mod metadata;
mod options;
mod prepared;
mod query;
mod scan;
mod sql_writer;
mod state;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use bindings::*;
pub use cancel::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use metadata::*;
pub use options::*;
pub use prepared::*;
pub use query::*;
pub use scan::*;
pub use sql_writer::*;
pub use state::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
