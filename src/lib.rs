//! Convert one uploaded JSON object into a normalized Parquet file and ask
//! the catalog to pick it up.
//!
//! [`handler::Handler`] drives one invocation; [`process`] holds the pure
//! load/normalize/coerce/encode pipeline.

pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod process;
pub mod store;

pub use error::{ConvertError, Result};
pub use handler::{Handler, Response};
