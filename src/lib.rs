//! Store Concurrency - a concurrency-correctness harness for document stores
//!
//! One actor keeps rewriting a single task document while another keeps
//! counting the tasks that are not DONE. The count must never move. A
//! coordinator supervises both and reports the first violation, store
//! error or write anomaly it sees.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{Application, Coordinator, RunReport};
pub use error::{Error, ErrorKind, Result};
