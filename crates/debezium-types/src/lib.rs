//! Debezium envelope decoding for cdc-relay.
//!
//! Debezium's JSON converter wraps every change in an envelope:
//!
//! ```text
//! {
//!   "schema": { ... },
//!   "payload": {
//!     "op": "c" | "u" | "d" | "r" | "t",
//!     "before": { column: value, ... } | null,
//!     "after":  { column: value, ... } | null,
//!     "source": { ... },
//!     "ts_ms": 1700000000000
//!   }
//! }
//! ```
//!
//! [`decode`] turns the raw message value into a [`Decoded`]. It never fails:
//! tombstones decode to [`Decoded::Empty`] and anything that is not a usable
//! create/update/delete decodes to [`Decoded::Unknown`] with the reason.

pub mod error;
pub mod reverse;

pub use error::DecodeError;
pub use reverse::{decode, decode_value, Decoded};
