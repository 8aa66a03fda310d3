//! PostgreSQL target table writer.
//!
//! Implements [`target_sink::TargetSink`] over a single autocommit
//! tokio-postgres connection. Every upsert is one
//! `INSERT ... ON CONFLICT (id) DO UPDATE` statement and every delete is one
//! `DELETE ... WHERE id = $1`; nothing is read before it is written.

mod connect;
mod ddl;
mod write;

pub use connect::{check_connection, PgConfig};
pub use ddl::{create_table_sql, validate_identifier};
pub use write::{delete_sql, upsert_sql, PostgresSink};
