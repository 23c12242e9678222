mod block;
mod blockset;
mod file;
mod fileset;
mod remote_volume;

pub use block::*;
pub use blockset::*;
pub use file::*;
pub use fileset::*;
pub use remote_volume::*;

/// Generic row shape for ad hoc `SELECT COUNT(*) as count ...` queries run
/// through `diesel::sql_query`, used by the temp-table helpers and the
/// legacy-database smoke test.
#[derive(diesel::QueryableByName)]
pub struct CountRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub count: i64,
}
