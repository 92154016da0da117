/// Running-balance engine: opening balances, recomputation walks, verification
pub mod balance;
/// Default and per-user categories
pub mod category;
/// The caller-facing [`ledger::Ledger`]
pub mod ledger;
/// Per-user serialization of ledger mutations
pub mod locks;
/// Integer minor-unit money type
pub mod money;
/// Receipt metadata and remote binary cleanup
pub mod receipt;
/// Daily opening/closing summaries
pub mod summary;
/// Transaction create, update, delete and listing
pub mod transaction;

pub use ledger::Ledger;
