// Accounts infrastructure - SQLite storage implementation

mod sqlite_account_store;

pub use sqlite_account_store::SqliteAccountStore;
