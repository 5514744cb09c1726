// Schools infrastructure - SQLite storage implementation

mod sqlite_school_store;

pub use sqlite_school_store::SqliteSchoolStore;
