// Forum infrastructure - SQLite storage implementation

mod sqlite_forum_store;

pub use sqlite_forum_store::SqliteForumStore;
