// Command-line surface. One subcommand per core operation.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lol-page")]
#[command(about = "Forum with a Polish profanity filter and school spotted boards", long_about = None)]
pub struct Cli {
    /// SQLite database file (overrides DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Login used by commands that act on behalf of an account.
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    #[arg(short, long)]
    pub username: String,

    #[arg(short, long)]
    pub password: String,
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct Format {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the content filter over a piece of text
    Moderate {
        text: String,
        #[command(flatten)]
        format: Format,
    },
    /// Moderate text and print it as HTML
    Render { text: String },
    /// List the active banned terms
    Terms,

    /// Create a regular forum account
    Register { username: String, password: String },
    /// Check a login and show where the account lands
    Login {
        #[command(flatten)]
        creds: Credentials,
        /// Use the school login (teachers and students only)
        #[arg(long)]
        school: bool,
    },
    ChangePassword {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long)]
        new_password: String,
    },
    /// Show the logged-in account
    Profile {
        #[command(flatten)]
        creds: Credentials,
        #[command(flatten)]
        format: Format,
    },

    /// List public threads, newest first
    Threads {
        #[arg(short, long)]
        query: Option<String>,
        #[command(flatten)]
        format: Format,
    },
    /// Show a public thread with its replies
    Show {
        id: i64,
        #[command(flatten)]
        format: Format,
    },
    NewThread {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
    },
    Reply {
        #[command(flatten)]
        creds: Credentials,
        thread_id: i64,
        #[arg(long)]
        content: String,
    },
    EditThread {
        #[command(flatten)]
        creds: Credentials,
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
    },
    DeleteThread {
        #[command(flatten)]
        creds: Credentials,
        id: i64,
    },
    EditPost {
        #[command(flatten)]
        creds: Credentials,
        id: i64,
        #[arg(long)]
        content: String,
    },
    DeletePost {
        #[command(flatten)]
        creds: Credentials,
        id: i64,
    },
    /// Search public threads by title or content
    Search {
        query: String,
        #[command(flatten)]
        format: Format,
    },

    /// List registered schools
    Schools {
        #[command(flatten)]
        format: Format,
    },
    /// Register a school together with its teacher account
    RegisterSchool {
        #[arg(long)]
        name: String,
        /// Maximum number of students, 0 for no limit
        #[arg(long, default_value = "0")]
        limit: String,
        #[arg(long)]
        teacher: String,
        #[arg(long)]
        teacher_password: String,
    },
    /// Teacher dashboard: students and spotted threads
    Dashboard {
        #[command(flatten)]
        creds: Credentials,
        #[command(flatten)]
        format: Format,
    },
    AddStudent {
        #[command(flatten)]
        creds: Credentials,
        #[arg(long)]
        login: String,
        #[arg(long)]
        student_password: String,
    },
    RemoveStudent {
        #[command(flatten)]
        creds: Credentials,
        student_id: i64,
    },
    /// Set a new password for one of the teacher's students
    ResetPassword {
        #[command(flatten)]
        creds: Credentials,
        student_id: i64,
        #[arg(long)]
        new_password: String,
    },
    /// Read a school's spotted board
    Spotted {
        #[command(flatten)]
        creds: Credentials,
        school_id: i64,
        #[command(flatten)]
        format: Format,
    },
    PostSpotted {
        #[command(flatten)]
        creds: Credentials,
        school_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    SchoolThread {
        #[command(flatten)]
        creds: Credentials,
        id: i64,
        #[command(flatten)]
        format: Format,
    },
    SchoolReply {
        #[command(flatten)]
        creds: Credentials,
        thread_id: i64,
        #[arg(long)]
        content: String,
    },
    /// Teacher edit or removal of a spotted thread
    ModerateThread {
        #[command(flatten)]
        creds: Credentials,
        id: i64,
        #[arg(long, conflicts_with_all = ["title", "content"])]
        delete: bool,
        #[arg(long, required_unless_present = "delete")]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Teacher edit or removal of a spotted reply
    ModeratePost {
        #[command(flatten)]
        creds: Credentials,
        id: i64,
        #[arg(long, conflicts_with = "content")]
        delete: bool,
        #[arg(long, required_unless_present = "delete")]
        content: Option<String>,
    },
    /// Write a school's spotted threads to a CSV file
    Export {
        #[command(flatten)]
        creds: Credentials,
        school_id: i64,
        /// Directory for the CSV file
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}
