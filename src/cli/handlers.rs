// CLI command handlers.
//
// Same shape as any other adapter over the core:
// 1. Log in when the command acts for an account
// 2. Call the core service
// 3. Format the result as text or JSON
//
// No business logic lives here.

use super::args::{Command, Credentials, Format};
use crate::core::accounts::{AccountService, AccountStore, Session};
use crate::core::forum::{ForumService, ForumStore, ThreadPage, ThreadView};
use crate::core::moderation::Moderated;
use crate::core::schools::{Dashboard, School, SchoolService, SchoolStore, SpottedFeed};
use anyhow::Context;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

/// Services shared by every command.
pub struct App<A: AccountStore, F: ForumStore, S: SchoolStore> {
    pub accounts: Arc<AccountService<A>>,
    pub forum: Arc<ForumService<F>>,
    pub schools: Arc<SchoolService<A, S, F>>,
}

impl<A: AccountStore, F: ForumStore, S: SchoolStore> App<A, F, S> {
    pub fn new(accounts: AccountService<A>, forum: ForumService<F>, school_store: S) -> Self {
        let accounts = Arc::new(accounts);
        let forum = Arc::new(forum);
        let schools = Arc::new(SchoolService::new(
            Arc::clone(&accounts),
            Arc::clone(&forum),
            school_store,
        ));
        Self {
            accounts,
            forum,
            schools,
        }
    }

    async fn login(&self, creds: &Credentials) -> anyhow::Result<Session> {
        Ok(self.accounts.login(&creds.username, &creds.password).await?)
    }

    async fn school_login(&self, creds: &Credentials) -> anyhow::Result<Session> {
        Ok(self
            .accounts
            .school_login(&creds.username, &creds.password)
            .await?)
    }

    /// Run one command and return what should be printed.
    pub async fn execute(&self, command: Command) -> anyhow::Result<String> {
        match command {
            Command::Moderate { text, format } => {
                let result = self.forum.moderator().moderate(text.as_str());
                if format.json {
                    return to_json(&result);
                }
                let (display_text, blocked) = result.into_parts();
                Ok(format!(
                    "{}\nblocked: {}\n",
                    display_text,
                    if blocked { "yes" } else { "no" }
                ))
            }
            Command::Render { text } => {
                let html = self.forum.moderator().moderate(text.as_str()).to_html();
                Ok(format!("{}\n", html))
            }
            Command::Terms => {
                let mut out = String::new();
                for term in self.forum.moderator().terms() {
                    writeln!(out, "{}", term)?;
                }
                Ok(out)
            }

            Command::Register { username, password } => {
                let user = self.accounts.register(&username, &password).await?;
                Ok(format!("Registered {} (#{})\n", user.username, user.id))
            }
            Command::Login { creds, school } => {
                let session = if school {
                    self.school_login(&creds).await?
                } else {
                    self.login(&creds).await?
                };
                Ok(format!(
                    "Logged in as {} ({}), landing on the {}\n",
                    session.username,
                    session.role,
                    self.accounts.landing(&session)
                ))
            }
            Command::ChangePassword {
                creds,
                new_password,
            } => {
                let session = self.login(&creds).await?;
                self.accounts
                    .change_password(&session, &creds.password, &new_password)
                    .await?;
                Ok("Password changed\n".to_string())
            }
            Command::Profile { creds, format } => {
                let session = self.login(&creds).await?;
                let user = self.accounts.profile(&session).await?;
                if format.json {
                    return to_json(&user);
                }
                let mut out = format!("{} (#{})\nrole: {}\n", user.username, user.id, user.role);
                if let Some(school_id) = user.school_id {
                    writeln!(out, "school: #{}", school_id)?;
                }
                writeln!(out, "since: {}", user.created.format("%Y-%m-%d"))?;
                Ok(out)
            }

            Command::Threads { query, format } => {
                let threads = self.forum.list(query.as_deref()).await?;
                print_threads(&threads, format)
            }
            Command::Show { id, format } => {
                let page = self.forum.thread_page(id).await?;
                print_page(&page, format)
            }
            Command::NewThread {
                creds,
                title,
                content,
            } => {
                let session = self.login(&creds).await?;
                let thread = self
                    .forum
                    .create_thread(Some(&session), &title, &content)
                    .await?;
                Ok(format!("Created thread #{}\n", thread.id))
            }
            Command::Reply {
                creds,
                thread_id,
                content,
            } => {
                let session = self.login(&creds).await?;
                let post = self.forum.reply(Some(&session), thread_id, &content).await?;
                Ok(format!("Replied #{} in thread #{}\n", post.id, thread_id))
            }
            Command::EditThread {
                creds,
                id,
                title,
                content,
            } => {
                let session = self.login(&creds).await?;
                self.forum.edit_thread(&session, id, &title, &content).await?;
                Ok(format!("Updated thread #{}\n", id))
            }
            Command::DeleteThread { creds, id } => {
                let session = self.login(&creds).await?;
                self.forum.delete_thread(&session, id).await?;
                Ok(format!("Deleted thread #{}\n", id))
            }
            Command::EditPost { creds, id, content } => {
                let session = self.login(&creds).await?;
                self.forum.edit_post(&session, id, &content).await?;
                Ok(format!("Updated reply #{}\n", id))
            }
            Command::DeletePost { creds, id } => {
                let session = self.login(&creds).await?;
                let thread_id = self.forum.delete_post(&session, id).await?;
                Ok(format!("Deleted reply #{} from thread #{}\n", id, thread_id))
            }
            Command::Search { query, format } => {
                let threads = self.forum.search(&query).await?;
                print_threads(&threads, format)
            }

            Command::Schools { format } => {
                let schools = self.schools.list_schools().await?;
                print_schools(&schools, format)
            }
            Command::RegisterSchool {
                name,
                limit,
                teacher,
                teacher_password,
            } => {
                let (school, teacher) = self
                    .schools
                    .register_school(&name, &limit, &teacher, &teacher_password)
                    .await?;
                Ok(format!(
                    "Registered school {} (#{}) with teacher {}\n",
                    school.name, school.id, teacher.username
                ))
            }
            Command::Dashboard { creds, format } => {
                let session = self.school_login(&creds).await?;
                let dashboard = self.schools.dashboard(&session).await?;
                print_dashboard(&dashboard, format)
            }
            Command::AddStudent {
                creds,
                login,
                student_password,
            } => {
                let session = self.school_login(&creds).await?;
                let student = self
                    .schools
                    .add_student(&session, &login, &student_password)
                    .await?;
                Ok(format!("Added student {} (#{})\n", student.username, student.id))
            }
            Command::RemoveStudent { creds, student_id } => {
                let session = self.school_login(&creds).await?;
                if self.schools.remove_student(&session, student_id).await? {
                    Ok(format!("Removed student #{}\n", student_id))
                } else {
                    Ok(format!("No student #{} in your school\n", student_id))
                }
            }
            Command::ResetPassword {
                creds,
                student_id,
                new_password,
            } => {
                let session = self.school_login(&creds).await?;
                self.schools
                    .reset_student_password(&session, student_id, &new_password)
                    .await?;
                Ok(format!("Password of student #{} reset\n", student_id))
            }
            Command::Spotted {
                creds,
                school_id,
                format,
            } => {
                let session = self.school_login(&creds).await?;
                let feed = self.schools.spotted(Some(&session), school_id).await?;
                print_spotted(&feed, format)
            }
            Command::PostSpotted {
                creds,
                school_id,
                title,
                content,
            } => {
                let session = self.school_login(&creds).await?;
                let thread = self
                    .schools
                    .post_spotted(Some(&session), school_id, &title, &content)
                    .await?;
                Ok(format!("Posted spotted thread #{}\n", thread.id))
            }
            Command::SchoolThread { creds, id, format } => {
                let session = self.school_login(&creds).await?;
                let page = self.schools.school_thread(Some(&session), id).await?;
                print_page(&page, format)
            }
            Command::SchoolReply {
                creds,
                thread_id,
                content,
            } => {
                let session = self.school_login(&creds).await?;
                let post = self
                    .schools
                    .reply_school_thread(Some(&session), thread_id, &content)
                    .await?;
                Ok(format!("Replied #{} in thread #{}\n", post.id, thread_id))
            }
            Command::ModerateThread {
                creds,
                id,
                delete,
                title,
                content,
            } => {
                let session = self.school_login(&creds).await?;
                if delete {
                    let removed = self.schools.teacher_delete_thread(&session, id).await?;
                    return Ok(removal(removed, "thread", id));
                }
                let title = title.unwrap_or_default();
                self.schools
                    .teacher_edit_thread(&session, id, &title, content.as_deref().unwrap_or(""))
                    .await?;
                Ok(format!("Updated thread #{}\n", id))
            }
            Command::ModeratePost {
                creds,
                id,
                delete,
                content,
            } => {
                let session = self.school_login(&creds).await?;
                if delete {
                    let removed = self.schools.teacher_delete_post(&session, id).await?;
                    return Ok(removal(removed, "reply", id));
                }
                self.schools
                    .teacher_edit_post(&session, id, content.as_deref().unwrap_or(""))
                    .await?;
                Ok(format!("Updated reply #{}\n", id))
            }
            Command::Export {
                creds,
                school_id,
                out,
            } => {
                let session = self.school_login(&creds).await?;
                let export = self.schools.export_csv(&session, school_id).await?;
                std::fs::create_dir_all(&out)
                    .with_context(|| format!("creating {}", out.display()))?;
                let path = out.join(&export.filename);
                std::fs::write(&path, export.body.as_bytes())
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(school_id, path = %path.display(), "Spotted threads exported");
                Ok(format!("Wrote {}\n", path.display()))
            }
        }
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

fn removal(removed: bool, what: &str, id: i64) -> String {
    if removed {
        format!("Deleted {} #{}\n", what, id)
    } else {
        format!("Nothing to delete: {} #{} is not on your board\n", what, id)
    }
}

fn indent(out: &mut String, text: &Moderated) -> std::fmt::Result {
    for line in text.display_text.lines() {
        writeln!(out, "    {}", line)?;
    }
    Ok(())
}

fn write_thread(out: &mut String, view: &ThreadView) -> std::fmt::Result {
    writeln!(
        out,
        "#{} {} by {} at {}",
        view.thread.id,
        view.title,
        view.author_name(),
        view.thread.created.format("%Y-%m-%d %H:%M")
    )
}

fn print_threads(threads: &[ThreadView], format: Format) -> anyhow::Result<String> {
    if format.json {
        return to_json(&threads);
    }
    if threads.is_empty() {
        return Ok("No threads\n".to_string());
    }
    let mut out = String::new();
    for view in threads {
        write_thread(&mut out, view)?;
    }
    Ok(out)
}

fn write_page(out: &mut String, page: &ThreadPage) -> std::fmt::Result {
    write_thread(out, &page.thread)?;
    indent(out, &page.thread.body)?;
    for post in &page.posts {
        writeln!(
            out,
            "  reply #{} by {} at {}",
            post.post.id,
            post.author_name(),
            post.post.created.format("%Y-%m-%d %H:%M")
        )?;
        indent(out, &post.body)?;
    }
    Ok(())
}

fn print_page(page: &ThreadPage, format: Format) -> anyhow::Result<String> {
    if format.json {
        return to_json(page);
    }
    let mut out = String::new();
    write_page(&mut out, page)?;
    Ok(out)
}

fn print_schools(schools: &[School], format: Format) -> anyhow::Result<String> {
    if format.json {
        return to_json(&schools);
    }
    if schools.is_empty() {
        return Ok("No schools\n".to_string());
    }
    let mut out = String::new();
    for school in schools {
        let limit = match school.student_limit {
            0 => "no limit".to_string(),
            n => format!("max {} students", n),
        };
        writeln!(out, "#{} {} ({})", school.id, school.name, limit)?;
    }
    Ok(out)
}

fn print_dashboard(dashboard: &Dashboard, format: Format) -> anyhow::Result<String> {
    if format.json {
        return to_json(dashboard);
    }
    let mut out = String::new();
    writeln!(out, "{} (#{})", dashboard.school.name, dashboard.school.id)?;
    writeln!(out, "Students ({}):", dashboard.students.len())?;
    for student in &dashboard.students {
        writeln!(out, "  #{} {}", student.id, student.username)?;
    }
    writeln!(out, "Spotted threads ({}):", dashboard.threads.len())?;
    for page in &dashboard.threads {
        write_page(&mut out, page)?;
    }
    Ok(out)
}

fn print_spotted(feed: &SpottedFeed, format: Format) -> anyhow::Result<String> {
    if format.json {
        return to_json(feed);
    }
    let mut out = format!("Spotted: {}\n", feed.school.name);
    if feed.threads.is_empty() {
        out.push_str("No threads\n");
    }
    for view in &feed.threads {
        write_thread(&mut out, view)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Cli;
    use crate::core::accounts::AccountConfig;
    use crate::core::moderation::{ContentModerator, PLACEHOLDER};
    use crate::infra::memory::InMemoryStore;
    use clap::Parser;
    use tempfile::tempdir;

    type TestApp = App<InMemoryStore, InMemoryStore, InMemoryStore>;

    fn app() -> TestApp {
        let store = InMemoryStore::new();
        let accounts = AccountService::new_with_config(
            store.clone(),
            AccountConfig {
                hash_iterations: 10,
            },
        );
        let moderator = Arc::new(ContentModerator::with_default_terms().unwrap());
        let forum = ForumService::new(store.clone(), moderator);
        App::new(accounts, forum, store)
    }

    async fn run(app: &TestApp, args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("lol-page").chain(args.iter().copied()))?;
        app.execute(cli.command).await
    }

    #[tokio::test]
    async fn test_moderate_command() {
        let app = app();
        let out = run(&app, &["moderate", "Ty IDIOTA"]).await.unwrap();
        assert_eq!(out, format!("{}\nblocked: yes\n", PLACEHOLDER));

        let json = run(&app, &["moderate", "miłego dnia", "--json"]).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["display_text"], "miłego dnia");
        assert_eq!(value["blocked"], false);
    }

    #[tokio::test]
    async fn test_render_escapes() {
        let app = app();
        let out = run(&app, &["render", "<b>hej</b>\nnara"]).await.unwrap();
        assert_eq!(out, "&lt;b&gt;hej&lt;/b&gt;<br>nara\n");
    }

    #[tokio::test]
    async fn test_forum_flow() {
        let app = app();
        run(&app, &["register", "ala", "haslo"]).await.unwrap();
        let out = run(
            &app,
            &["new-thread", "-u", "ala", "-p", "haslo", "--title", "Witam", "--content", "ty debilu"],
        )
        .await
        .unwrap();
        assert!(out.starts_with("Created thread #"));

        let listing = run(&app, &["threads"]).await.unwrap();
        assert!(listing.contains("Witam by ala"));

        let threads = app.forum.list(None).await.unwrap();
        let id = threads[0].thread.id.to_string();
        run(&app, &["reply", "-u", "ala", "-p", "haslo", &id, "--content", "pierwsza"])
            .await
            .unwrap();

        let page = run(&app, &["show", &id]).await.unwrap();
        assert!(page.contains(PLACEHOLDER));
        assert!(!page.contains("debilu"));
        assert!(page.contains("pierwsza"));

        let found = run(&app, &["search", "witam", "--json"]).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&found).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_json_output_never_carries_blocked_text() {
        let app = app();
        run(&app, &["register", "ala", "haslo"]).await.unwrap();
        run(
            &app,
            &["new-thread", "-u", "ala", "-p", "haslo", "--title", "Sąsiad", "--content", "ty debilu"],
        )
        .await
        .unwrap();
        let id = app.forum.list(None).await.unwrap()[0].thread.id.to_string();
        run(&app, &["reply", "-u", "ala", "-p", "haslo", &id, "--content", "kurwa mac"])
            .await
            .unwrap();

        let shown = run(&app, &["show", &id, "--json"]).await.unwrap();
        let listed = run(&app, &["threads", "--json"]).await.unwrap();
        let found = run(&app, &["search", "sąsiad", "--json"]).await.unwrap();
        for out in [&shown, &listed, &found] {
            assert!(!out.contains("debil"), "{}", out);
            assert!(!out.contains("kurwa"), "{}", out);
        }

        let page: serde_json::Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(page["thread"]["title"]["display_text"], "Sąsiad");
        assert_eq!(page["thread"]["body"]["display_text"], PLACEHOLDER);
        assert_eq!(page["thread"]["author"], "ala");
        assert_eq!(page["posts"][0]["body"]["blocked"], true);
    }

    #[tokio::test]
    async fn test_wrong_password_is_an_error() {
        let app = app();
        run(&app, &["register", "ala", "haslo"]).await.unwrap();
        let err = run(&app, &["profile", "-u", "ala", "-p", "zle"]).await.unwrap_err();
        assert!(err.to_string().contains("Invalid"));
    }

    #[tokio::test]
    async fn test_school_flow_and_export() {
        let app = app();
        run(
            &app,
            &["register-school", "--name", "Liceum nr 1", "--limit", "1", "--teacher", "pani", "--teacher-password", "tajne"],
        )
        .await
        .unwrap();
        let school_id = app.schools.list_schools().await.unwrap()[0].id.to_string();

        let teacher = ["-u", "pani", "-p", "tajne"];
        let mut add = vec!["add-student"];
        add.extend(teacher);
        add.extend(["--login", "jas", "--student-password", "x"]);
        run(&app, &add).await.unwrap();

        let mut post = vec!["post-spotted", "-u", "jas", "-p", "x", school_id.as_str()];
        post.extend(["--title", "Widziałem", "--content", "kogoś, w bibliotece"]);
        run(&app, &post).await.unwrap();

        let mut dashboard = vec!["dashboard"];
        dashboard.extend(teacher);
        let out = run(&app, &dashboard).await.unwrap();
        assert!(out.contains("Students (1):"));
        assert!(out.contains("Widziałem by jas"));

        let dir = tempdir().unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        let mut export = vec!["export"];
        export.extend(teacher);
        export.extend([school_id.as_str(), "--out", dir_arg]);
        let out = run(&app, &export).await.unwrap();
        assert!(out.starts_with("Wrote "));

        let file = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let name = file.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("Liceum_nr_1_export_"));
        let body = std::fs::read_to_string(&file).unwrap();
        assert!(body.contains("\"kogoś, w bibliotece\""));
    }

    #[tokio::test]
    async fn test_public_account_cannot_use_school_login() {
        let app = app();
        run(&app, &["register", "ala", "haslo"]).await.unwrap();
        assert!(run(&app, &["login", "-u", "ala", "-p", "haslo"]).await.is_ok());
        assert!(run(&app, &["login", "-u", "ala", "-p", "haslo", "--school"])
            .await
            .is_err());
    }
}
