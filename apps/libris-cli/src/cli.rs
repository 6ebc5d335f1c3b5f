//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use libris_client::SearchQuery;
use libris_core::{BookFilter, BookId, Role, UserId};

#[derive(Debug, Parser)]
#[command(name = "libris", version, about = "Library catalog client")]
pub struct Cli {
    /// Config file to use instead of ~/.libris/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, e.g. http://localhost:8080/api/v1
    #[arg(long, global = true)]
    pub api: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List books, optionally filtered locally
    Books {
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Matches title or author
        #[arg(long)]
        search: Option<String>,
    },
    /// Search books on the server
    Search {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List users
    Users,
    /// Details, copies and download links of one book
    Book { id: BookId },
    /// Books currently out to a user
    Borrowed { user: UserId },
    /// Add a book to the catalog
    AddBook {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        isbn: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        copies: Option<u32>,
    },
    /// Remove a book from the catalog
    DeleteBook { id: BookId },
    /// Register a user
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },
    /// Remove a user
    DeleteUser { id: UserId },
    /// Lend a copy of a book to a user
    Borrow { user: UserId, book: BookId },
    /// Take a borrowed copy back
    Return { user: UserId, book: BookId },
    /// Borrows and returns made in this session
    History,
    /// Most-borrowed books and most-active users
    Stats {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Catalog overview and category distribution
    Dashboard,
    /// Read commands from stdin against one loaded catalog
    Shell,
}

/// One line typed at the shell prompt
#[derive(Debug, Parser)]
#[command(name = "libris", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

impl Command {
    /// Whether the command needs the catalog loaded first
    pub fn needs_catalog(&self) -> bool {
        !matches!(self, Command::Search { .. } | Command::Borrowed { .. })
    }
}

/// Split a shell line into words; double quotes group words with spaces
pub fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    words.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        words.push(current);
    }
    words
}

pub fn book_filter(kind: &Option<String>, category: &Option<String>, search: &Option<String>) -> BookFilter {
    let mut filter = BookFilter::new();
    if let Some(kind) = kind {
        filter = filter.kind(kind.as_str());
    }
    if let Some(category) = category {
        filter = filter.category(category.as_str());
    }
    if let Some(text) = search {
        filter = filter.text(text.as_str());
    }
    filter
}

pub fn search_query(title: &Option<String>, author: &Option<String>, category: &Option<String>) -> SearchQuery {
    SearchQuery {
        title: title.clone(),
        author: author.clone(),
        category: category.clone(),
    }
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{}' (member, librarian, admin)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_borrow() {
        let cli = Cli::try_parse_from(["libris", "borrow", "1001", "101"]).unwrap();
        match cli.command {
            Command::Borrow { user, book } => {
                assert_eq!(user, UserId(1001));
                assert_eq!(book, BookId(101));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["libris", "users", "--api", "http://example.org/api/v1"]).unwrap();
        assert_eq!(cli.api.as_deref(), Some("http://example.org/api/v1"));
    }

    #[test]
    fn test_role_is_case_insensitive() {
        let cli = Cli::try_parse_from(["libris", "add-user", "--name", "Ada", "--role", "Librarian"]).unwrap();
        match cli.command {
            Command::AddUser { role, .. } => assert_eq!(role, Some(Role::Librarian)),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["libris", "add-user", "--name", "Ada", "--role", "wizard"]).is_err());
    }

    #[test]
    fn test_non_numeric_id_is_rejected() {
        assert!(Cli::try_parse_from(["libris", "delete-book", "abc"]).is_err());
    }

    #[test]
    fn test_every_subcommand_has_help() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let undocumented: Vec<_> = cli
            .get_subcommands()
            .filter(|sub| sub.get_about().is_none())
            .map(|sub| sub.get_name().to_string())
            .collect();
        assert!(undocumented.is_empty(), "no help text: {:?}", undocumented);
    }

    #[test]
    fn test_book_details_command() {
        let cli = Cli::try_parse_from(["libris", "book", "101"]).unwrap();
        assert!(matches!(cli.command, Command::Book { id } if id == BookId(101)));
    }

    #[test]
    fn test_shell_line_without_binary_name() {
        let line = ShellLine::try_parse_from(split_words(r#"search --title "War and Peace""#)).unwrap();
        match line.command {
            Command::Search { title, .. } => assert_eq!(title.as_deref(), Some("War and Peace")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("  borrow 1001   101 "), vec!["borrow", "1001", "101"]);
        assert_eq!(split_words(r#"add-user --name "" --email a@b.c"#), vec!["add-user", "--name", "", "--email", "a@b.c"]);
        assert!(split_words("   ").is_empty());
    }

    #[test]
    fn test_books_filter_from_flags() {
        let filter = book_filter(&Some("Manga".to_string()), &None, &Some("otomo".to_string()));
        assert!(!filter.is_empty());
        assert!(book_filter(&None, &None, &None).is_empty());
    }
}
