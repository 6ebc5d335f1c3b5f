//! Command execution

use std::process::ExitCode;

use clap::Parser;
use comfy_table::Table;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use libris_client::{
    Dispatcher, DispatchError, LibraryApi, NewBook, NewUser, Notice, RankingSource,
};
use libris_core::{BookId, Catalog, CatalogError, Entity};

use crate::cli::{book_filter, search_query, split_words, Command, ShellLine};
use crate::render;

pub async fn run<A: LibraryApi>(command: Command, dispatcher: &mut Dispatcher<A>) -> ExitCode {
    if command.needs_catalog() {
        let loaded = dispatcher.load().await;
        if loaded.notice.is_error() {
            report(&loaded.notice);
        }
    }

    if let Command::Shell = command {
        return shell(dispatcher).await;
    }

    match execute(command, dispatcher).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err.notice());
            ExitCode::FAILURE
        }
    }
}

async fn execute<A: LibraryApi>(
    command: Command,
    dispatcher: &mut Dispatcher<A>,
) -> Result<(), DispatchError> {
    match command {
        Command::Books {
            kind,
            category,
            search,
        } => {
            let filter = book_filter(&kind, &category, &search);
            println!("{}", render::books(dispatcher.catalog().filter_books(&filter)));
        }

        Command::Search {
            title,
            author,
            category,
        } => {
            let found = dispatcher
                .session()
                .search(&search_query(&title, &author, &category))
                .await?;
            println!("{}", render::books(&found.records));
            if !found.rejected.is_empty() {
                report(&Notice::info(format!(
                    "{} unreadable records skipped",
                    found.rejected.len()
                )));
            }
        }

        Command::Users => {
            println!("{}", render::users(dispatcher.catalog().users()));
        }

        Command::Book { id } => {
            println!("{}", book_details(dispatcher.catalog(), id)?);
        }

        Command::Borrowed { user } => {
            let found = dispatcher.session().borrowed_books(user).await?;
            println!("{}", render::books(&found.records));
        }

        Command::AddBook {
            title,
            author,
            isbn,
            category,
            copies,
        } => {
            let done = dispatcher
                .add_book(NewBook {
                    title,
                    author,
                    isbn,
                    category,
                    copies,
                })
                .await?;
            report(&done.notice);
            if let Some(book) = done.value {
                println!("{}", render::books([&book]));
            }
        }

        Command::DeleteBook { id } => {
            report(&dispatcher.delete_book(id).await?.notice);
        }

        Command::AddUser { name, email, role } => {
            let done = dispatcher.add_user(NewUser { name, email, role }).await?;
            report(&done.notice);
            if let Some(user) = done.value {
                println!("{}", render::users([&user]));
            }
        }

        Command::DeleteUser { id } => {
            report(&dispatcher.delete_user(id).await?.notice);
        }

        Command::Borrow { user, book } => {
            let done = dispatcher.borrow(user, book).await?;
            report(&done.notice);
            println!("{}", render::history([&done.value]));
        }

        Command::Return { user, book } => {
            let done = dispatcher.return_book(user, book).await?;
            report(&done.notice);
            println!("{}", render::history([&done.value]));
        }

        Command::History => {
            println!("{}", render::history(dispatcher.history()));
        }

        Command::Stats { limit } => {
            let limit = limit.unwrap_or(dispatcher.session().config().view.ranking_limit);

            let borrowed = dispatcher.session().most_borrowed(limit).await;
            if borrowed.source == RankingSource::Local {
                report(&Notice::info("Most-borrowed ranking computed locally"));
            }
            println!("Most borrowed\n{}", render::most_borrowed(&borrowed.entries));

            let active = dispatcher.session().most_active(limit).await;
            if active.source == RankingSource::Local {
                report(&Notice::info("Most-active ranking computed locally"));
            }
            println!("Most active\n{}", render::most_active(&active.entries));
        }

        Command::Dashboard => {
            match dispatcher.session().dashboard().await {
                Ok(dashboard) => {
                    println!("{}", render::dashboard(&dashboard));
                    if !dashboard.category_distribution.is_empty() {
                        println!("By category\n{}", render::dashboard_categories(&dashboard));
                    }
                }
                Err(err) => report(&Notice::error(format!(
                    "Server dashboard unavailable: {}",
                    err.user_message()
                ))),
            }

            let snapshot = dispatcher.session().snapshot();
            println!("{}", render::header(&snapshot.header));
            println!("{}", render::categories(&snapshot.categories));
            println!("Most borrowed\n{}", render::most_borrowed(&snapshot.most_borrowed));
            println!("Most active\n{}", render::most_active(&snapshot.most_active));
        }

        Command::Shell => report(&Notice::info("Already reading commands")),
    }

    Ok(())
}

fn book_details(catalog: &Catalog, id: BookId) -> Result<Table, CatalogError> {
    catalog
        .find_book(id)
        .map(render::book_details)
        .ok_or(CatalogError::NotFound(Entity::Book(id)))
}

/// What one line typed at the prompt asks for
#[derive(Debug)]
enum ShellInput {
    Blank,
    Quit,
    Run(Command),
    Invalid(clap::Error),
}

fn parse_shell_line(line: &str) -> ShellInput {
    let words = split_words(line);
    match words.first().map(String::as_str) {
        None => ShellInput::Blank,
        Some("quit" | "exit") => ShellInput::Quit,
        Some(_) => match ShellLine::try_parse_from(words) {
            Ok(parsed) => ShellInput::Run(parsed.command),
            Err(err) => ShellInput::Invalid(err),
        },
    }
}

/// Runs commands from stdin until EOF or `quit`, reprinting the header
/// counts whenever an action changes the catalog
async fn shell<A: LibraryApi>(dispatcher: &mut Dispatcher<A>) -> ExitCode {
    let mut view = dispatcher.subscribe_view();
    view.borrow_and_update();
    println!("{}", render::header(&view.borrow().header));

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        eprint!("libris> ");
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                report(&Notice::error(format!("Cannot read input: {}", err)));
                return ExitCode::FAILURE;
            }
        };

        match parse_shell_line(&line) {
            ShellInput::Blank => continue,
            ShellInput::Quit => break,
            ShellInput::Invalid(err) => {
                let _ = err.print();
                continue;
            }
            ShellInput::Run(command) => {
                if let Err(err) = execute(command, dispatcher).await {
                    report(&err.notice());
                }
            }
        }

        if view.has_changed().unwrap_or(false) {
            println!("{}", render::header(&view.borrow_and_update().header));
        }
    }

    ExitCode::SUCCESS
}

fn report(notice: &Notice) {
    eprintln!("{}", notice);
}
