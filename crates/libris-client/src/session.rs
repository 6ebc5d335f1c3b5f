//! Catalog session: one API connection and the catalog it feeds

use serde_json::Value;

use libris_core::{
    normalize_books, normalize_ranked_books, normalize_ranked_users, normalize_users, Book,
    Catalog, LibrisConfig, Normalized, RankedBook, RankedUser, UserId, ViewProjector,
    ViewSnapshot,
};

use crate::api::{Dashboard, LibraryApi, SearchQuery};
use crate::error::{ApiError, ApiResult};

/// Outcome of loading one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Records now in the catalog
    pub loaded: usize,
    /// Records skipped as malformed or duplicate
    pub rejected: usize,
}

/// Outcome of a full load; each side succeeds or fails on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub books: ApiResult<LoadStats>,
    pub users: ApiResult<LoadStats>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.books.is_ok() && self.users.is_ok()
    }

    /// The first failure, books before users
    pub fn first_error(&self) -> Option<&ApiError> {
        self.books.as_ref().err().or(self.users.as_ref().err())
    }
}

/// Where a ranking came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingSource {
    Server,
    /// Computed from the local catalog after the statistics endpoint failed
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking<T> {
    pub entries: Vec<T>,
    pub source: RankingSource,
}

/// Owns the catalog and the API it is loaded from
///
/// The catalog only changes through `&mut self`, so a load or action always
/// finishes its update before anything else can observe the catalog.
pub struct Session<A> {
    api: A,
    catalog: Catalog,
    config: LibrisConfig,
}

impl<A: LibraryApi> Session<A> {
    pub fn new(api: A, config: LibrisConfig) -> Self {
        Self {
            api,
            catalog: Catalog::new(),
            config,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn config(&self) -> &LibrisConfig {
        &self.config
    }

    /// Fetch books and users concurrently and replace whichever arrived
    ///
    /// A side that fails keeps its previous contents.
    pub async fn load_all(&mut self) -> LoadReport {
        let (books, users) = tokio::join!(self.api.list_books(), self.api.list_users());

        let report = LoadReport {
            books: books.map(|raw| self.apply_books(&raw)),
            users: users.map(|raw| self.apply_users(&raw)),
        };

        match report.first_error() {
            None => tracing::info!(
                books = self.catalog.book_count(),
                users = self.catalog.user_count(),
                "Catalog loaded"
            ),
            Some(err) => tracing::warn!("Catalog load incomplete: {}", err),
        }
        report
    }

    pub async fn load_books(&mut self) -> ApiResult<LoadStats> {
        let raw = self.api.list_books().await?;
        Ok(self.apply_books(&raw))
    }

    pub async fn load_users(&mut self) -> ApiResult<LoadStats> {
        let raw = self.api.list_users().await?;
        Ok(self.apply_users(&raw))
    }

    fn apply_books(&mut self, raw: &[Value]) -> LoadStats {
        let normalized = normalize_books(raw);
        let rejected = normalized.rejected.len();
        self.catalog.replace_books(normalized.records);
        LoadStats {
            loaded: self.catalog.book_count(),
            rejected,
        }
    }

    fn apply_users(&mut self, raw: &[Value]) -> LoadStats {
        let normalized = normalize_users(raw);
        let rejected = normalized.rejected.len();
        self.catalog.replace_users(normalized.records);
        LoadStats {
            loaded: self.catalog.user_count(),
            rejected,
        }
    }

    /// Server-side search; the catalog is left as it is
    pub async fn search(&self, query: &SearchQuery) -> ApiResult<Normalized<Book>> {
        if query.is_empty() {
            return Err(ApiError::InvalidRequest(
                "search needs a title, author or category".to_string(),
            ));
        }
        let raw = self.api.search_books(query).await?;
        Ok(normalize_books(&raw))
    }

    /// Books currently out to `user`, as the server reports them
    pub async fn borrowed_books(&self, user: UserId) -> ApiResult<Normalized<Book>> {
        let raw = self.api.borrowed_books(user).await?;
        Ok(normalize_books(&raw))
    }

    pub async fn dashboard(&self) -> ApiResult<Dashboard> {
        self.api.dashboard().await
    }

    pub async fn most_borrowed(&self, limit: usize) -> Ranking<RankedBook> {
        if limit == 0 {
            return Ranking {
                entries: Vec::new(),
                source: RankingSource::Server,
            };
        }

        match self.api.most_borrowed(limit).await {
            Ok(raw) => Ranking {
                entries: truncated(normalize_ranked_books(&raw).records, limit),
                source: RankingSource::Server,
            },
            Err(err) => {
                tracing::warn!("Most-borrowed statistics unavailable, using local data: {}", err);
                Ranking {
                    entries: ViewProjector::new(&self.catalog).most_borrowed(limit),
                    source: RankingSource::Local,
                }
            }
        }
    }

    pub async fn most_active(&self, limit: usize) -> Ranking<RankedUser> {
        if limit == 0 {
            return Ranking {
                entries: Vec::new(),
                source: RankingSource::Server,
            };
        }

        match self.api.most_active(limit).await {
            Ok(raw) => Ranking {
                entries: truncated(normalize_ranked_users(&raw).records, limit),
                source: RankingSource::Server,
            },
            Err(err) => {
                tracing::warn!("Most-active statistics unavailable, using local data: {}", err);
                Ranking {
                    entries: ViewProjector::new(&self.catalog).most_active(limit),
                    source: RankingSource::Local,
                }
            }
        }
    }

    /// Projections of the current catalog at the configured ranking limit
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewProjector::new(&self.catalog).snapshot(self.config.view.ranking_limit)
    }
}

fn truncated<T>(mut entries: Vec<T>, limit: usize) -> Vec<T> {
    entries.truncate(limit);
    entries
}
