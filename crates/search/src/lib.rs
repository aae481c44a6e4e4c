// crates/search/src/lib.rs
//! The search engine facade (C4). Query normalization lives in
//! [`normalize`]; the ranked cross-session query, session-id resolution,
//! and intra-session match localization live in [`facade`].

pub mod facade;
pub mod normalize;
pub mod types;

pub use facade::{list_workspaces, resolve_session, search, session_matches, SearchError, SearchResult};
pub use normalize::{normalize as normalize_query, NormalizedQuery};
pub use types::{
    GroupSort, ResultSort, SearchInput, SearchResponse, SessionMatches, SessionResult, WorkspaceGroup,
    WorkspaceSort, WorkspaceSummary,
};
