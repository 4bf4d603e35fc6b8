//! # DriveScout
//!
//! LLM-ranked document search over a shared Google Drive folder tree.
//!
//! DriveScout crawls the folders under a root, lists every document of a
//! target type, and asks a language model which of them answer a free-text
//! query. The model is only a judge: it sees a numbered list of file names and
//! folders and replies with indices. Everything around that call (the crawl,
//! the catalog, prompt construction, reply parsing, and failure handling) is
//! deterministic and lives here.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  Crawl   │──▶│ Catalog  │──▶│   Rank   │──▶│  Enrich  │
//! │ folders  │   │ documents│   │ LLM call │   │ previews │
//! └──────────┘   └──────────┘   └──────────┘   └────┬─────┘
//!                                                   │
//!                              ┌────────────────────┤
//!                              ▼                    ▼
//!                         ┌──────────┐        ┌──────────┐
//!                         │   CLI    │        │   HTTP   │
//!                         │ (scout)  │        │  (JSON)  │
//!                         └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GOOGLE_API_KEY=...   # Drive API key
//! export GEMINI_API_KEY=...   # default ranking provider
//! scout crawl                 # check what folders are visible
//! scout search "Nativity troparion" --enrich
//! scout serve                 # POST /search on 127.0.0.1:7341
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Folder index and document types |
//! | [`error`] | Error taxonomy |
//! | [`drive`] | Remote store trait and Drive v3 client |
//! | [`crawl`] | Depth-bounded folder crawl |
//! | [`catalog`] | Candidate document listing |
//! | [`ranking`] | LLM ranking backends and prompt protocol |
//! | [`extract`] | PDF/DOCX text extraction |
//! | [`enrich`] | Text previews for top results |
//! | [`search`] | End-to-end pipeline |
//! | [`providers`] | Provider credential table |
//! | [`server`] | JSON HTTP server |

pub mod catalog;
pub mod config;
pub mod crawl;
pub mod drive;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod models;
pub mod providers;
pub mod ranking;
pub mod search;
pub mod server;
