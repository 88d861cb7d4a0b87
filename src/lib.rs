//! # Storybot
//!
//! Backend, retrieval engine, and terminal client for a children's
//! storytelling assistant.
//!
//! Storybot serves the three HTTP contracts the story UI depends on
//! (`POST /chat`, `POST /generate-image`, `GET /api/pdf-index`), builds the
//! embedding index those answers are grounded in, and ships a terminal chat
//! client that assembles conversation transcripts from the same endpoints.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ md/txt/pdf   │──▶│   Ingest      │──▶│ StoryIndex  │
//! │ story corpus │   │ chunk+embed  │   │ (JSON file) │
//! └──────────────┘   └──────────────┘   └──────┬──────┘
//!                                              │
//!                     ┌────────────────────────┤
//!                     ▼                        ▼
//!               ┌───────────┐           ┌────────────┐
//!               │  Server   │◀──HTTP───│   Client    │
//!               │ (vendors) │           │ (chat CLI) │
//!               └───────────┘           └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! storybot index                 # build the embedding index
//! storybot serve                 # start the story backend
//! storybot chat                  # interactive chat against the backend
//! storybot search "dragons" -k 3 # nearest-neighbor lookup over the index
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Conversation transcript types |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`retriever`] | Brute-force cosine top-k lookup |
//! | [`context`] | Retrieval context (provider + loaded index) |
//! | [`backend`] | Thin HTTP client for the story backend |
//! | [`session`] | Chat transcript assembly |
//! | [`story`] | Vendor text/image generation |
//! | [`server`] | The story backend HTTP server |
//! | [`ingest`] | Index construction from a document corpus |
//! | [`demo`] | Scripted demo conversation playback |
//! | [`history`] | Static transcript viewer |

pub mod backend;
pub mod chunk;
pub mod config;
pub mod context;
pub mod demo;
pub mod embedding;
pub mod history;
pub mod ingest;
pub mod models;
pub mod retriever;
pub mod server;
pub mod session;
pub mod story;
