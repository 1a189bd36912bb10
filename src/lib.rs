//! coderelay: an authenticated WebSocket MCP server that lets an external AI
//! coding assistant drive a running text editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     WebSocket      ┌─────────────────┐
//! │  AI assistant   │ ◄────────────────► │  BridgeServer   │
//! └─────────────────┘                    └────────┬────────┘
//!                                                 │
//!                                                 │ EditorCommand channel
//!                                                 ▼
//!                                        ┌─────────────────┐
//!                                        │   Host editor   │
//!                                        │    adapter      │
//!                                        └─────────────────┘
//! ```
//!
//! ## Protocol
//!
//! - Transport: WebSocket on localhost (127.0.0.1), one session per client
//! - Protocol: JSON-RPC 2.0, MCP version 2024-11-05
//! - Auth: session secret in the `x-claude-code-ide-authorization` header,
//!   checked at upgrade time
//! - Discovery: lock file at `~/.claude/ide/{port}.lock`
//!
//! ## Flow
//!
//! The host constructs one [`BridgeServer`] at startup with an
//! [`EditorCommand`] channel it services from its own event loop, and calls
//! [`BridgeServer::start`]. Assistant tool calls arrive over the socket;
//! `openDiff` suspends until the host reports a human decision through
//! [`BridgeServer::accept_diff`] / [`BridgeServer::reject_diff`] (or the
//! surface is torn down). Editor-driven events (selection motion, mentions)
//! fan out to every connected client as notifications.

pub mod config;
pub mod diff;
pub mod editor;
pub mod error;
mod fanout;
mod handlers;
pub mod lockfile;
pub mod protocol;
pub mod server;
mod session;
pub mod tools;

pub use config::ServerConfig;
pub use diff::{DiffCoordinator, DiffKey, DiffOutcome};
pub use editor::{EditorCommand, EditorHandle, SelectionSnapshot, SurfaceId};
pub use error::{LockFileError, ServerError};
pub use lockfile::LockFile;
pub use server::{AUTH_HEADER, BridgeServer};
