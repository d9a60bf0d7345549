//! End-to-end tests: composition, rendering and dispatch wired together
//! with in-memory doubles, plus one run against a fake Bot API server.

mod bot_api;
mod mocks;
mod pipeline;
