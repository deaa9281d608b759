// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - `replay` - determinism and fail-closed folding of histories
//! - `store` - sequencing, global ordering, concurrency and deduplication

mod replay;
mod store;
