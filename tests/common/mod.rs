//! Consolidated test utilities for wt
//!
//! This module provides unified testing utilities for integration tests,
//! built on real git repositories and worktrees under a temporary scan directory.

pub mod assertions;
pub mod fixtures;
pub mod repository;
