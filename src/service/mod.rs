//! Service layer for the rivalry ledger
//!
//! This module contains the match lifecycle API that callers (an HTTP layer,
//! the replay binary, tests) use to record, edit and delete matches.

pub mod match_service;

pub use match_service::MatchService;
