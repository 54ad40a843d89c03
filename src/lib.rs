//! docpack - portable containers for event-sourced remote documents
//!
//! Exports a remote document (header, state, and operation log) into a
//! single zip-compatible container file, and recreates documents from
//! such files by replaying their logs against a remote store.

pub mod archive;
pub mod checksum;
pub mod cli;
pub mod container;
pub mod document;
pub mod drive;
pub mod observability;
pub mod remote;
