#![doc = "ftp-sync-core: core logic library for ftp-sync."]

//! This crate contains the data model, the seams and every step of a
//! synchronisation run: walking the remote tree, resolving the watermark
//! from the destination container, filtering, fetching and expanding
//! archives, and publishing the expanded files.
//!
//! The concrete destination-store client lives in the `ftp-sync` crate; this
//! crate only knows the [`contract::BlobStore`] trait.

pub mod config;
pub mod contract;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod ftp;
pub mod publish;
pub mod synchronise;
pub mod walker;
pub mod watermark;
