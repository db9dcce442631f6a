#![doc = "repec-archive-core: core logic library for repec-archive."]

//! This crate turns content records into RePEc ReDIF templates and keeps the
//! archive directory a RePEc harvester reads from in shape.
//!
//! # Usage
//! Build a [`publish::Publisher`] from [`settings::ArchiveSettings`], a
//! [`contract::ReferenceLoader`] and a [`contract::ConfigStore`], then drive the
//! entity lifecycle through it. The lower-level modules ([`resolve`], [`builder`],
//! [`archive`]) can be used directly as well.

pub mod archive;
pub mod builder;
pub mod bundle;
pub mod contract;
pub mod error;
pub mod publish;
pub mod resolve;
pub mod series;
pub mod settings;
pub mod store;
pub mod template;
