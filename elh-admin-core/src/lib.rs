#![doc = "elh-admin-core: content model and operations for the English Language Helper admin tool."]

//! Everything here is independent of the database transport: operations talk
//! to a [`contract::DocumentStore`], which the CLI crate implements over the
//! Firestore REST API and tests replace with `MockDocumentStore`.

pub mod activity;
pub mod admin;
pub mod article;
pub mod contract;
pub mod credentials;
pub mod document;
pub mod error;
pub mod question;
pub mod value;
