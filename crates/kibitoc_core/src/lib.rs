//! Core logic for the kibitoc CLI: heading extraction, anchor slugs, and
//! idempotent table-of-contents splicing for Kibela notes, plus the thin
//! GraphQL collaborator that fetches and writes note bodies.

pub mod api;
pub mod config;
pub mod headings;
pub mod toc;
