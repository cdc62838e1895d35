//! Serde types matching Plane API response and request shapes.
//!
//! Entities themselves deserialize straight into `EntityRef`; these are the
//! wrappers around them.

use serde::{Deserialize, Serialize};

/// A list endpoint's body: either a paging envelope or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiList<T> {
  Paged { results: Vec<T> },
  Bare(Vec<T>),
}

impl<T> ApiList<T> {
  pub fn into_vec(self) -> Vec<T> {
    match self {
      Self::Paged { results } => results,
      Self::Bare(items) => items,
    }
  }
}

/// Body for adding issues to a cycle or module
#[derive(Debug, Serialize)]
pub struct ApiIssueIds<'a> {
  pub issues: Vec<&'a str>,
}
