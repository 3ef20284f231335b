//! Uranio package identities
//!
//! The monorepo contains a fixed, closed set of packages, ordered by
//! dependency rank: `core` is the foundation, `api` depends on `core`,
//! `trx` on `api`, `adm` on `trx`. The consumer repo has exactly one of
//! them installed as its primary dependency (the "final" package).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One buildable unit within the Uranio monorepo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repo {
    Core,
    Api,
    Trx,
    Adm,
}

/// All packages, most foundational first
pub const ALL_REPOS: [Repo; 4] = [Repo::Core, Repo::Api, Repo::Trx, Repo::Adm];

impl Repo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Repo::Core => "core",
            Repo::Api => "api",
            Repo::Trx => "trx",
            Repo::Adm => "adm",
        }
    }

    /// Directory name of this package inside the monorepo.
    ///
    /// Doubles as the marker segment the path mapper splits on.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Repo::Core => "urn-core",
            Repo::Api => "urn-api",
            Repo::Trx => "urn-trx",
            Repo::Adm => "urn-adm",
        }
    }

    /// Name this package is mounted under inside the consumer's
    /// node_modules: the bare name for the final package, a prefixed
    /// name for its dependencies.
    pub fn node_modules_name(&self, is_final: bool) -> String {
        if is_final {
            "uranio".to_string()
        } else {
            format!("uranio-{}", self.as_str())
        }
    }

    fn rank(&self) -> usize {
        match self {
            Repo::Core => 0,
            Repo::Api => 1,
            Repo::Trx => 2,
            Repo::Adm => 3,
        }
    }

    /// Ordered list of packages to watch for this identity: every
    /// package it depends on first, then the identity itself flagged
    /// as final.
    pub fn sync_chain(&self) -> Vec<(Repo, bool)> {
        let mut chain: Vec<(Repo, bool)> = ALL_REPOS
            .iter()
            .filter(|r| r.rank() < self.rank())
            .map(|r| (*r, false))
            .collect();
        chain.push((*self, true));
        chain
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
