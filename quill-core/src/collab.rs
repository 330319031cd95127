//! The outside world as the renderer sees it: who is asking, which pages
//! exist, and which optional features are switched on.

use std::collections::{BTreeMap, BTreeSet};

/// Read-only view of the caller's session.
pub trait Session {
    fn is_logged_in(&self) -> bool;
    fn is_admin(&self) -> bool;
    /// Empty for anonymous callers.
    fn username(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Session for Anonymous {
    fn is_logged_in(&self) -> bool {
        false
    }

    fn is_admin(&self) -> bool {
        false
    }

    fn username(&self) -> &str {
        ""
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub admin: bool,
}

impl User {
    pub fn new(name: impl Into<String>, admin: bool) -> Self {
        Self {
            name: name.into(),
            admin,
        }
    }
}

impl Session for User {
    fn is_logged_in(&self) -> bool {
        true
    }

    fn is_admin(&self) -> bool {
        self.admin
    }

    fn username(&self) -> &str {
        &self.name
    }
}

/// Source of the known page names. Order does not matter, the renderer
/// sorts them itself.
pub trait PageIndex {
    fn page_names(&self) -> Vec<String>;
}

impl PageIndex for [String] {
    fn page_names(&self) -> Vec<String> {
        self.to_vec()
    }
}

impl PageIndex for Vec<String> {
    fn page_names(&self) -> Vec<String> {
        self.clone()
    }
}

impl<T> PageIndex for BTreeMap<String, T> {
    fn page_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

/// The set of optional features that are active. Built once, after the
/// configuration is fully loaded.
#[derive(Debug, Clone, Default)]
pub struct Features {
    active: BTreeSet<String>,
}

impl Features {
    pub const SEARCH: &'static str = "search";
    pub const USER_PREFERENCES: &'static str = "feature-user-preferences";

    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }
}
