//! Per-direction endpoint subscription table.
//!
//! Maps external endpoint names to a "subscribed" flag. The table reflects the
//! requested state, not what the transport managed to connect.

use smallvec::SmallVec;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionTable {
    ports: BTreeMap<String, bool>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the table from a refreshed endpoint list.
    ///
    /// Endpoints that vanished are dropped, new ones start unsubscribed, and
    /// an endpoint that survives keeps its previous selection.
    pub fn reconcile<I, S>(&mut self, current: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let previous = std::mem::take(&mut self.ports);
        self.ports = current
            .into_iter()
            .map(|name| {
                let name = name.into();
                let selected = previous.get(&name).copied().unwrap_or(false);
                (name, selected)
            })
            .collect();
    }

    /// Unknown names are inserted.
    pub fn set(&mut self, name: &str, subscribed: bool) {
        match self.ports.get_mut(name) {
            Some(flag) => *flag = subscribed,
            None => {
                self.ports.insert(name.to_owned(), subscribed);
            }
        }
    }

    pub fn is_subscribed(&self, name: &str) -> bool {
        self.ports.get(name).copied().unwrap_or(false)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Subscribed endpoint names in table order.
    pub fn subscribed(&self) -> SmallVec<[String; 8]> {
        self.ports
            .iter()
            .filter(|(_, subscribed)| **subscribed)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.ports.iter().map(|(name, subscribed)| (name.as_str(), *subscribed))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Owned snapshot for observers and UI code.
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        self.ports.clone()
    }
}
