use serde::{Deserialize, Serialize};

use stakeward_types::{Election, ElectionId};

/// Elections the node is tracking, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionRegistry {
    elections: Vec<Election>,
    #[serde(skip)]
    dirty: bool,
}

impl ElectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loaded snapshot, keeping the first record of any
    /// duplicated id.
    pub fn from_elections(elections: Vec<Election>) -> Self {
        let mut registry = Self::new();
        for election in elections {
            if registry.find(election.id()).is_some() {
                tracing::warn!(election_id = %election.id(), "dropping duplicate election record");
                continue;
            }
            registry.elections.push(election);
        }
        registry
    }

    pub fn find(&self, id: &ElectionId) -> Option<&Election> {
        self.elections.iter().find(|e| e.id() == id)
    }

    pub fn find_mut(&mut self, id: &ElectionId) -> Option<&mut Election> {
        let found = self.elections.iter_mut().find(|e| e.id() == id);
        if found.is_some() {
            self.dirty = true;
        }
        found
    }

    pub fn contains(&self, id: &ElectionId) -> bool {
        self.find(id).is_some()
    }

    /// Insert, or replace the record with the same id in place.
    pub fn add(&mut self, election: Election) {
        self.dirty = true;
        match self.elections.iter_mut().find(|e| e.id() == election.id()) {
            Some(existing) => *existing = election,
            None => self.elections.push(election),
        }
    }

    pub fn remove(&mut self, id: &ElectionId) -> Option<Election> {
        let pos = self.elections.iter().position(|e| e.id() == id)?;
        self.dirty = true;
        Some(self.elections.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Election> {
        self.elections.iter()
    }

    pub fn ids(&self) -> Vec<ElectionId> {
        self.elections.iter().map(|e| e.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.elections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elections.is_empty()
    }

    /// Whether anything changed since the last [`mark_clean`](Self::mark_clean).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeward_types::{Address, NanoTokens};

    fn election(id: &str) -> Election {
        Election::new(ElectionId::new(id), Address::new("-1:3333"))
    }

    #[test]
    fn add_replaces_same_id() {
        let mut reg = ElectionRegistry::new();
        reg.add(election("100"));
        let mut updated = election("100");
        updated.add_stake(NanoTokens::new(5));
        reg.add(updated);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.find(&"100".into()).unwrap().stake(), NanoTokens::new(5));
    }

    #[test]
    fn lookup_is_by_string() {
        let mut reg = ElectionRegistry::new();
        reg.add(election("0100"));
        assert!(reg.contains(&"0100".into()));
        assert!(!reg.contains(&"100".into()));
    }

    #[test]
    fn remove_returns_record() {
        let mut reg = ElectionRegistry::new();
        reg.add(election("1"));
        reg.add(election("2"));
        reg.mark_clean();
        assert!(reg.remove(&"3".into()).is_none());
        assert!(!reg.is_dirty());
        assert_eq!(reg.remove(&"1".into()).unwrap().id().as_str(), "1");
        assert!(reg.is_dirty());
        assert_eq!(reg.ids(), vec![ElectionId::new("2")]);
    }

    #[test]
    fn duplicates_in_snapshot_are_dropped() {
        let reg = ElectionRegistry::from_elections(vec![election("1"), election("1"), election("2")]);
        assert_eq!(reg.len(), 2);
        assert!(!reg.is_dirty());
    }

    #[test]
    fn find_mut_marks_dirty() {
        let mut reg = ElectionRegistry::from_elections(vec![election("1")]);
        reg.find_mut(&"1".into()).unwrap().set_restake(true);
        assert!(reg.is_dirty());
    }
}
