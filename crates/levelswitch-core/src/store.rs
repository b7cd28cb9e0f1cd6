//! Ordered rule storage
//!
//! The store keeps rules in user order; order is priority (the first
//! matching rule wins). Rules are identified by their [`RuleId`]. The
//! key-based lookups (`find_by_display_key`, `find_by_audio_source_and_threshold`)
//! exist for list-widget sync and the editor's add-or-edit decision.

use crate::handle::{HandleResolver, WeakHandle};
use crate::rule::{AudioRule, RuleId};

/// Ordered collection of audio rules
#[derive(Debug, Clone, PartialEq)]
pub struct RuleStore {
    rules: Vec<AudioRule>,
    next_id: RuleId,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a rule. Rules with id 0 get a fresh id.
    pub fn add(&mut self, mut rule: AudioRule) -> RuleId {
        if rule.id == 0 {
            rule.id = self.next_id;
            self.next_id += 1;
        } else if rule.id >= self.next_id {
            self.next_id = rule.id + 1;
        }
        let id = rule.id;
        self.rules.push(rule);
        id
    }

    /// Overwrite the rule at `index`, keeping the slot's id.
    ///
    /// Returns the id of the replaced rule, or `None` if `index` is out of range.
    pub fn replace_at(&mut self, index: usize, mut rule: AudioRule) -> Option<RuleId> {
        let slot = self.rules.get_mut(index)?;
        rule.id = slot.id;
        *slot = rule;
        Some(slot.id)
    }

    /// Index of the first rule watching `source` at `volume`.
    ///
    /// Handles compare by target. Thresholds compare within `tolerance`;
    /// a tolerance of 0 is exact equality.
    pub fn find_by_audio_source_and_threshold(
        &self,
        source: &WeakHandle,
        volume: f32,
        tolerance: f32,
    ) -> Option<usize> {
        self.rules.iter().position(|r| {
            r.audio_source == *source && (r.volume_threshold - volume).abs() <= tolerance
        })
    }

    /// Index of the first rule with the given display key
    pub fn find_by_display_key(&self, key: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.display_key == key)
    }

    /// Remove the first rule with the given display key
    pub fn remove_by_display_key(&mut self, key: &str) -> bool {
        match self.find_by_display_key(key) {
            Some(index) => {
                self.rules.remove(index);
                true
            }
            None => false,
        }
    }

    /// Swap the rule at `index` with the one before it
    pub fn move_up(&mut self, index: usize) -> bool {
        if index > 0 && index < self.rules.len() {
            self.rules.swap(index, index - 1);
            return true;
        }
        false
    }

    /// Swap the rule at `index` with the one after it
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 < self.rules.len() {
            self.rules.swap(index, index + 1);
            return true;
        }
        false
    }

    /// Remove every rule. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Swap in the rules of `other`, in order.
    ///
    /// Every incoming rule gets a fresh id from this store's counter.
    /// Returns the new ids.
    pub fn replace_all(&mut self, other: RuleStore) -> Vec<RuleId> {
        self.rules.clear();
        other
            .rules
            .into_iter()
            .map(|mut rule| {
                rule.id = 0;
                self.add(rule)
            })
            .collect()
    }

    /// Position of a rule by id
    pub fn position(&self, id: RuleId) -> Option<usize> {
        self.rules.iter().position(|r| r.id == id)
    }

    /// Get a rule by id
    pub fn get(&self, id: RuleId) -> Option<&AudioRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Get a mutable rule by id
    pub fn get_mut(&mut self, id: RuleId) -> Option<&mut AudioRule> {
        self.rules.iter_mut().find(|r| r.id == id)
    }

    /// Overwrite a rule by id, keeping its id and position
    pub fn update(&mut self, id: RuleId, rule: AudioRule) -> bool {
        match self.position(id) {
            Some(index) => self.replace_at(index, rule).is_some(),
            None => false,
        }
    }

    /// Remove a rule by id, keeping the order of the rest
    pub fn remove(&mut self, id: RuleId) -> Option<AudioRule> {
        self.position(id).map(|index| self.rules.remove(index))
    }

    /// Move a rule one slot towards the front
    pub fn move_rule_up(&mut self, id: RuleId) -> bool {
        match self.position(id) {
            Some(index) => self.move_up(index),
            None => false,
        }
    }

    /// Move a rule one slot towards the back
    pub fn move_rule_down(&mut self, id: RuleId) -> bool {
        match self.position(id) {
            Some(index) => self.move_down(index),
            None => false,
        }
    }

    /// Rebuild every display key from current host names
    pub fn refresh_display_keys(
        &mut self,
        resolver: &dyn HandleResolver,
        previous_scene_name: &str,
    ) {
        for rule in &mut self.rules {
            rule.refresh_display_key(resolver, previous_scene_name);
        }
    }

    /// All rules in order
    pub fn rules(&self) -> &[AudioRule] {
        &self.rules
    }

    /// Iterate rules in order
    pub fn iter(&self) -> std::slice::Iter<'_, AudioRule> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleStore {
    type Item = &'a AudioRule;
    type IntoIter = std::slice::Iter<'a, AudioRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
