/// Carried items and key counters.
///
/// Items are kept newest-first. Picking up past capacity makes the carrier
/// drop its oldest (last) item; cycling moves the last item to the front.

use serde::Serialize;
use smallvec::SmallVec;

use super::kind::{ActorKind, KeyColor};
use super::tags::TagRules;

pub const ITEM_MAX: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub items: SmallVec<[ActorKind; ITEM_MAX]>,
    /// Indexed by `KeyColor::index()`.
    pub keys: [u8; 4],
}

impl Inventory {
    #[inline]
    pub fn keys_of(&self, color: KeyColor) -> u8 {
        self.keys[color.index()]
    }

    #[inline]
    pub fn has_key(&self, color: KeyColor) -> bool {
        self.keys_of(color) > 0
    }

    pub fn add_key(&mut self, color: KeyColor) {
        let k = &mut self.keys[color.index()];
        *k = k.saturating_add(1);
    }

    /// Spends one key. Returns false when none was held.
    pub fn take_key(&mut self, color: KeyColor) -> bool {
        let k = &mut self.keys[color.index()];
        if *k == 0 { return false; }
        *k -= 1;
        true
    }

    pub fn has_item(&self, kind: ActorKind) -> bool {
        self.items.contains(&kind)
    }

    /// Adds to the front. Returns true when the carrier is now over
    /// capacity and has to drop something.
    pub fn push_item(&mut self, kind: ActorKind) -> bool {
        self.items.insert(0, kind);
        self.items.len() > ITEM_MAX
    }

    /// The item a drop would release.
    #[inline]
    pub fn last_item(&self) -> Option<ActorKind> {
        self.items.last().copied()
    }

    pub fn pop_last(&mut self) -> Option<ActorKind> {
        self.items.pop()
    }

    pub fn cycle(&mut self) {
        if self.items.len() > 1 {
            self.items.rotate_right(1);
        }
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    pub fn clear_keys(&mut self) {
        self.keys = [0; 4];
    }

    /// Tag rules contributed by everything carried.
    pub fn carrier_rules(&self) -> TagRules {
        self.items.iter().fold(TagRules::NONE, |acc, item| acc.union(item.carrier_rules()))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.keys.iter().all(|&k| k == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tags::{Tag, TagSet};

    #[test]
    fn newest_first_and_overflow_reports() {
        let mut inv = Inventory::default();
        for k in [ActorKind::BootWater, ActorKind::BootFire, ActorKind::BootIce, ActorKind::Helmet] {
            assert!(!inv.push_item(k));
        }
        assert_eq!(inv.items[0], ActorKind::Helmet);
        assert!(inv.push_item(ActorKind::Hook));
        assert_eq!(inv.last_item(), Some(ActorKind::BootWater));
        assert_eq!(inv.pop_last(), Some(ActorKind::BootWater));
        assert_eq!(inv.items.len(), ITEM_MAX);
        assert_eq!(inv.items[0], ActorKind::Hook);
    }

    #[test]
    fn cycle_brings_last_to_front() {
        let mut inv = Inventory::default();
        inv.push_item(ActorKind::BootWater);
        inv.push_item(ActorKind::BootFire);
        inv.push_item(ActorKind::BootIce);
        // [ice, fire, water]
        inv.cycle();
        assert_eq!(inv.items.as_slice(), &[ActorKind::BootWater, ActorKind::BootIce, ActorKind::BootFire]);
        assert_eq!(inv.last_item(), Some(ActorKind::BootFire));
    }

    #[test]
    fn keys_count_and_spend() {
        let mut inv = Inventory::default();
        assert!(!inv.take_key(KeyColor::Red));
        inv.add_key(KeyColor::Red);
        inv.add_key(KeyColor::Red);
        assert_eq!(inv.keys_of(KeyColor::Red), 2);
        assert!(inv.take_key(KeyColor::Red));
        assert!(inv.has_key(KeyColor::Red));
        assert!(!inv.has_key(KeyColor::Blue));
    }

    #[test]
    fn carried_boots_fold_into_rules() {
        let mut inv = Inventory::default();
        inv.push_item(ActorKind::BootWater);
        inv.push_item(ActorKind::Helmet);
        let rules = inv.carrier_rules();
        assert!(rules.ignore.matches(TagSet::of(&[Tag::Water])));
        assert!(rules.tags.contains(Tag::IgnoreDefaultMonsterKill));
    }
}
