/// Interaction tags.
///
/// Tags form a closed enumeration with a stable bit each, packed into a
/// `u64`. Every actor carries seven tag categories; all but `tags` itself are
/// *rules* that test another actor's `tags`.
///
/// ## Rule semantics
///
/// A rule matches a tag set when the set contains any tag in `any`, or when
/// the set is missing any tag in `none_of`. The second half is the bitset
/// form of a negated tag: a rule written as "not playable" matches every
/// actor without the `Playable` tag.
///
/// | rule            | any        | none_of    | matches `{Playable}` | matches `{Block}` |
/// |-----------------|------------|------------|----------------------|-------------------|
/// | playable        | {Playable} | {}         | yes                  | no                |
/// | not playable    | {}         | {Playable} | no                   | yes               |

use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Tag {
    Playable,
    Chip,
    Melinda,
    CanReuseKeyRed,
    CanReuseKeyBlue,
    CanReuseKeyYellow,
    CanReuseKeyGreen,
    ScaresTeethBlue,
    ScaresTeethRed,
    AutonomousMonster,
    NormalMonster,
    Movable,
    Block,
    Cc1Block,
    Cc2Block,
    CanStandOnItems,
    CanPickupItems,
    Tnt,
    Melting,
    Fire,
    Water,
    Ice,
    ForceFloor,
    Filth,
    Slime,
    ClearsSlime,
    DiesInSlime,
    Bomb,
    Wall,
    ThinWall,
    Door,
    Item,
    BlocksGhost,
    IgnoreDefaultMonsterKill,
    CanSeeSecrets,
    Pulling,
    Animation,
}

impl Tag {
    #[inline]
    pub const fn bit(self) -> u64 {
        1u64 << (self as u8)
    }
}

/// Fixed-width tag bitset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub struct TagSet(pub u64);

impl TagSet {
    pub const EMPTY: TagSet = TagSet(0);

    pub const fn of(tags: &[Tag]) -> TagSet {
        let mut bits = 0u64;
        let mut i = 0;
        while i < tags.len() {
            bits |= tags[i].bit();
            i += 1;
        }
        TagSet(bits)
    }

    #[inline]
    pub fn contains(self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }

    #[inline]
    pub fn overlaps(self, other: TagSet) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn union(self, other: TagSet) -> TagSet {
        TagSet(self.0 | other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, tag: Tag) {
        self.0 |= tag.bit();
    }

    pub fn remove(&mut self, tag: Tag) {
        self.0 &= !tag.bit();
    }
}

/// A tag rule: positive tags plus negated tags.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct TagRule {
    pub any: TagSet,
    pub none_of: TagSet,
}

impl TagRule {
    pub const NONE: TagRule = TagRule { any: TagSet::EMPTY, none_of: TagSet::EMPTY };

    pub const fn any(tags: &[Tag]) -> TagRule {
        TagRule { any: TagSet::of(tags), none_of: TagSet::EMPTY }
    }

    pub const fn not(tags: &[Tag]) -> TagRule {
        TagRule { any: TagSet::EMPTY, none_of: TagSet::of(tags) }
    }

    #[inline]
    pub fn matches(self, tags: TagSet) -> bool {
        tags.overlaps(self.any) || (self.none_of.0 & !tags.0) != 0
    }

    #[inline]
    pub fn union(self, other: TagRule) -> TagRule {
        TagRule { any: self.any.union(other.any), none_of: self.none_of.union(other.none_of) }
    }
}

/// The seven tag categories of an actor.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct TagRules {
    /// Tags this actor can push.
    pub push: TagRule,
    /// The actor's own tags.
    pub tags: TagSet,
    /// Tags this actor blocks.
    pub block: TagRule,
    /// Tags this actor is blocked by.
    pub blocked_by: TagRule,
    /// Tags this actor refuses to be blocked by.
    pub collision_ignore: TagRule,
    /// Tags this actor will not interact with at all.
    pub ignore: TagRule,
    /// Tags this actor cannot be destroyed by.
    pub immune: TagRule,
}

impl TagRules {
    pub const NONE: TagRules = TagRules {
        push: TagRule::NONE,
        tags: TagSet::EMPTY,
        block: TagRule::NONE,
        blocked_by: TagRule::NONE,
        collision_ignore: TagRule::NONE,
        ignore: TagRule::NONE,
        immune: TagRule::NONE,
    };

    /// Category-wise OR, used to fold carried items into the complete tags.
    pub fn union(self, other: TagRules) -> TagRules {
        TagRules {
            push: self.push.union(other.push),
            tags: self.tags.union(other.tags),
            block: self.block.union(other.block),
            blocked_by: self.blocked_by.union(other.blocked_by),
            collision_ignore: self.collision_ignore.union(other.collision_ignore),
            ignore: self.ignore.union(other.ignore),
            immune: self.immune.union(other.immune),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: TagSet = TagSet::of(&[Tag::Playable, Tag::Chip]);
    const BLOCK: TagSet = TagSet::of(&[Tag::Block, Tag::Cc1Block, Tag::Movable]);

    #[test]
    fn positive_rule() {
        let rule = TagRule::any(&[Tag::Playable]);
        assert!(rule.matches(PLAYER));
        assert!(!rule.matches(BLOCK));
    }

    #[test]
    fn negated_rule() {
        let rule = TagRule::not(&[Tag::Playable]);
        assert!(!rule.matches(PLAYER));
        assert!(rule.matches(BLOCK));
        // An actor without tags lacks Playable too
        assert!(rule.matches(TagSet::EMPTY));
    }

    #[test]
    fn empty_rule_never_matches() {
        assert!(!TagRule::NONE.matches(PLAYER));
        assert!(!TagRule::NONE.matches(TagSet::EMPTY));
    }

    #[test]
    fn union_folds_carrier_rules() {
        let own = TagRules { tags: PLAYER, ..TagRules::NONE };
        let boots = TagRules { ignore: TagRule::any(&[Tag::Water]), ..TagRules::NONE };
        let complete = own.union(boots);
        assert!(complete.tags.contains(Tag::Chip));
        assert!(complete.ignore.matches(TagSet::of(&[Tag::Water])));
    }

    #[test]
    fn all_tags_fit_in_u64() {
        assert!((Tag::Animation as u8) < 64);
    }
}
