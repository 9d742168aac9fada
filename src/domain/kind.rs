/// The actor catalogue.
///
/// One variant per type id. Everything static about a kind (layer, tags,
/// speed, wire behaviour, which button colours it listens to) is answered
/// here by `match`, so the per-kind hooks in `sim::behavior` only carry
/// behaviour, never data.

use serde::{Serialize, Serializer};

use super::tags::{Tag, TagRule, TagRules, TagSet};
use super::tile::Layer;
use super::wires::{GateKind, WireOverlapMode};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ActorKind {
    // ── Playables ──
    Chip,
    Melinda,

    // ── Monsters ──
    Centipede,
    Ant,
    Glider,
    Fireball,
    Ball,
    TeethRed,
    TankBlue,
    TankYellow,
    Blob,
    Walker,
    TntLit,

    // ── Blocks ──
    DirtBlock,
    IceBlock,

    // ── Animations ──
    Explosion,
    Splash,

    // ── Terrain ──
    Floor,
    Wall,
    SteelWall,
    Ice,
    IceCorner,
    ForceFloor,
    ForceFloorRandom,
    PopupWall,
    Void,
    Water,
    Dirt,
    Gravel,
    Exit,
    EChipGate,
    Hint,
    Fire,
    ThiefTool,
    ThiefKey,
    Trap,
    CloneMachine,
    Turtle,
    Slime,
    FlameJet,
    ToggleWall,
    DoorRed,
    DoorBlue,
    DoorYellow,
    DoorGreen,
    AppearingWall,
    InvisibleWall,
    BlueWall,
    GreenWall,
    Swivel,
    SwivelRotatingPart,
    ThinWall,

    // ── Buttons and switches ──
    ButtonGreen,
    ButtonBlue,
    ButtonYellow,
    ButtonRed,
    ButtonBrown,
    ButtonOrange,
    ButtonPink,
    ToggleSwitch,

    // ── Teleports ──
    TeleportBlue,
    TeleportRed,
    TeleportGreen,
    TeleportYellow,

    // ── Logic gates ──
    GateNot,
    GateAnd,
    GateOr,
    GateXor,
    GateNand,
    GateLatch,
    GateLatchMirror,
    GateCounter,

    // ── Items ──
    EChip,
    EChipPlus,
    KeyRed,
    KeyBlue,
    KeyYellow,
    KeyGreen,
    BootWater,
    BootFire,
    BootIce,
    BootForceFloor,
    BootDirt,
    Helmet,
    BonusFlag,
    Tnt,
    SecretEye,
    Hook,
    GoronBraslet,
    Bomb,
    GreenBomb,
    NoSign,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum KeyColor {
    Red,
    Blue,
    Yellow,
    Green,
}

impl KeyColor {
    pub const ALL: [KeyColor; 4] = [KeyColor::Red, KeyColor::Blue, KeyColor::Yellow, KeyColor::Green];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Tag that lets a carrier keep the key after opening a door.
    pub fn reuse_tag(self) -> Tag {
        match self {
            KeyColor::Red => Tag::CanReuseKeyRed,
            KeyColor::Blue => Tag::CanReuseKeyBlue,
            KeyColor::Yellow => Tag::CanReuseKeyYellow,
            KeyColor::Green => Tag::CanReuseKeyGreen,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum ButtonColor {
    Green,
    Blue,
    Yellow,
    Red,
    Brown,
    Orange,
}

/// Where a picked-up item goes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ItemDestination {
    Key(KeyColor),
    Inventory,
    /// Consumed on pickup (chips, bonus flags).
    Consumed,
}

/// Typed state decoded from a custom data string.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CustomState {
    pub toggled: bool,
    pub counter: u32,
}

const MONSTER_TAGS: TagSet = TagSet::of(&[Tag::AutonomousMonster, Tag::NormalMonster, Tag::Movable]);
const LOOSE_TERRAIN_BLOCK: TagRule = TagRule::any(&[Tag::NormalMonster, Tag::Cc1Block]);

const fn tagged(tags: &[Tag]) -> TagRules {
    TagRules { tags: TagSet::of(tags), ..TagRules::NONE }
}

const fn blocking(block: &[Tag]) -> TagRules {
    TagRules { block: TagRule::any(block), ..TagRules::NONE }
}

const ALL_KINDS: &[ActorKind] = {
    use ActorKind::*;
    &[
        Chip, Melinda, Centipede, Ant, Glider, Fireball, Ball, TeethRed, TankBlue, TankYellow, Blob, Walker,
        TntLit, DirtBlock, IceBlock, Explosion, Splash, Floor, Wall, SteelWall, Ice, IceCorner, ForceFloor,
        ForceFloorRandom, PopupWall, Void, Water, Dirt, Gravel, Exit, EChipGate, Hint, Fire, ThiefTool,
        ThiefKey, Trap, CloneMachine, Turtle, Slime, FlameJet, ToggleWall, DoorRed, DoorBlue, DoorYellow,
        DoorGreen, AppearingWall, InvisibleWall, BlueWall, GreenWall, Swivel, SwivelRotatingPart, ThinWall,
        ButtonGreen, ButtonBlue, ButtonYellow, ButtonRed, ButtonBrown, ButtonOrange, ButtonPink,
        ToggleSwitch, TeleportBlue, TeleportRed, TeleportGreen, TeleportYellow, GateNot, GateAnd, GateOr,
        GateXor, GateNand, GateLatch, GateLatchMirror, GateCounter, EChip, EChipPlus, KeyRed, KeyBlue,
        KeyYellow, KeyGreen, BootWater, BootFire, BootIce, BootForceFloor, BootDirt, Helmet, BonusFlag, Tnt,
        SecretEye, Hook, GoronBraslet, Bomb, GreenBomb, NoSign,
    ]
};

impl ActorKind {
    pub fn all() -> &'static [ActorKind] {
        ALL_KINDS
    }

    /// Stable type id used by level descriptions and snapshots.
    pub fn id(self) -> &'static str {
        use ActorKind::*;
        match self {
            Chip => "chip",
            Melinda => "melinda",
            Centipede => "centipede",
            Ant => "ant",
            Glider => "glider",
            Fireball => "fireball",
            Ball => "ball",
            TeethRed => "teethRed",
            TankBlue => "tankBlue",
            TankYellow => "tankYellow",
            Blob => "blob",
            Walker => "walker",
            TntLit => "tntLit",
            DirtBlock => "dirtBlock",
            IceBlock => "iceBlock",
            Explosion => "explosionAnim",
            Splash => "splashAnim",
            Floor => "floor",
            Wall => "wall",
            SteelWall => "steelWall",
            Ice => "ice",
            IceCorner => "iceCorner",
            ForceFloor => "forceFloor",
            ForceFloorRandom => "forceFloorRandom",
            PopupWall => "popupWall",
            Void => "void",
            Water => "water",
            Dirt => "dirt",
            Gravel => "gravel",
            Exit => "exit",
            EChipGate => "echipGate",
            Hint => "hint",
            Fire => "fire",
            ThiefTool => "thiefTool",
            ThiefKey => "thiefKey",
            Trap => "trap",
            CloneMachine => "cloneMachine",
            Turtle => "turtle",
            Slime => "slime",
            FlameJet => "flameJet",
            ToggleWall => "toggleWall",
            DoorRed => "doorRed",
            DoorBlue => "doorBlue",
            DoorYellow => "doorYellow",
            DoorGreen => "doorGreen",
            AppearingWall => "appearingWall",
            InvisibleWall => "invisibleWall",
            BlueWall => "blueWall",
            GreenWall => "greenWall",
            Swivel => "swivel",
            SwivelRotatingPart => "swivelRotatingPart",
            ThinWall => "thinWall",
            ButtonGreen => "buttonGreen",
            ButtonBlue => "buttonBlue",
            ButtonYellow => "buttonYellow",
            ButtonRed => "buttonRed",
            ButtonBrown => "buttonBrown",
            ButtonOrange => "buttonOrange",
            ButtonPink => "buttonPink",
            ToggleSwitch => "toggleSwitch",
            TeleportBlue => "teleportBlue",
            TeleportRed => "teleportRed",
            TeleportGreen => "teleportGreen",
            TeleportYellow => "teleportYellow",
            GateNot => "gateNot",
            GateAnd => "gateAnd",
            GateOr => "gateOr",
            GateXor => "gateXor",
            GateNand => "gateNand",
            GateLatch => "gateLatch",
            GateLatchMirror => "gateLatchMirror",
            GateCounter => "gateCounter",
            EChip => "echip",
            EChipPlus => "echipPlus",
            KeyRed => "keyRed",
            KeyBlue => "keyBlue",
            KeyYellow => "keyYellow",
            KeyGreen => "keyGreen",
            BootWater => "bootWater",
            BootFire => "bootFire",
            BootIce => "bootIce",
            BootForceFloor => "bootForceFloor",
            BootDirt => "bootDirt",
            Helmet => "helmet",
            BonusFlag => "bonusFlag",
            Tnt => "tnt",
            SecretEye => "secretEye",
            Hook => "hook",
            GoronBraslet => "goronBraslet",
            Bomb => "bomb",
            GreenBomb => "greenBomb",
            NoSign => "noSign",
        }
    }

    pub fn from_id(id: &str) -> Option<ActorKind> {
        ALL_KINDS.iter().copied().find(|k| k.id() == id)
    }

    pub fn layer(self) -> Layer {
        use ActorKind::*;
        match self {
            Chip | Melinda | Centipede | Ant | Glider | Fireball | Ball | TeethRed | TankBlue | TankYellow
            | Blob | Walker | TntLit | DirtBlock | IceBlock | Explosion | Splash => Layer::Movable,
            SwivelRotatingPart | ThinWall => Layer::Special,
            NoSign => Layer::ItemMod,
            EChip | EChipPlus | KeyRed | KeyBlue | KeyYellow | KeyGreen | BootWater | BootFire | BootIce
            | BootForceFloor | BootDirt | Helmet | BonusFlag | Tnt | SecretEye | Hook | GoronBraslet | Bomb
            | GreenBomb => Layer::Item,
            _ => Layer::Terrain,
        }
    }

    /// Subticks per tile, before speed modifiers, divided by three.
    pub fn move_speed(self) -> u32 {
        match self {
            ActorKind::Blob => 8,
            _ => 4,
        }
    }

    /// Own tag rules, before carried items are folded in.
    pub fn tag_rules(self) -> TagRules {
        use ActorKind::*;
        match self {
            Chip => TagRules {
                tags: TagSet::of(&[Tag::Playable, Tag::Chip, Tag::CanReuseKeyGreen, Tag::ScaresTeethBlue]),
                push: TagRule::any(&[Tag::Block]),
                ..TagRules::NONE
            },
            Melinda => TagRules {
                tags: TagSet::of(&[Tag::Playable, Tag::Melinda, Tag::CanReuseKeyYellow, Tag::ScaresTeethRed]),
                push: TagRule::any(&[Tag::Block]),
                ignore: TagRule::any(&[Tag::Ice]),
                ..TagRules::NONE
            },
            Glider => TagRules { tags: MONSTER_TAGS, ignore: TagRule::any(&[Tag::Water]), ..TagRules::NONE },
            Fireball => TagRules {
                tags: MONSTER_TAGS.union(TagSet::of(&[Tag::Melting])),
                ignore: TagRule::any(&[Tag::Fire]),
                ..TagRules::NONE
            },
            Blob => TagRules { tags: MONSTER_TAGS, immune: TagRule::any(&[Tag::Slime]), ..TagRules::NONE },
            Centipede | Ant | Ball | TeethRed | TankBlue | TankYellow | Walker => tagged_set(MONSTER_TAGS),
            TntLit => tagged(&[Tag::NormalMonster, Tag::Movable, Tag::Cc1Block, Tag::Tnt]),
            DirtBlock => TagRules {
                tags: TagSet::of(&[Tag::Block, Tag::Cc1Block, Tag::Movable]),
                ignore: TagRule::any(&[Tag::Fire]),
                ..TagRules::NONE
            },
            IceBlock => TagRules {
                tags: TagSet::of(&[Tag::Block, Tag::Cc2Block, Tag::Movable, Tag::CanStandOnItems]),
                push: TagRule::any(&[Tag::Cc2Block]),
                ..TagRules::NONE
            },
            Explosion | Splash => TagRules {
                tags: TagSet::of(&[Tag::Animation]),
                block: TagRule::any(&[Tag::Playable]),
                ignore: TagRule::not(&[Tag::Playable]),
                ..TagRules::NONE
            },
            Ice | IceCorner => tagged(&[Tag::Ice]),
            ForceFloor | ForceFloorRandom => tagged(&[Tag::ForceFloor]),
            PopupWall => TagRules { block: TagRule::not(&[Tag::Playable]), ..TagRules::NONE },
            Water => tagged(&[Tag::Water]),
            Dirt => TagRules {
                tags: TagSet::of(&[Tag::Filth]),
                block: TagRule::any(&[Tag::Cc1Block, Tag::NormalMonster, Tag::Melinda]),
                ..TagRules::NONE
            },
            Gravel => TagRules {
                tags: TagSet::of(&[Tag::Filth]),
                block: TagRule::any(&[Tag::NormalMonster, Tag::Melinda]),
                ..TagRules::NONE
            },
            Exit | Hint | ThiefTool | ThiefKey => TagRules { block: LOOSE_TERRAIN_BLOCK, ..TagRules::NONE },
            EChipGate => TagRules {
                block: TagRule::any(&[Tag::NormalMonster, Tag::Block]),
                immune: TagRule::any(&[Tag::Tnt]),
                ..TagRules::NONE
            },
            Fire => TagRules {
                tags: TagSet::of(&[Tag::Fire, Tag::Melting]),
                block: TagRule::any(&[Tag::AutonomousMonster]),
                ..TagRules::NONE
            },
            CloneMachine => blocking(&[Tag::Cc1Block, Tag::NormalMonster, Tag::Playable]),
            Turtle => TagRules {
                tags: TagSet::of(&[Tag::BlocksGhost]),
                block: TagRule::any(&[Tag::Melting]),
                ..TagRules::NONE
            },
            Slime => tagged(&[Tag::Slime]),
            Wall | BlueWall | GreenWall => tagged(&[Tag::Wall]),
            SteelWall | SwivelRotatingPart => TagRules { immune: TagRule::any(&[Tag::Tnt]), ..TagRules::NONE },
            DoorRed | DoorBlue | DoorYellow | DoorGreen => TagRules {
                tags: TagSet::of(&[Tag::Door]),
                block: TagRule::any(&[Tag::NormalMonster]),
                ..TagRules::NONE
            },
            ThinWall => tagged(&[Tag::ThinWall]),
            Bomb | GreenBomb => tagged(&[Tag::Bomb]),
            KeyRed => TagRules {
                tags: TagSet::of(&[Tag::Item]),
                ignore: TagRule::not(&[Tag::Playable]),
                ..TagRules::NONE
            },
            k if k.is_pickup_item() => tagged(&[Tag::Item]),
            _ => TagRules::NONE,
        }
    }

    /// Rules added to whoever carries this item.
    pub fn carrier_rules(self) -> TagRules {
        use ActorKind::*;
        match self {
            BootWater => TagRules { ignore: TagRule::any(&[Tag::Water]), ..TagRules::NONE },
            BootFire => TagRules { ignore: TagRule::any(&[Tag::Fire]), ..TagRules::NONE },
            BootIce => TagRules { ignore: TagRule::any(&[Tag::Ice]), ..TagRules::NONE },
            BootForceFloor => TagRules { ignore: TagRule::any(&[Tag::ForceFloor]), ..TagRules::NONE },
            BootDirt => TagRules { collision_ignore: TagRule::any(&[Tag::Filth]), ..TagRules::NONE },
            GoronBraslet => TagRules { push: TagRule::any(&[Tag::Wall]), ..TagRules::NONE },
            Helmet => tagged(&[Tag::IgnoreDefaultMonsterKill]),
            SecretEye => tagged(&[Tag::CanSeeSecrets]),
            Hook => tagged(&[Tag::Pulling]),
            _ => TagRules::NONE,
        }
    }

    // ── Classification ──

    #[inline]
    pub fn is_playable(self) -> bool {
        matches!(self, ActorKind::Chip | ActorKind::Melinda)
    }

    pub fn is_monster(self) -> bool {
        use ActorKind::*;
        matches!(
            self,
            Centipede | Ant | Glider | Fireball | Ball | TeethRed | TankBlue | TankYellow | Blob | Walker | TntLit
        )
    }

    #[inline]
    pub fn is_block(self) -> bool {
        matches!(self, ActorKind::DirtBlock | ActorKind::IceBlock)
    }

    #[inline]
    pub fn is_animation(self) -> bool {
        matches!(self, ActorKind::Explosion | ActorKind::Splash)
    }

    /// Items picked up on completely joining their tile.
    pub fn is_pickup_item(self) -> bool {
        self.item_destination().is_some()
    }

    pub fn item_destination(self) -> Option<ItemDestination> {
        use ActorKind::*;
        match self {
            KeyRed => Some(ItemDestination::Key(KeyColor::Red)),
            KeyBlue => Some(ItemDestination::Key(KeyColor::Blue)),
            KeyYellow => Some(ItemDestination::Key(KeyColor::Yellow)),
            KeyGreen => Some(ItemDestination::Key(KeyColor::Green)),
            EChip | EChipPlus | BonusFlag => Some(ItemDestination::Consumed),
            BootWater | BootFire | BootIce | BootForceFloor | BootDirt | Helmet | Tnt | SecretEye | Hook
            | GoronBraslet => Some(ItemDestination::Inventory),
            _ => None,
        }
    }

    pub fn key_color(self) -> Option<KeyColor> {
        match self.item_destination() {
            Some(ItemDestination::Key(c)) => Some(c),
            _ => None,
        }
    }

    pub fn door_color(self) -> Option<KeyColor> {
        match self {
            ActorKind::DoorRed => Some(KeyColor::Red),
            ActorKind::DoorBlue => Some(KeyColor::Blue),
            ActorKind::DoorYellow => Some(KeyColor::Yellow),
            ActorKind::DoorGreen => Some(KeyColor::Green),
            _ => None,
        }
    }

    #[inline]
    pub fn is_teleport(self) -> bool {
        use ActorKind::*;
        matches!(self, TeleportBlue | TeleportRed | TeleportGreen | TeleportYellow)
    }

    pub fn gate_kind(self) -> Option<GateKind> {
        use ActorKind::*;
        match self {
            GateNot => Some(GateKind::Not),
            GateAnd => Some(GateKind::And),
            GateOr => Some(GateKind::Or),
            GateXor => Some(GateKind::Xor),
            GateNand => Some(GateKind::Nand),
            GateLatch => Some(GateKind::Latch),
            GateLatchMirror => Some(GateKind::LatchMirror),
            GateCounter => Some(GateKind::Counter),
            _ => None,
        }
    }

    /// Runs the decision phase every subtick.
    pub fn is_deciding(self) -> bool {
        self.layer() == Layer::Movable || self == ActorKind::InvisibleWall
    }

    /// Blocks every actor trying to enter, regardless of tags.
    pub fn blocks_everything(self) -> bool {
        use ActorKind::*;
        self.is_playable()
            || self.is_monster()
            || self.is_block()
            || self.gate_kind().is_some()
            || matches!(self, Wall | SteelWall | InvisibleWall | AppearingWall)
    }

    // ── Wires ──

    pub fn wire_mode(self) -> WireOverlapMode {
        use ActorKind::*;
        match self {
            Floor => WireOverlapMode::Cross,
            SteelWall => WireOverlapMode::AlwaysCross,
            ButtonPink | ToggleSwitch => WireOverlapMode::Everywhere,
            TeleportBlue => WireOverlapMode::Overlap,
            Trap | CloneMachine | FlameJet | TeleportRed => WireOverlapMode::Read,
            k if k.gate_kind().is_some() => WireOverlapMode::Overlap,
            _ => WireOverlapMode::None,
        }
    }

    /// Drives power into its circuits.
    pub fn provides_power(self) -> bool {
        matches!(self, ActorKind::ButtonPink | ActorKind::ToggleSwitch) || self.gate_kind().is_some()
    }

    /// Reacts to the power state of its tile after each propagation pass.
    pub fn is_wire_consumer(self) -> bool {
        matches!(self, ActorKind::Trap | ActorKind::CloneMachine | ActorKind::FlameJet)
    }

    // ── Buttons ──

    /// Colour of button this kind is, if any.
    pub fn button_color(self) -> Option<ButtonColor> {
        use ActorKind::*;
        match self {
            ButtonGreen => Some(ButtonColor::Green),
            ButtonBlue => Some(ButtonColor::Blue),
            ButtonYellow => Some(ButtonColor::Yellow),
            ButtonRed => Some(ButtonColor::Red),
            ButtonBrown => Some(ButtonColor::Brown),
            ButtonOrange => Some(ButtonColor::Orange),
            _ => None,
        }
    }

    pub fn cares_about(self, color: ButtonColor) -> bool {
        use ActorKind::*;
        matches!(
            (self, color),
            (ToggleWall | GreenBomb, ButtonColor::Green)
                | (TankBlue, ButtonColor::Blue)
                | (TankYellow, ButtonColor::Yellow)
                | (CloneMachine, ButtonColor::Red)
                | (Trap, ButtonColor::Brown)
                | (FlameJet, ButtonColor::Orange)
        )
    }

    // ── Custom data ──

    /// Decodes the custom data string. `None` when it is malformed for
    /// this kind.
    pub fn parse_custom(self, custom: &str) -> Option<CustomState> {
        use ActorKind::*;
        let flag = |on: &str, off: &str| match custom {
            "" => Some(CustomState::default()),
            s if s == on => Some(CustomState { toggled: true, counter: 0 }),
            s if s == off => Some(CustomState::default()),
            _ => None,
        };
        match self {
            ToggleWall | FlameJet | ToggleSwitch => flag("on", "off"),
            GreenBomb => flag("bomb", "echip"),
            BlueWall | GreenWall => flag("real", "fake"),
            BonusFlag => {
                if custom.is_empty() {
                    return Some(CustomState::default());
                }
                let (toggled, digits) = match custom.strip_prefix('*') {
                    Some(rest) => (true, rest),
                    None => (false, custom),
                };
                digits.parse::<u32>().ok().map(|counter| CustomState { toggled, counter })
            }
            GateCounter => {
                if custom.is_empty() {
                    return Some(CustomState::default());
                }
                match custom.parse::<u32>() {
                    Ok(n) if n <= 9 => Some(CustomState { toggled: false, counter: n }),
                    _ => None,
                }
            }
            _ => Some(CustomState::default()),
        }
    }
}

const fn tagged_set(tags: TagSet) -> TagRules {
    TagRules { tags, ..TagRules::NONE }
}

impl Serialize for ActorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}
