use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    Prep,
    Game,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[Phase::Start, Phase::Prep, Phase::Game]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The phase that follows a completed run of `self`.
    ///
    /// Game has no successor: a completed Game program is reset and run
    /// again, which is what keeps the agent cycling fuel into the brazier.
    pub fn transition(self) -> Phase {
        match self {
            Phase::Start => Phase::Prep,
            Phase::Prep => Phase::Game,
            Phase::Game => Phase::Game,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Prep => "prep",
            Phase::Game => "game",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::error::BrazierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Phase::Start),
            "prep" => Ok(Phase::Prep),
            "game" => Ok(Phase::Game),
            _ => Err(crate::error::BrazierError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// WorldPoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub plane: u8,
}

impl WorldPoint {
    pub const fn new(x: i32, y: i32, plane: u8) -> Self {
        Self { x, y, plane }
    }

    /// Chebyshev distance in tiles. Points on different planes are never close.
    pub fn distance(self, other: WorldPoint) -> u32 {
        if self.plane != other.plane {
            return u32::MAX;
        }
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Move up to `max_step` tiles along each axis toward `target`.
    pub fn step_toward(self, target: WorldPoint, max_step: i32) -> WorldPoint {
        let max = i64::from(max_step.max(0));
        // The result lies between `from` and `to`, so it fits back into i32.
        let axis = |from: i32, to: i32| {
            let delta = (i64::from(to) - i64::from(from)).clamp(-max, max);
            (i64::from(from) + delta) as i32
        };
        WorldPoint {
            x: axis(self.x, target.x),
            y: axis(self.y, target.y),
            plane: target.plane,
        }
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.plane)
    }
}

// ---------------------------------------------------------------------------
// Skill
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Woodcutting,
    Firemaking,
    Fletching,
}

impl Skill {
    pub fn all() -> &'static [Skill] {
        &[Skill::Woodcutting, Skill::Firemaking, Skill::Fletching]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Skill::Woodcutting => "woodcutting",
            Skill::Firemaking => "firemaking",
            Skill::Fletching => "fletching",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Knife,
    Tinderbox,
    Hammer,
    BronzeAxe,
    IronAxe,
    SteelAxe,
    BlackAxe,
    MithrilAxe,
    AdamantAxe,
    RuneAxe,
    DragonAxe,
    InfernalAxe,
    CrystalAxe,
    BrumaRoot,
    BrumaKindling,
    BrumaHerb,
    UnfinishedPotion,
    Rejuvenation1,
    Rejuvenation2,
    Rejuvenation3,
    Rejuvenation4,
}

/// Woodcutting level required to wield each axe.
pub const AXES: &[(Item, u32)] = &[
    (Item::BronzeAxe, 1),
    (Item::IronAxe, 1),
    (Item::SteelAxe, 6),
    (Item::BlackAxe, 11),
    (Item::MithrilAxe, 21),
    (Item::AdamantAxe, 31),
    (Item::RuneAxe, 41),
    (Item::DragonAxe, 61),
    (Item::InfernalAxe, 61),
    (Item::CrystalAxe, 71),
];

/// Rejuvenation potions, one entry per dose count.
pub const POTIONS: &[Item] = &[
    Item::Rejuvenation1,
    Item::Rejuvenation2,
    Item::Rejuvenation3,
    Item::Rejuvenation4,
];

impl Item {
    pub fn name(self) -> &'static str {
        match self {
            Item::Knife => "Knife",
            Item::Tinderbox => "Tinderbox",
            Item::Hammer => "Hammer",
            Item::BronzeAxe => "Bronze axe",
            Item::IronAxe => "Iron axe",
            Item::SteelAxe => "Steel axe",
            Item::BlackAxe => "Black axe",
            Item::MithrilAxe => "Mithril axe",
            Item::AdamantAxe => "Adamant axe",
            Item::RuneAxe => "Rune axe",
            Item::DragonAxe => "Dragon axe",
            Item::InfernalAxe => "Infernal axe",
            Item::CrystalAxe => "Crystal axe",
            Item::BrumaRoot => "Bruma root",
            Item::BrumaKindling => "Bruma kindling",
            Item::BrumaHerb => "Bruma herb",
            Item::UnfinishedPotion => "Rejuvenation potion (unf)",
            Item::Rejuvenation1 => "Rejuvenation potion (1)",
            Item::Rejuvenation2 => "Rejuvenation potion (2)",
            Item::Rejuvenation3 => "Rejuvenation potion (3)",
            Item::Rejuvenation4 => "Rejuvenation potion (4)",
        }
    }

    pub fn is_axe(self) -> bool {
        AXES.iter().any(|(axe, _)| *axe == self)
    }

    pub fn is_potion(self) -> bool {
        POTIONS.contains(&self)
    }

    /// The potion left behind after drinking one dose, if any.
    pub fn after_dose(self) -> Option<Item> {
        match self {
            Item::Rejuvenation4 => Some(Item::Rejuvenation3),
            Item::Rejuvenation3 => Some(Item::Rejuvenation2),
            Item::Rejuvenation2 => Some(Item::Rejuvenation1),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
