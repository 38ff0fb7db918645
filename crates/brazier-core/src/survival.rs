use crate::config::SurvivalConfig;
use crate::game::{Game, Widget};
use crate::types::{Item, Skill, AXES};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Warmth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warmth {
    Level(u32),
    /// The widget was missing or unreadable. Treated as safe.
    Unknown,
}

impl Warmth {
    pub fn is_below(self, threshold: u32) -> bool {
        match self {
            Warmth::Level(level) => level < threshold,
            Warmth::Unknown => false,
        }
    }
}

static NON_DIGITS: OnceLock<Regex> = OnceLock::new();

fn non_digits() -> &'static Regex {
    NON_DIGITS.get_or_init(|| Regex::new(r"\D+").unwrap())
}

/// Parse warmth widget text such as `"Warmth: 73%"`. All non-digit
/// characters are dropped before parsing.
pub fn parse_warmth(text: Option<&str>) -> Warmth {
    let Some(text) = text else {
        return Warmth::Unknown;
    };
    if text.trim().is_empty() {
        return Warmth::Unknown;
    }
    let digits = non_digits().replace_all(text, "");
    match digits.parse::<u32>() {
        Ok(level) => Warmth::Level(level),
        Err(_) => {
            warn!(text, "unreadable warmth widget");
            Warmth::Unknown
        }
    }
}

pub fn warmth<W: Game + ?Sized>(world: &W) -> Warmth {
    parse_warmth(world.widget_text(Widget::Warmth).as_deref())
}

/// Drink a potion when warmth falls below the threshold.
///
/// Returns `true` only when a potion was actually used this tick.
pub fn handle_warmth<W: Game + ?Sized>(world: &mut W, cfg: &SurvivalConfig) -> bool {
    let level = warmth(world);
    if !level.is_below(cfg.warmth_threshold) {
        return false;
    }
    // The unfinished potion shares the name, so filter on the item itself.
    let potion = world
        .inventory_matching(&cfg.potion_name)
        .into_iter()
        .find(|item| item.is_potion());
    match potion {
        Some(potion) => {
            debug!(?level, potion = %potion, "warmth low, drinking");
            world.interact_item(potion, cfg.potion_action);
            true
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Axe selection
// ---------------------------------------------------------------------------

/// Highest-requirement axe in the bank that the player can wield.
pub fn best_axe<W: Game + ?Sized>(world: &W) -> Option<Item> {
    let level = world.level(Skill::Woodcutting);
    AXES.iter()
        .filter(|(axe, required)| level >= *required && world.bank_contains(*axe))
        .fold(None, |best: Option<(Item, u32)>, &(axe, required)| match best {
            Some((_, best_level)) if best_level >= required => best,
            _ => Some((axe, required)),
        })
        .map(|(axe, _)| axe)
}
