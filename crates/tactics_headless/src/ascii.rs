//! ASCII battlefield renderer for quick terminal review.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tactics_core::prelude::*;

/// ASCII rendering configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Show the unit legend under the map.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_legend: true,
            use_color: true,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
}

/// Soldier and commander glyphs. None collide with terrain symbols.
const fn unit_chars(faction: FactionId) -> (char, char) {
    match faction {
        FactionId::AuroraEmpire => ('a', 'A'),
        FactionId::MoonArchonDominion => ('c', 'C'),
        FactionId::GoldenHand => ('y', 'Y'),
        FactionId::Neutral => ('n', 'N'),
        FactionId::EvilNeutral => ('x', 'X'),
    }
}

const fn faction_color(faction: FactionId) -> &'static str {
    match faction {
        FactionId::AuroraEmpire => colors::BLUE,
        FactionId::MoonArchonDominion => colors::MAGENTA,
        FactionId::GoldenHand => colors::YELLOW,
        FactionId::Neutral => colors::GREEN,
        FactionId::EvilNeutral => colors::RED,
    }
}

/// Character for a unit.
#[must_use]
pub fn unit_char(unit: &Unit) -> char {
    let (soldier, commander) = unit_chars(unit.faction);
    if unit.is_commander() {
        commander
    } else {
        soldier
    }
}

/// Render the battlefield, top row first.
///
/// Units replace the terrain under them. Free entry and exit cells show
/// as `<` and `>`.
#[must_use]
pub fn render_battlefield(field: &Battlefield, config: &AsciiConfig) -> String {
    let mut output = String::new();
    let rows = field.grid.to_rows();

    for (y, row) in rows.iter().enumerate() {
        for (x, terrain) in row.chars().enumerate() {
            let pos = GridPos::new(x as u32, y as u32);
            let unit = field.grid.occupant(pos).and_then(|id| field.roster.get(id));
            match unit {
                Some(unit) if config.use_color => {
                    let _ = write!(
                        output,
                        "{}{}{}{}",
                        colors::BOLD,
                        faction_color(unit.faction),
                        unit_char(unit),
                        colors::RESET
                    );
                }
                Some(unit) => output.push(unit_char(unit)),
                None if field.grid.entry() == Some(pos) => output.push('<'),
                None if field.grid.exit() == Some(pos) => output.push('>'),
                None => output.push(terrain),
            }
        }
        output.push('\n');
    }

    if config.show_legend {
        let mut counts: BTreeMap<FactionId, (u32, i32)> = BTreeMap::new();
        for unit in field.roster.iter() {
            let entry = counts.entry(unit.faction).or_default();
            entry.0 += 1;
            entry.1 += unit.hp;
        }
        for (faction, (units, hp)) in counts {
            let (soldier, commander) = unit_chars(faction);
            let _ = writeln!(
                output,
                "{soldier}/{commander} {:<26} units: {units:>2}  hp: {hp:>4}",
                faction.display_name()
            );
        }
    }

    output
}
