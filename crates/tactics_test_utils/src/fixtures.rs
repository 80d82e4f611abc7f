//! Test fixtures and helpers.
//!
//! Pre-built battlefields, unit templates and matches for consistent
//! testing.

use tactics_core::data::AuraBonuses;
use tactics_core::prelude::*;

/// Plain infantry template.
#[must_use]
pub fn infantry() -> UnitData {
    UnitData::basic("infantry", 20, 8, 3)
}

/// Mounted template: fast, weak to spears.
#[must_use]
pub fn cavalry() -> UnitData {
    UnitData::basic("cavalry", 22, 9, 2)
        .with_class(UnitClass::Cavalry)
        .with_movement(5, MovementType::Cavalry)
}

/// Spear template.
#[must_use]
pub fn spearman() -> UnitData {
    UnitData::basic("spearman", 20, 7, 4).with_class(UnitClass::Spearman)
}

/// Range-2 archer template.
#[must_use]
pub fn archer() -> UnitData {
    UnitData::basic("archer", 16, 7, 2)
        .with_class(UnitClass::Archer)
        .with_range(2)
}

/// Commander template with a modest aura.
#[must_use]
pub fn leader() -> UnitData {
    UnitData::basic("leader", 30, 10, 5).with_aura(
        AuraBonuses {
            attack: 1,
            defense: 1,
            morale: 2,
            ..AuraBonuses::default()
        },
        2,
    )
}

/// All-grass battlefield with the standard relation table.
#[must_use]
pub fn open_field(width: u32, height: u32) -> Battlefield {
    Battlefield::new(
        TerrainGrid::new(width, height),
        FactionRelations::default_relations(),
    )
}

/// Battlefield parsed from map rows.
///
/// # Panics
///
/// Panics on malformed rows.
#[must_use]
pub fn field_from_rows(rows: &[&str]) -> Battlefield {
    let grid = TerrainGrid::from_rows(rows).expect("fixture map rows must parse");
    Battlefield::new(grid, FactionRelations::default_relations())
}

/// Spawn a single unit.
///
/// # Panics
///
/// Panics if the cell is unavailable.
pub fn spawn(field: &mut Battlefield, faction: FactionId, data: UnitData, x: u32, y: u32) -> UnitId {
    field
        .spawn_unit(faction, data, GridPos::new(x, y))
        .expect("fixture cell must be free and passable")
}

/// Move a unit directly, keeping occupancy consistent.
///
/// # Panics
///
/// Panics if the unit is unknown or the cell is taken.
pub fn teleport(field: &mut Battlefield, unit: UnitId, to: GridPos) {
    let from = field.roster.get(unit).expect("unit must exist").position;
    field.grid.set_occupant(from, None).expect("from in bounds");
    field.grid.set_occupant(to, Some(unit)).expect("target cell free");
    field.roster.get_mut(unit).expect("unit must exist").position = to;
}

/// A mixed squad: leader plus infantry, spearman and archer.
///
/// # Panics
///
/// Panics if the squad does not fit around `centre`.
pub fn spawn_mixed_squad(
    field: &mut Battlefield,
    faction: FactionId,
    centre: GridPos,
) -> (UnitId, Vec<UnitId>) {
    field
        .spawn_squad(faction, leader(), &[infantry(), spearman(), archer()], centre)
        .expect("fixture squad must fit")
}

/// Two mixed squads facing each other across a 16×12 map with some
/// cover, both AI-controlled.
///
/// Aurora is the player faction for outcome purposes.
///
/// # Panics
///
/// Panics if the fixture cannot be built.
#[must_use]
pub fn skirmish() -> SimulationContext {
    let rows = [
        "................",
        "....FF..........",
        "....FF.....h....",
        "...........h....",
        "......==........",
        "......==........",
        "......==........",
        "......==........",
        "..........FF....",
        "..h.......FF....",
        "..h.............",
        "................",
    ];
    let mut field = field_from_rows(&rows);
    spawn_mixed_squad(&mut field, FactionId::AuroraEmpire, GridPos::new(2, 5));
    spawn_mixed_squad(&mut field, FactionId::GoldenHand, GridPos::new(13, 6));
    spawn(&mut field, FactionId::GoldenHand, cavalry(), 13, 2);

    let mut sim = SimulationContext::new(
        field,
        vec![FactionId::AuroraEmpire, FactionId::GoldenHand],
        FactionId::AuroraEmpire,
    )
    .expect("fixture turn order is valid");
    sim.set_controller(
        FactionId::AuroraEmpire,
        Controller::Ai(FactionPolicy::for_faction(FactionId::AuroraEmpire)),
    );
    sim
}

/// [`skirmish`] after [`SimulationContext::start`].
///
/// # Panics
///
/// Panics if starting fails.
#[must_use]
pub fn started_skirmish() -> SimulationContext {
    let mut sim = skirmish();
    sim.start().expect("fixture match starts");
    sim
}
