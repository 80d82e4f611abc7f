//! Experience rewards, squad sharing and the level curve.

use tracing::debug;

use crate::roster::Roster;
use crate::unit::UnitId;

/// Highest attainable level.
pub const MAX_LEVEL: u32 = 10;

/// Flat part of a kill reward.
pub const BASE_KILL_EXP: i32 = 20;

/// Reward added per level of the defeated unit.
pub const KILL_EXP_PER_LEVEL: i32 = 5;

/// Cumulative threshold for reaching `level`.
///
/// Level 1 needs nothing, level 2 needs 100, and every later level adds 50.
#[must_use]
pub const fn exp_for_level(level: u32) -> i32 {
    if level <= 1 {
        0
    } else {
        100 + (level as i32 - 2) * 50
    }
}

/// Experience consumed when advancing from `level` to `level + 1`.
#[must_use]
pub const fn exp_to_next_level(level: u32) -> i32 {
    exp_for_level(level + 1) - exp_for_level(level)
}

/// Reward for defeating a unit of the given level.
#[must_use]
pub const fn kill_reward(defeated_level: u32) -> i32 {
    BASE_KILL_EXP + KILL_EXP_PER_LEVEL * defeated_level as i32
}

/// How a kill reward is divided.
///
/// - Commander killer with a squad: keeps half (rounded up), the rest is
///   split evenly (rounded down) across the squad.
/// - Commander killer without a squad: keeps everything.
/// - Soldier killer: keeps 60% (rounded up); a live commander gets 20%
///   (rounded down) and the remainder is split evenly across the other
///   squad members. Without a commander nothing else is paid out.
///
/// Shares never sum to more than `reward`. Returned in payout order.
#[must_use]
pub fn experience_shares(roster: &Roster, killer: UnitId, reward: i32) -> Vec<(UnitId, i32)> {
    let Some(unit) = roster.get(killer) else {
        return Vec::new();
    };
    let reward = reward.max(0);

    if unit.is_commander() {
        let squad: Vec<UnitId> = unit
            .squad()
            .iter()
            .copied()
            .filter(|id| roster.contains(*id))
            .collect();
        if squad.is_empty() {
            return vec![(killer, reward)];
        }
        let kept = div_ceil(reward, 2);
        let per = (reward - kept) / squad.len() as i32;
        let mut shares = vec![(killer, kept)];
        shares.extend(squad.into_iter().map(|id| (id, per)));
        return shares;
    }

    let kept = div_ceil(reward * 6, 10);
    let mut shares = vec![(killer, kept)];

    if let Some(commander) = roster.commander_of(killer) {
        let commander_share = reward * 2 / 10;
        shares.push((commander.id, commander_share));

        let others: Vec<UnitId> = commander
            .squad()
            .iter()
            .copied()
            .filter(|&id| id != killer && roster.contains(id))
            .collect();
        if !others.is_empty() {
            let per = (reward - kept - commander_share) / others.len() as i32;
            shares.extend(others.into_iter().map(|id| (id, per)));
        }
    }
    shares
}

/// Pay out a kill reward. Returns units that levelled up with the number
/// of levels each gained.
pub fn award_experience(roster: &mut Roster, killer: UnitId, defeated_level: u32) -> Vec<(UnitId, u32)> {
    let reward = kill_reward(defeated_level);
    let shares = experience_shares(roster, killer, reward);
    debug!(%killer, reward, recipients = shares.len(), "Awarding experience");

    shares
        .into_iter()
        .filter_map(|(id, amount)| {
            let gained = roster.get_mut(id)?.add_experience(amount);
            (gained > 0).then_some((id, gained))
        })
        .collect()
}

const fn div_ceil(a: i32, b: i32) -> i32 {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitData;
    use crate::factions::FactionId;
    use crate::math::GridPos;

    fn squad(roster: &mut Roster, soldiers: usize) -> (UnitId, Vec<UnitId>) {
        let template = UnitData::basic("u", 20, 5, 2);
        let cmd = roster.spawn(FactionId::AuroraEmpire, template.clone(), GridPos::new(0, 0));
        roster.make_commander(cmd).unwrap();
        let ids = (0..soldiers)
            .map(|i| {
                let s = roster.spawn(
                    FactionId::AuroraEmpire,
                    template.clone(),
                    GridPos::new(i as u32 + 1, 0),
                );
                roster.link_soldier(cmd, s).unwrap();
                s
            })
            .collect();
        (cmd, ids)
    }

    #[test]
    fn test_level_curve() {
        assert_eq!(exp_for_level(1), 0);
        assert_eq!(exp_for_level(2), 100);
        assert_eq!(exp_for_level(3), 150);
        assert_eq!(exp_to_next_level(1), 100);
        assert_eq!(exp_to_next_level(2), 50);
        assert_eq!(exp_to_next_level(9), 50);
    }

    #[test]
    fn test_kill_reward() {
        assert_eq!(kill_reward(1), 25);
        assert_eq!(kill_reward(4), 40);
    }

    #[test]
    fn test_commander_kill_split() {
        let mut roster = Roster::new();
        let (cmd, soldiers) = squad(&mut roster, 2);
        let shares = experience_shares(&roster, cmd, 25);
        assert_eq!(shares, vec![(cmd, 13), (soldiers[0], 6), (soldiers[1], 6)]);
        assert!(shares.iter().map(|(_, e)| e).sum::<i32>() <= 25);
    }

    #[test]
    fn test_lone_commander_keeps_all() {
        let mut roster = Roster::new();
        let (cmd, _) = squad(&mut roster, 0);
        assert_eq!(experience_shares(&roster, cmd, 30), vec![(cmd, 30)]);
    }

    #[test]
    fn test_soldier_kill_split() {
        let mut roster = Roster::new();
        let (cmd, soldiers) = squad(&mut roster, 3);
        let shares = experience_shares(&roster, soldiers[1], 25);
        // 60% of 25 rounded up = 15; 20% rounded down = 5; 5 left over two others.
        assert_eq!(
            shares,
            vec![(soldiers[1], 15), (cmd, 5), (soldiers[0], 2), (soldiers[2], 2)]
        );
    }

    #[test]
    fn test_orphan_soldier_keeps_sixty_percent() {
        let mut roster = Roster::new();
        let lone = roster.spawn(
            FactionId::Neutral,
            UnitData::basic("u", 20, 5, 2),
            GridPos::new(0, 0),
        );
        assert_eq!(experience_shares(&roster, lone, 25), vec![(lone, 15)]);
    }

    #[test]
    fn test_award_reports_level_ups() {
        let mut roster = Roster::new();
        let (cmd, _) = squad(&mut roster, 0);
        roster.get_mut(cmd).unwrap().experience = 90;
        let ups = award_experience(&mut roster, cmd, 1);
        assert_eq!(ups, vec![(cmd, 1)]);
        assert_eq!(roster.get(cmd).unwrap().level, 2);
        assert_eq!(roster.get(cmd).unwrap().experience, 15);
    }
}
