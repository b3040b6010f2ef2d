//! Encounter dispatch - turns an entered node into one external call.
//!
//! Battles, rewards and shops live outside this crate. The engine only
//! chooses which entry point to call; every call is fire-and-forget and
//! completion comes back later through the engine's return-to-map methods.

use crate::generation::{Blueprint, BlueprintKind};
use crate::map::Node;

/// The game systems that run encounters.
pub trait EncounterHost {
    fn start_minion_battle(&mut self, blueprint: &Blueprint);
    fn is_boss_unlocked(&self, boss_id: &str) -> bool;
    fn start_boss_battle(&mut self, boss_id: &str);
    fn grant_regen(&mut self, amount: u32);
    fn roll_treasure_reward(&mut self, chance: f32);
    fn open_shop(&mut self);
}

/// Which entry point a dispatch invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum Encounter {
    MinionBattle { blueprint_id: String },
    BossBattle { boss_id: String },
    /// Boss not unlocked yet; nothing was started
    BossLocked { boss_id: String },
    Regen { amount: u32 },
    Treasure { chance: f32 },
    Shop,
}

impl Encounter {
    /// Battles keep traversal locked until the host reports back.
    pub fn holds_lock(&self) -> bool {
        matches!(
            self,
            Encounter::MinionBattle { .. } | Encounter::BossBattle { .. }
        )
    }
}

/// Call exactly one host entry point for the entered node.
pub fn dispatch(node: &Node, blueprint: &Blueprint, host: &mut dyn EncounterHost) -> Encounter {
    let encounter = match &blueprint.kind {
        BlueprintKind::Minion { .. } => {
            host.start_minion_battle(blueprint);
            Encounter::MinionBattle {
                blueprint_id: blueprint.id.clone(),
            }
        }
        BlueprintKind::Boss { boss_id } => {
            if host.is_boss_unlocked(boss_id) {
                host.start_boss_battle(boss_id);
                Encounter::BossBattle {
                    boss_id: boss_id.clone(),
                }
            } else {
                log::warn!("Boss '{}' at {} is still locked", boss_id, node.point);
                Encounter::BossLocked {
                    boss_id: boss_id.clone(),
                }
            }
        }
        BlueprintKind::Regen { amount } => {
            host.grant_regen(*amount);
            Encounter::Regen { amount: *amount }
        }
        BlueprintKind::Treasure { chance } => {
            host.roll_treasure_reward(*chance);
            Encounter::Treasure { chance: *chance }
        }
        BlueprintKind::Shop => {
            host.open_shop();
            Encounter::Shop
        }
    };
    log::debug!(
        "Entered {} node {}: {:?}",
        node.node_type.label(),
        node.point,
        encounter
    );
    encounter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{NodeType, Point, Position};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        boss_unlocked: bool,
    }

    impl EncounterHost for Recorder {
        fn start_minion_battle(&mut self, blueprint: &Blueprint) {
            self.calls.push(format!("minion:{}", blueprint.id));
        }
        fn is_boss_unlocked(&self, _boss_id: &str) -> bool {
            self.boss_unlocked
        }
        fn start_boss_battle(&mut self, boss_id: &str) {
            self.calls.push(format!("boss:{}", boss_id));
        }
        fn grant_regen(&mut self, amount: u32) {
            self.calls.push(format!("regen:{}", amount));
        }
        fn roll_treasure_reward(&mut self, chance: f32) {
            self.calls.push(format!("treasure:{}", chance));
        }
        fn open_shop(&mut self) {
            self.calls.push("shop".into());
        }
    }

    fn node_for(blueprint: &Blueprint) -> Node {
        Node::new(
            Point::new(0, 0),
            blueprint.node_type(),
            &blueprint.id,
            Position::default(),
        )
    }

    #[test]
    fn test_each_type_calls_one_entry_point() {
        let cases = vec![
            (
                Blueprint::new("slimes", BlueprintKind::Minion { enemies: vec![] }),
                "minion:slimes",
                true,
            ),
            (
                Blueprint::new("campfire", BlueprintKind::Regen { amount: 12 }),
                "regen:12",
                false,
            ),
            (
                Blueprint::new("chest", BlueprintKind::Treasure { chance: 0.5 }),
                "treasure:0.5",
                false,
            ),
            (Blueprint::new("merchant", BlueprintKind::Shop), "shop", false),
        ];

        for (blueprint, expected, holds) in cases {
            let mut host = Recorder::default();
            let encounter = dispatch(&node_for(&blueprint), &blueprint, &mut host);
            assert_eq!(host.calls, vec![expected.to_string()]);
            assert_eq!(encounter.holds_lock(), holds);
        }
    }

    #[test]
    fn test_locked_boss_starts_nothing() {
        let blueprint = Blueprint::new(
            "guardian",
            BlueprintKind::Boss {
                boss_id: "guardian".into(),
            },
        );
        let node = node_for(&blueprint);
        assert_eq!(node.node_type, NodeType::Boss);

        let mut host = Recorder::default();
        let encounter = dispatch(&node, &blueprint, &mut host);
        assert!(host.calls.is_empty());
        assert!(!encounter.holds_lock());

        host.boss_unlocked = true;
        let encounter = dispatch(&node, &blueprint, &mut host);
        assert_eq!(host.calls, vec!["boss:guardian".to_string()]);
        assert!(encounter.holds_lock());
    }
}
