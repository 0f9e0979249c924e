//! Item catalog and per-character inventory.
//!
//! Items are static catalog data: a price and bounded restore effects.
//! Inventory rows tie a character to an item with a quantity that only
//! ever decrements on use, never below zero.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub hp_restore: i32,
    pub sp_restore: i32,
    pub exp_multiplier: i32,
    pub is_consumable: bool,
}

/// Inventory row joined with its catalog item, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryEntry {
    pub id: i64,
    pub character_id: i64,
    pub item_id: i64,
    pub quantity: i32,
    pub item: Item,
}

/// Default catalog seeded by the admin endpoint:
/// (name, description, price, hp_restore, sp_restore, exp_multiplier).
pub const DEFAULT_ITEMS: &[(&str, &str, i32, i32, i32, i32)] = &[
    (
        "Energy Elixir",
        "Instantly refills sp to full.",
        500,
        0,
        100,
        1,
    ),
    (
        "Double XP Pass",
        "Doubles experience gains for a session.",
        300,
        0,
        0,
        2,
    ),
    (
        "Grace Token",
        "Waives the penalty for one failed quest.",
        200,
        0,
        0,
        1,
    ),
    ("Minor Health Tonic", "Restores 30 hp.", 50, 30, 0, 1),
    ("Minor Stamina Tonic", "Restores 30 sp.", 50, 0, 30, 1),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Character, Status};

    fn test_character() -> Character {
        Character {
            id: 1,
            username: "alice".to_string(),
            level: 1,
            current_exp: 0,
            max_exp: 100,
            hp: 95,
            max_hp: 100,
            sp: 50,
            max_sp: 100,
            gold: 0,
            status: Status::Normal,
            int_stat: 10,
            con_stat: 10,
            cha_stat: 10,
        }
    }

    #[test]
    fn test_restore_never_exceeds_ceiling() {
        let mut c = test_character();
        // hp 95/100 with a 30-point tonic clamps to 100, not 125
        let (hp_change, sp_change) = c.restore(30, 0);
        assert_eq!(hp_change, 5);
        assert_eq!(sp_change, 0);
        assert_eq!(c.hp, 100);
    }

    #[test]
    fn test_full_sp_refill_item() {
        let mut c = test_character();
        let (_, sp_change) = c.restore(0, 100);
        assert_eq!(sp_change, 50);
        assert_eq!(c.sp, 100);
        assert_eq!(c.status, Status::Surging);
    }

    #[test]
    fn test_default_catalog_shape() {
        assert_eq!(DEFAULT_ITEMS.len(), 5);
        // Every seeded item has a positive price
        assert!(DEFAULT_ITEMS.iter().all(|(_, _, price, ..)| *price > 0));
    }
}
