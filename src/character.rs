//! Character progression rules.
//!
//! A character has two consumable pools (hp, sp) gating how much they can
//! do before resting, an experience track with a compounding ceiling, and a
//! qualitative status derived from the sp ratio.

use serde::{Deserialize, Serialize};

/// Experience ceiling multiplier applied on each level-up.
/// The product is truncated to an integer, which is observable in the
/// growth curve (100 -> 120 -> 144 -> 172 -> ...).
pub const EXP_GROWTH_FACTOR: f64 = 1.2;

/// Flat ceiling bonus granted to both hp and sp on each level-up.
pub const LEVEL_UP_POOL_BONUS: i32 = 10;

// ============================================================================
// Status
// ============================================================================

/// Qualitative condition derived from the sp ratio. Stored on the character
/// for display, but never authoritative: every sp mutation reclassifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Surging,
    Normal,
    Exhausted,
}

impl Status {
    /// Classify from the sp ratio: >= 80% surging, <= 20% exhausted,
    /// normal in between. Both boundaries are inclusive.
    ///
    /// Callers guarantee `max_sp > 0` (construction invariant).
    pub fn classify(sp: i32, max_sp: i32) -> Self {
        let ratio = (sp as f64 / max_sp as f64) * 100.0;
        if ratio >= 80.0 {
            Status::Surging
        } else if ratio <= 20.0 {
            Status::Exhausted
        } else {
            Status::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Surging => "surging",
            Status::Normal => "normal",
            Status::Exhausted => "exhausted",
        }
    }

    /// Parse a stored status label, defaulting to normal for anything
    /// unrecognized (the column is display-only and recomputed on read).
    pub fn parse(s: &str) -> Self {
        match s {
            "surging" => Status::Surging,
            "exhausted" => Status::Exhausted,
            _ => Status::Normal,
        }
    }
}

// ============================================================================
// Character
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Character {
    pub id: i64,
    pub username: String,
    pub level: i32,
    pub current_exp: i32,
    pub max_exp: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub sp: i32,
    pub max_sp: i32,
    pub gold: i32,
    pub status: Status,
    pub int_stat: i32,
    pub con_stat: i32,
    pub cha_stat: i32,
}

impl Character {
    /// Add experience and resolve any resulting level-ups. Returns true if
    /// at least one level-up occurred; the new level is on `self.level`.
    ///
    /// A single large gain may cross several thresholds, so this loops:
    /// each level carries the remainder over, grows the exp ceiling by
    /// [`EXP_GROWTH_FACTOR`] (truncated), raises both pool ceilings by
    /// [`LEVEL_UP_POOL_BONUS`], and fully restores hp and sp.
    ///
    /// Negative amounts are disallowed by caller contract.
    pub fn gain_exp(&mut self, amount: i32) -> bool {
        self.current_exp += amount;

        let mut leveled = false;
        while self.current_exp >= self.max_exp {
            self.level += 1;
            self.current_exp -= self.max_exp;
            self.max_exp = (self.max_exp as f64 * EXP_GROWTH_FACTOR) as i32;
            self.max_hp += LEVEL_UP_POOL_BONUS;
            self.max_sp += LEVEL_UP_POOL_BONUS;
            self.hp = self.max_hp;
            self.sp = self.max_sp;
            leveled = true;
        }
        leveled
    }

    /// Recompute the stored status from the current sp ratio. Called after
    /// every mutation that touches sp so the label never goes stale.
    pub fn reclassify(&mut self) {
        self.status = Status::classify(self.sp, self.max_sp);
    }

    /// Refill both pools to their ceilings. Returns (hp_restored,
    /// sp_restored) for display; both are 0 when already full.
    pub fn rest(&mut self) -> (i32, i32) {
        let hp_restored = self.max_hp - self.hp;
        let sp_restored = self.max_sp - self.sp;
        self.hp = self.max_hp;
        self.sp = self.max_sp;
        self.reclassify();
        (hp_restored, sp_restored)
    }

    /// Restore hp and sp by the given amounts, each clamped to the
    /// remaining headroom so neither pool exceeds its ceiling. Returns the
    /// changes actually applied.
    pub fn restore(&mut self, hp_restore: i32, sp_restore: i32) -> (i32, i32) {
        let hp_change = hp_restore.min(self.max_hp - self.hp);
        let sp_change = sp_restore.min(self.max_sp - self.sp);
        self.hp += hp_change;
        self.sp += sp_change;
        self.reclassify();
        (hp_change, sp_change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(username: &str) -> Character {
        Character {
            id: 1,
            username: username.to_string(),
            level: 1,
            current_exp: 0,
            max_exp: 100,
            hp: 100,
            max_hp: 100,
            sp: 100,
            max_sp: 100,
            gold: 0,
            status: Status::Surging,
            int_stat: 10,
            con_stat: 10,
            cha_stat: 10,
        }
    }

    #[test]
    fn test_status_boundaries() {
        // 80% is surging, inclusive
        assert_eq!(Status::classify(80, 100), Status::Surging);
        assert_eq!(Status::classify(100, 100), Status::Surging);
        assert_eq!(Status::classify(79, 100), Status::Normal);

        // 20% is exhausted, inclusive
        assert_eq!(Status::classify(20, 100), Status::Exhausted);
        assert_eq!(Status::classify(0, 100), Status::Exhausted);
        assert_eq!(Status::classify(21, 100), Status::Normal);

        // Non-round ceilings
        assert_eq!(Status::classify(88, 110), Status::Surging);
        assert_eq!(Status::classify(22, 110), Status::Exhausted);
    }

    #[test]
    fn test_status_idempotent() {
        let s = Status::classify(50, 100);
        assert_eq!(s, Status::classify(50, 100));
        assert_eq!(s, Status::Normal);
    }

    #[test]
    fn test_gain_exp_no_level() {
        let mut c = fresh("alice");
        assert!(!c.gain_exp(99));
        assert_eq!(c.level, 1);
        assert_eq!(c.current_exp, 99);
        assert_eq!(c.max_exp, 100);
    }

    #[test]
    fn test_gain_exp_exact_threshold() {
        let mut c = fresh("alice");
        assert!(c.gain_exp(100));
        assert_eq!(c.level, 2);
        // Exact threshold carries zero over
        assert_eq!(c.current_exp, 0);
        assert_eq!(c.max_exp, 120);
    }

    #[test]
    fn test_gain_exp_double_level() {
        let mut c = fresh("alice");
        // 250 >= 100 -> level 2, carry 150; 150 >= 120 -> level 3, carry 30
        assert!(c.gain_exp(250));
        assert_eq!(c.level, 3);
        assert_eq!(c.current_exp, 30);
        assert_eq!(c.max_exp, 144);
    }

    #[test]
    fn test_level_up_growth_and_restore() {
        let mut c = fresh("alice");
        c.hp = 1;
        c.sp = 5;
        assert!(c.gain_exp(100));
        // Ceiling growth is floor(old * 1.2) and +10 to both pools
        assert_eq!(c.max_exp, 120);
        assert_eq!(c.max_hp, 110);
        assert_eq!(c.max_sp, 110);
        // Level-up fully restores both pools
        assert_eq!(c.hp, 110);
        assert_eq!(c.sp, 110);
    }

    #[test]
    fn test_exp_growth_truncates() {
        let mut c = fresh("alice");
        c.max_exp = 144;
        c.gain_exp(144);
        // 144 * 1.2 = 172.8, truncated
        assert_eq!(c.max_exp, 172);
    }

    #[test]
    fn test_rest_restores_and_reports() {
        let mut c = fresh("alice");
        c.hp = 40;
        c.sp = 10;
        c.reclassify();
        assert_eq!(c.status, Status::Exhausted);

        let (hp_restored, sp_restored) = c.rest();
        assert_eq!(hp_restored, 60);
        assert_eq!(sp_restored, 90);
        assert_eq!(c.hp, c.max_hp);
        assert_eq!(c.sp, c.max_sp);
        assert_eq!(c.status, Status::Surging);
    }

    #[test]
    fn test_rest_when_already_full() {
        let mut c = fresh("alice");
        let (hp_restored, sp_restored) = c.rest();
        assert_eq!(hp_restored, 0);
        assert_eq!(sp_restored, 0);
    }

    #[test]
    fn test_restore_clamps_to_ceiling() {
        let mut c = fresh("alice");
        c.hp = 95;
        c.sp = 50;
        let (hp_change, sp_change) = c.restore(30, 30);
        assert_eq!(hp_change, 5);
        assert_eq!(sp_change, 30);
        assert_eq!(c.hp, 100);
        assert_eq!(c.sp, 80);
        assert_eq!(c.status, Status::Surging);
    }
}
