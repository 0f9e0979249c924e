//! Quest types and the completion protocol.
//!
//! A quest completes exactly once. Completion pays out gold and experience,
//! spends sp, and may reveal the next step of a chain: quests sharing a
//! `parent_quest_id` form a strictly ordered chain by `step_order`, and
//! step N+1 stays invisible until step N completes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::error::ApiError;

// ============================================================================
// Quest Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Epic,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Normal
    }
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Epic => "epic",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            "epic" => Difficulty::Epic,
            _ => Difficulty::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestType {
    Main,
    Side,
    Daily,
}

impl Default for QuestType {
    fn default() -> Self {
        QuestType::Daily
    }
}

impl QuestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestType::Main => "main",
            QuestType::Side => "side",
            QuestType::Daily => "daily",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "main" => QuestType::Main,
            "side" => QuestType::Side,
            _ => QuestType::Daily,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Quest {
    pub id: i64,
    pub character_id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub quest_type: QuestType,
    pub reward_gold: i32,
    pub reward_exp: i32,
    pub sp_cost: i32,
    pub is_completed: bool,
    pub is_visible: bool,
    pub parent_quest_id: Option<i64>,
    pub step_order: i32,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// Payload for creating a quest. Defaults mirror the stored column
/// defaults so a bare `{"title": "..."}` body is a valid quest.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub quest_type: QuestType,
    #[serde(default = "default_reward")]
    pub reward_gold: i32,
    #[serde(default = "default_reward")]
    pub reward_exp: i32,
    #[serde(default = "default_reward")]
    pub sp_cost: i32,
    #[serde(default)]
    pub parent_quest_id: Option<i64>,
    #[serde(default = "default_step_order")]
    pub step_order: i32,
}

fn default_reward() -> i32 {
    10
}

fn default_step_order() -> i32 {
    1
}

// ============================================================================
// Completion Protocol
// ============================================================================

/// Aggregate outcome of a successful completion, reported to the caller as
/// a single response.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub gold_earned: i32,
    pub exp_earned: i32,
    pub level_up: bool,
    pub new_level: Option<i32>,
    pub next_quest_unlocked: bool,
}

/// Apply the completion protocol to a quest and its owning character.
///
/// Preconditions are evaluated in order before any mutation: not already
/// completed, hp above zero, sp covering the cost. On success the quest is
/// marked completed and stamped, gold and experience are credited (with
/// level-up resolution), sp is debited, and status reclassified. Chain
/// unlock is the store's job; [`CompletionOutcome::next_quest_unlocked`]
/// starts false and is set by the caller if a next step was revealed.
pub fn complete(
    quest: &mut Quest,
    character: &mut Character,
    now: NaiveDateTime,
) -> Result<CompletionOutcome, ApiError> {
    if quest.is_completed {
        return Err(ApiError::AlreadyCompleted);
    }
    if character.hp <= 0 {
        return Err(ApiError::RestRequired);
    }
    if character.sp < quest.sp_cost {
        return Err(ApiError::InsufficientSp);
    }

    quest.is_completed = true;
    quest.completed_at = Some(now);

    character.gold += quest.reward_gold;
    let level_up = character.gain_exp(quest.reward_exp);
    character.sp -= quest.sp_cost;
    character.reclassify();

    Ok(CompletionOutcome {
        gold_earned: quest.reward_gold,
        exp_earned: quest.reward_exp,
        level_up,
        new_level: level_up.then_some(character.level),
        next_quest_unlocked: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Status;
    use chrono::Utc;

    fn test_character() -> Character {
        Character {
            id: 1,
            username: "alice".to_string(),
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

    fn test_quest() -> Quest {
        Quest {
            id: 7,
            character_id: 1,
            title: "Write the weekly report".to_string(),
            description: String::new(),
            difficulty: Difficulty::Normal,
            quest_type: QuestType::Daily,
            reward_gold: 10,
            reward_exp: 10,
            sp_cost: 10,
            is_completed: false,
            is_visible: true,
            parent_quest_id: None,
            step_order: 1,
            created_at: Utc::now().naive_utc(),
            completed_at: None,
        }
    }

    #[test]
    fn test_complete_pays_out() {
        let mut quest = test_quest();
        let mut character = test_character();
        let now = Utc::now().naive_utc();

        let outcome = complete(&mut quest, &mut character, now).unwrap();

        assert!(quest.is_completed);
        assert_eq!(quest.completed_at, Some(now));
        assert_eq!(outcome.gold_earned, 10);
        assert_eq!(outcome.exp_earned, 10);
        assert!(!outcome.level_up);
        assert_eq!(outcome.new_level, None);
        assert!(!outcome.next_quest_unlocked);

        assert_eq!(character.gold, 10);
        assert_eq!(character.current_exp, 10);
        assert_eq!(character.sp, 90);
        assert_eq!(character.status, Status::Surging);
    }

    #[test]
    fn test_complete_reports_level_up() {
        let mut quest = test_quest();
        quest.reward_exp = 100;
        let mut character = test_character();

        let outcome = complete(&mut quest, &mut character, Utc::now().naive_utc()).unwrap();

        assert!(outcome.level_up);
        assert_eq!(outcome.new_level, Some(2));
        // Level-up restored sp before the cost was debited
        assert_eq!(character.sp, 100);
        assert_eq!(character.max_sp, 110);
    }

    #[test]
    fn test_already_completed_rejected_without_mutation() {
        let mut quest = test_quest();
        quest.is_completed = true;
        let stamped = Utc::now().naive_utc();
        quest.completed_at = Some(stamped);
        let mut character = test_character();

        let err = complete(&mut quest, &mut character, Utc::now().naive_utc()).unwrap_err();
        assert!(matches!(err, ApiError::AlreadyCompleted));

        // Rejection is idempotent: nothing moved
        assert_eq!(quest.completed_at, Some(stamped));
        assert_eq!(character.gold, 0);
        assert_eq!(character.current_exp, 0);
        assert_eq!(character.sp, 100);
    }

    #[test]
    fn test_zero_hp_requires_rest_even_with_full_sp() {
        let mut quest = test_quest();
        let mut character = test_character();
        character.hp = 0;

        let err = complete(&mut quest, &mut character, Utc::now().naive_utc()).unwrap_err();
        assert!(matches!(err, ApiError::RestRequired));
        assert!(!quest.is_completed);
    }

    #[test]
    fn test_insufficient_sp_rejected() {
        let mut quest = test_quest();
        quest.sp_cost = 40;
        let mut character = test_character();
        character.sp = 39;

        let err = complete(&mut quest, &mut character, Utc::now().naive_utc()).unwrap_err();
        assert!(matches!(err, ApiError::InsufficientSp));
        assert!(!quest.is_completed);
        assert_eq!(character.sp, 39);
    }

    #[test]
    fn test_completion_cost_can_exhaust() {
        let mut quest = test_quest();
        quest.sp_cost = 90;
        let mut character = test_character();

        complete(&mut quest, &mut character, Utc::now().naive_utc()).unwrap();
        assert_eq!(character.sp, 10);
        assert_eq!(character.status, Status::Exhausted);
    }

    #[test]
    fn test_new_quest_defaults() {
        let quest: NewQuest = serde_json::from_str(r#"{"title": "Clear the inbox"}"#).unwrap();
        assert_eq!(quest.difficulty, Difficulty::Normal);
        assert_eq!(quest.quest_type, QuestType::Daily);
        assert_eq!(quest.reward_gold, 10);
        assert_eq!(quest.reward_exp, 10);
        assert_eq!(quest.sp_cost, 10);
        assert_eq!(quest.parent_quest_id, None);
        assert_eq!(quest.step_order, 1);
    }
}
