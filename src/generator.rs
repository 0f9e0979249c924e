//! Quest-step generation behind a pluggable interface.
//!
//! The shipped generator is deliberately non-algorithmic: it breaks any
//! goal into the same fixed five-step plan. A real generator (LLM-backed
//! or otherwise) can replace it without touching the rules engine.

use serde::Serialize;

use crate::quest::{Difficulty, QuestType};

/// One proposed step of a broken-down goal. Not persisted; the client
/// turns accepted steps into real quests via the create-quest endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedStep {
    pub step: i32,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub quest_type: QuestType,
    pub sp_cost: i32,
}

/// Goal text in, ordered step descriptors out.
pub trait QuestGenerator: Send + Sync {
    fn generate(&self, goal: &str) -> Vec<GeneratedStep>;
}

/// Fixed five-step template: ramp up through preparation, groundwork, the
/// core push, polish, and a finale.
pub struct TemplateGenerator;

impl QuestGenerator for TemplateGenerator {
    fn generate(&self, goal: &str) -> Vec<GeneratedStep> {
        let topic: String = goal.chars().take(20).collect();
        vec![
            GeneratedStep {
                step: 1,
                title: format!("Preparation: scope out \"{}\"", topic),
                description: "Understand what you are up against before committing.".to_string(),
                difficulty: Difficulty::Easy,
                quest_type: QuestType::Main,
                sp_cost: 10,
            },
            GeneratedStep {
                step: 2,
                title: "Groundwork: set up your environment".to_string(),
                description: "Lay out the tools and space the goal needs.".to_string(),
                difficulty: Difficulty::Normal,
                quest_type: QuestType::Main,
                sp_cost: 20,
            },
            GeneratedStep {
                step: 3,
                title: "Core push: tackle the main work".to_string(),
                description: "The hard middle stretch where the goal is won or lost.".to_string(),
                difficulty: Difficulty::Hard,
                quest_type: QuestType::Main,
                sp_cost: 30,
            },
            GeneratedStep {
                step: 4,
                title: "Refinement: polish and tighten".to_string(),
                description: "Go back over the rough edges and fix them.".to_string(),
                difficulty: Difficulty::Normal,
                quest_type: QuestType::Main,
                sp_cost: 20,
            },
            GeneratedStep {
                step: 5,
                title: "Finale: ship it".to_string(),
                description: "Put the result in front of the world.".to_string(),
                difficulty: Difficulty::Epic,
                quest_type: QuestType::Main,
                sp_cost: 40,
            },
        ]
    }
}
