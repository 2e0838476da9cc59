//! Built-in content tree and achievement catalog.
//!
//! Used when no TOML config is supplied, so the app is still useful out of the box.

use crate::achievements::{AchievementDef, Category, Comparison, Condition, Rarity, StatField};
use crate::domain::{Dotpoint, InquiryQuestion, Module, Subject};

fn dp(id: &str, title: &str) -> Dotpoint {
  Dotpoint { id: id.into(), title: title.into(), has_content: true }
}

fn iq(title: &str, dotpoints: Vec<Dotpoint>) -> InquiryQuestion {
  InquiryQuestion { title: title.into(), dotpoints }
}

/// A small slice of the Biology and Chemistry syllabi.
pub fn seed_subjects() -> Vec<Subject> {
  vec![
    Subject {
      key: "biology".into(),
      name: "Biology".into(),
      modules: vec![
        Module {
          number: 5,
          name: "Module 5: Heredity".into(),
          inquiry_questions: vec![
            iq("How does reproduction ensure the continuity of a species?", vec![
              dp("BIO-5-1-1", "Sexual and asexual reproduction"),
              dp("BIO-5-1-2", "Fertilisation and implantation in mammals"),
            ]),
            iq("How important is it for genetic material to be replicated exactly?", vec![
              dp("BIO-5-2-1", "Mitosis"),
              dp("BIO-5-2-2", "Mitosis and meiosis compared"),
              dp("BIO-5-2-3", "DNA replication"),
            ]),
          ],
        },
        Module {
          number: 6,
          name: "Module 6: Genetic Change".into(),
          inquiry_questions: vec![
            iq("How does mutation introduce new alleles into a population?", vec![
              dp("BIO-6-1-1", "Mutagens and types of mutation"),
              Dotpoint { id: "BIO-6-1-2".into(), title: "Coding and non-coding DNA".into(), has_content: false },
            ]),
          ],
        },
      ],
    },
    Subject {
      key: "chemistry".into(),
      name: "Chemistry".into(),
      modules: vec![
        Module {
          number: 5,
          name: "Module 5: Equilibrium and Acid Reactions".into(),
          inquiry_questions: vec![
            iq("What happens when chemical reactions do not go through to completion?", vec![
              dp("CHEM-5-1-1", "Static and dynamic equilibrium"),
              dp("CHEM-5-1-2", "Le Chatelier's principle"),
            ]),
          ],
        },
        Module {
          number: 6,
          name: "Module 6: Acid/Base Reactions".into(),
          inquiry_questions: vec![
            iq("What is an acid and what is a base?", vec![
              dp("CHEM-6-1-1", "Bronsted-Lowry acids and bases"),
              dp("CHEM-6-1-2", "Titration"),
            ]),
          ],
        },
      ],
    },
  ]
}

fn at_least(field: StatField, value: i64) -> Condition {
  Condition { field, op: Comparison::AtLeast, value }
}

fn entry(id: &str, name: &str, description: &str, category: Category, rarity: Rarity, xp: i64, conditions: Vec<Condition>) -> AchievementDef {
  AchievementDef {
    id: id.into(),
    name: name.into(),
    description: description.into(),
    category,
    xp_reward: xp,
    rarity,
    conditions,
  }
}

/// Default catalog, in evaluation order.
pub fn default_catalog() -> Vec<AchievementDef> {
  use Category::*;
  use Rarity::*;
  vec![
    entry("first_steps", "First Steps", "Complete your first section", Learning, Common, 10,
      vec![at_least(StatField::SectionsCompleted, 1)]),
    entry("dedicated_learner", "Dedicated Learner", "Complete 25 sections", Learning, Rare, 100,
      vec![at_least(StatField::SectionsCompleted, 25)]),
    entry("dotpoint_master", "Dotpoint Master", "Finish 10 dotpoints", Mastery, Epic, 150,
      vec![at_least(StatField::DotpointsCompleted, 10)]),
    entry("first_correct", "Off the Mark", "Answer a question correctly", Quiz, Common, 10,
      vec![at_least(StatField::CorrectAnswers, 1)]),
    entry("quiz_whiz", "Quiz Whiz", "Answer 50 questions correctly", Quiz, Rare, 75,
      vec![at_least(StatField::CorrectAnswers, 50)]),
    entry("sharpshooter", "Sharpshooter", "Keep 90% accuracy over 20 questions", Quiz, Epic, 120,
      vec![at_least(StatField::AccuracyPercent, 90), at_least(StatField::TotalQuestions, 20)]),
    entry("perfectionist", "Perfectionist", "Finish a quiz without a mistake", Quiz, Rare, 50,
      vec![at_least(StatField::PerfectQuizzes, 1)]),
    entry("on_fire", "On Fire", "Answer 10 in a row correctly", Quiz, Rare, 60,
      vec![at_least(StatField::BestCombo, 10)]),
    entry("boss_slayer", "Boss Slayer", "Defeat a boss battle", Mastery, Epic, 200,
      vec![at_least(StatField::BossesDefeated, 1)]),
    entry("lightning", "Lightning Reflexes", "Answer correctly in under 3 seconds", Speed, Rare, 40,
      vec![Condition { field: StatField::FastestAnswerMs, op: Comparison::AtMost, value: 3000 }]),
    entry("streak_3", "Warming Up", "Study 3 days in a row", Streak, Common, 30,
      vec![at_least(StatField::StudyStreak, 3)]),
    entry("streak_7", "Week Warrior", "Study 7 days in a row", Streak, Rare, 70,
      vec![at_least(StatField::StudyStreak, 7)]),
    entry("streak_30", "Unstoppable", "Study 30 days in a row", Streak, Legendary, 300,
      vec![at_least(StatField::LongestStreak, 30)]),
    entry("explorer", "Explorer", "Study two different subjects", Exploration, Common, 25,
      vec![at_least(StatField::SubjectsStudied, 2)]),
    entry("bookworm", "Bookworm", "Bookmark 5 dotpoints", Exploration, Common, 15,
      vec![at_least(StatField::Bookmarks, 5)]),
    entry("xp_1000", "Scholar", "Earn 1000 XP", Mastery, Legendary, 250,
      vec![at_least(StatField::TotalXp, 1000)]),
  ]
}
