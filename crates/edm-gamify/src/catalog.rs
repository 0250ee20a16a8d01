use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AchievementId {
    #[serde(rename = "welcome")]
    Welcome,
    #[serde(rename = "first_course")]
    FirstCourse,
    #[serde(rename = "course_completed")]
    CourseCompleted,
    #[serde(rename = "first_quiz_passed")]
    FirstQuizPassed,
    #[serde(rename = "perfect_score")]
    PerfectScore,
    #[serde(rename = "learning_streak_7")]
    LearningStreak7,
    #[serde(rename = "learning_streak_30")]
    LearningStreak30,
    #[serde(rename = "level_up_5")]
    LevelUp5,
    #[serde(rename = "level_up_10")]
    LevelUp10,
    #[serde(rename = "knowledge_seeker")]
    KnowledgeSeeker,
    #[serde(rename = "quiz_master")]
    QuizMaster,
    #[serde(rename = "topic_explorer")]
    TopicExplorer,
    #[serde(rename = "early_bird")]
    EarlyBird,
    #[serde(rename = "night_owl")]
    NightOwl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementDef {
    pub id: AchievementId,
    pub title: &'static str,
    pub description: &'static str,
    pub xp: u64,
    pub rarity: Rarity,
}

const CATALOG: &[AchievementDef] = &[
    AchievementDef {
        id: AchievementId::Welcome,
        title: "Welcome Aboard!",
        description: "Joined EduMind and started your learning journey",
        xp: 0,
        rarity: Rarity::Common,
    },
    AchievementDef {
        id: AchievementId::FirstCourse,
        title: "First Steps",
        description: "Enrolled in your first course",
        xp: 25,
        rarity: Rarity::Common,
    },
    AchievementDef {
        id: AchievementId::CourseCompleted,
        title: "Course Master",
        description: "Completed your first course",
        xp: 100,
        rarity: Rarity::Uncommon,
    },
    AchievementDef {
        id: AchievementId::FirstQuizPassed,
        title: "Quiz Champion",
        description: "Passed your first quiz with 70% or higher",
        xp: 50,
        rarity: Rarity::Common,
    },
    AchievementDef {
        id: AchievementId::PerfectScore,
        title: "Perfect Score",
        description: "Achieved 100% on a quiz",
        xp: 25,
        rarity: Rarity::Rare,
    },
    AchievementDef {
        id: AchievementId::LearningStreak7,
        title: "Week Warrior",
        description: "Maintained a 7-day learning streak",
        xp: 75,
        rarity: Rarity::Uncommon,
    },
    AchievementDef {
        id: AchievementId::LearningStreak30,
        title: "Consistent Learner",
        description: "Maintained a 30-day learning streak",
        xp: 200,
        rarity: Rarity::Epic,
    },
    AchievementDef {
        id: AchievementId::LevelUp5,
        title: "Rising Star",
        description: "Reached level 5",
        xp: 0,
        rarity: Rarity::Uncommon,
    },
    AchievementDef {
        id: AchievementId::LevelUp10,
        title: "Expert Learner",
        description: "Reached level 10",
        xp: 0,
        rarity: Rarity::Rare,
    },
    AchievementDef {
        id: AchievementId::KnowledgeSeeker,
        title: "Knowledge Seeker",
        description: "Generated 50 AI explanations",
        xp: 100,
        rarity: Rarity::Uncommon,
    },
    AchievementDef {
        id: AchievementId::QuizMaster,
        title: "Quiz Master",
        description: "Completed 25 practice quizzes",
        xp: 150,
        rarity: Rarity::Rare,
    },
    AchievementDef {
        id: AchievementId::TopicExplorer,
        title: "Topic Explorer",
        description: "Explored 20 different topics",
        xp: 125,
        rarity: Rarity::Uncommon,
    },
    AchievementDef {
        id: AchievementId::EarlyBird,
        title: "Early Bird",
        description: "Completed learning activities before 9 AM",
        xp: 25,
        rarity: Rarity::Common,
    },
    AchievementDef {
        id: AchievementId::NightOwl,
        title: "Night Owl",
        description: "Completed learning activities after 10 PM",
        xp: 25,
        rarity: Rarity::Common,
    },
];

/// Every achievement, in catalog order.
pub fn catalog() -> &'static [AchievementDef] {
    CATALOG
}

impl AchievementId {
    pub fn def(self) -> &'static AchievementDef {
        // CATALOG holds exactly one entry per variant, in declaration order.
        &CATALOG[self as usize]
    }
}
