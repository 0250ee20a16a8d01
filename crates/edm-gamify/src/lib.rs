//! edm-gamify
//!
//! XP, levels, achievements, streaks, quizzes, goals, challenges,
//! leaderboard, wellness and analytics over a per-user [`UserProgress`]
//! document.
//!
//! Deterministic, pure logic. No IO and no clock: every function that
//! depends on time takes `now` from the caller.

mod activity;
mod analytics;
mod award;
mod catalog;
mod challenges;
mod goals;
mod leaderboard;
mod level;
mod progress;
mod quiz;
mod streak;
mod wellness;

pub use activity::*;
pub use analytics::*;
pub use award::*;
pub use catalog::*;
pub use challenges::*;
pub use goals::*;
pub use leaderboard::*;
pub use level::*;
pub use progress::*;
pub use quiz::*;
pub use streak::*;
pub use wellness::*;
