use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::level::level_for_xp;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardTimeframe {
    All,
    Week,
    Month,
}

impl LeaderboardTimeframe {
    /// Unknown values fall back to `All`.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            _ => Self::All,
        }
    }

    fn window(self) -> Option<Duration> {
        match self {
            Self::All => None,
            Self::Week => Some(Duration::days(7)),
            Self::Month => Some(Duration::days(30)),
        }
    }
}

/// One user's standing before ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Contender {
    pub user_id: Uuid,
    pub name: String,
    pub xp: u64,
    pub achievements: usize,
    pub streak: u32,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub id: Uuid,
    pub name: String,
    pub xp: u64,
    pub level: u32,
    pub achievements: usize,
    pub streak: u32,
    pub is_current_user: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub leaderboard: Vec<LeaderboardEntry>,
    /// `None` when the current user is outside the returned entries.
    pub current_user_rank: Option<u32>,
    pub timeframe: LeaderboardTimeframe,
    pub total_users: usize,
}

/// Ranks contenders by XP (desc, ties by user id) and keeps the top `limit`.
///
/// Week and month timeframes only consider users active within the window.
pub fn rank_leaderboard(
    mut contenders: Vec<Contender>,
    current_user: Uuid,
    limit: usize,
    timeframe: LeaderboardTimeframe,
    now: DateTime<Utc>,
) -> Leaderboard {
    if let Some(window) = timeframe.window() {
        let since = now - window;
        contenders.retain(|c| c.last_activity.is_some_and(|t| t >= since));
    }
    contenders.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.user_id.cmp(&b.user_id)));
    let total_users = contenders.len();

    let leaderboard: Vec<LeaderboardEntry> = contenders
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, c)| LeaderboardEntry {
            rank: u32::try_from(i + 1).unwrap_or(u32::MAX),
            is_current_user: c.user_id == current_user,
            id: c.user_id,
            name: c.name,
            level: level_for_xp(c.xp),
            xp: c.xp,
            achievements: c.achievements,
            streak: c.streak,
        })
        .collect();

    let current_user_rank = leaderboard
        .iter()
        .find(|e| e.is_current_user)
        .map(|e| e.rank);

    Leaderboard {
        leaderboard,
        current_user_rank,
        timeframe,
        total_users,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(n: u128, xp: u64, last: Option<DateTime<Utc>>) -> Contender {
        Contender {
            user_id: Uuid::from_u128(n),
            name: format!("user{n}"),
            xp,
            achievements: 0,
            streak: 0,
            last_activity: last,
        }
    }

    #[test]
    fn ranks_by_xp_then_id() {
        let now = Utc::now();
        let board = rank_leaderboard(
            vec![c(3, 50, None), c(2, 200, None), c(1, 50, None)],
            Uuid::from_u128(1),
            10,
            LeaderboardTimeframe::All,
            now,
        );
        let ids: Vec<u128> = board.leaderboard.iter().map(|e| e.id.as_u128()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(board.current_user_rank, Some(2));
        assert_eq!(board.leaderboard[0].level, 2);
        assert_eq!(board.total_users, 3);
    }

    #[test]
    fn current_user_outside_limit_has_no_rank() {
        let board = rank_leaderboard(
            vec![c(1, 10, None), c(2, 20, None), c(3, 30, None)],
            Uuid::from_u128(1),
            2,
            LeaderboardTimeframe::All,
            Utc::now(),
        );
        assert_eq!(board.leaderboard.len(), 2);
        assert_eq!(board.current_user_rank, None);
        assert!(board.leaderboard.iter().all(|e| !e.is_current_user));
    }

    #[test]
    fn week_excludes_inactive_users() {
        let now = Utc::now();
        let board = rank_leaderboard(
            vec![
                c(1, 10, Some(now - Duration::days(2))),
                c(2, 99, Some(now - Duration::days(20))),
                c(3, 99, None),
            ],
            Uuid::from_u128(1),
            10,
            LeaderboardTimeframe::parse(Some("week")),
            now,
        );
        assert_eq!(board.total_users, 1);
        assert_eq!(board.current_user_rank, Some(1));
    }
}
