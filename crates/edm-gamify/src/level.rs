use serde::{Deserialize, Serialize};

/// XP scale of the level curve: level L starts at `(L-1)^2 * XP_SCALE`.
pub const XP_SCALE: u64 = 100;

/// `floor(sqrt(xp / 100)) + 1`.
///
/// Level 1: 0..=99 XP, level 2: 100..=399, level 3: 400..=899, ...
pub fn level_for_xp(xp: u64) -> u32 {
    let l = isqrt(xp / XP_SCALE) + 1;
    u32::try_from(l).unwrap_or(u32::MAX)
}

/// First XP value of `level`.
pub fn level_floor_xp(level: u32) -> u64 {
    let l = u64::from(level.saturating_sub(1));
    l.saturating_mul(l).saturating_mul(XP_SCALE)
}

/// First XP value of the level after `level`.
pub fn next_level_xp(level: u32) -> u64 {
    let l = u64::from(level);
    l.saturating_mul(l).saturating_mul(XP_SCALE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub xp: u64,
    pub current_level_xp: u64,
    pub next_level_xp: u64,
    pub xp_to_next_level: u64,
    /// Fraction of the current level completed, clamped to `[0, 1]`.
    pub progress_to_next_level: f64,
}

pub fn level_progress(xp: u64) -> LevelProgress {
    let level = level_for_xp(xp);
    let floor = level_floor_xp(level);
    let next = next_level_xp(level);
    let span = next.saturating_sub(floor);
    let fraction = if span == 0 {
        0.0
    } else {
        (xp.saturating_sub(floor) as f64 / span as f64).clamp(0.0, 1.0)
    };
    LevelProgress {
        level,
        xp,
        current_level_xp: floor,
        next_level_xp: next,
        xp_to_next_level: next.saturating_sub(xp),
        progress_to_next_level: fraction,
    }
}

fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    // Float seed, then correct the rounding at the edges.
    let mut x = (n as f64).sqrt() as u64;
    while x.saturating_mul(x) > n {
        x -= 1;
    }
    while (x + 1).saturating_mul(x + 1) <= n {
        x += 1;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(399), 2);
        assert_eq!(level_for_xp(400), 3);
        assert_eq!(level_for_xp(1_600), 5);
        assert_eq!(level_for_xp(8_100), 10);
        assert_eq!(level_for_xp(8_099), 9);
    }

    #[test]
    fn isqrt_is_exact_for_large_squares() {
        let n: u64 = 4_294_967_295;
        assert_eq!(isqrt(n * n), n);
        assert_eq!(isqrt(n * n - 1), n - 1);
        assert_eq!(level_for_xp(u64::MAX), 429_496_730);
    }

    #[test]
    fn progress_within_level() {
        let p = level_progress(250);
        assert_eq!(p.level, 2);
        assert_eq!(p.current_level_xp, 100);
        assert_eq!(p.next_level_xp, 400);
        assert_eq!(p.xp_to_next_level, 150);
        assert!((p.progress_to_next_level - 0.5).abs() < 1e-9);
    }

    #[test]
    fn progress_at_level_start_is_zero() {
        let p = level_progress(400);
        assert_eq!(p.level, 3);
        assert_eq!(p.progress_to_next_level, 0.0);
    }
}
