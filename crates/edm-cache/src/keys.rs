//! Cache key layout. One namespace prefix per kind of entry.

use uuid::Uuid;

pub const PROGRESS_PREFIX: &str = "user_progress:";

pub fn progress(user_id: Uuid) -> String {
    format!("{PROGRESS_PREFIX}{user_id}")
}

pub fn revoked_token(jti: &str) -> String {
    format!("revoked_token:{jti}")
}

pub fn explanation(topic: &str, difficulty: &str, learning_style: &str) -> String {
    format!("explanation:{}:{difficulty}:{learning_style}", norm(topic))
}

pub fn questions(topic: &str, count: u8, difficulty: &str) -> String {
    format!("questions:{}:{count}:{difficulty}", norm(topic))
}

pub fn learning_path(user_id: Uuid, subject: &str, level: &str) -> String {
    format!("learning_path:{user_id}:{}:{level}", norm(subject))
}

fn norm(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_case_and_spacing_share_a_key() {
        assert_eq!(
            explanation("Black  Holes", "beginner", "visual"),
            explanation("black holes", "beginner", "visual"),
        );
        assert_ne!(
            questions("x", 5, "beginner"),
            questions("x", 6, "beginner")
        );
    }

    #[test]
    fn progress_key_has_prefix() {
        let id = Uuid::nil();
        assert_eq!(
            progress(id),
            "user_progress:00000000-0000-0000-0000-000000000000"
        );
    }
}
