//! Scenario: tutor activity feeds the XP engine.
//!
//! The mock tutor answers everything, the first generation of a piece of
//! content earns XP and repeats are served from cache without XP. Quizzes
//! are scored server-side; the leaderboard and progress views reflect it.

use std::sync::Arc;

use axum::http::StatusCode;
use edm_config::AppConfig;
use edm_daemon::{auth::hash_password, routes, state::AppState};
use edm_testkit::{call_json, get, json};
use serde_json::{json as j, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_state() -> Arc<AppState> {
    let mut cfg = AppConfig::default();
    cfg.auth.bcrypt_cost = 4;
    cfg.rate_limit.enabled = false;
    Arc::new(AppState::in_memory(cfg))
}

async fn send(st: &Arc<AppState>, req: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
    call_json(routes::build_router(Arc::clone(st)), req).await
}

async fn register(st: &Arc<AppState>, username: &str, style: &str) -> (String, String) {
    let (status, v) = send(
        st,
        json(
            "POST",
            "/api/auth/register",
            None,
            &j!({
                "email": format!("{username}@example.com"),
                "password": "secret1",
                "firstName": username,
                "lastName": "Tester",
                "username": username,
                "learningStyle": style
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{v}");
    (
        v["token"].as_str().unwrap().to_string(),
        v["user"]["id"].as_str().unwrap().to_string(),
    )
}

fn ids(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|a| {
            a.iter()
                .filter_map(|d| d["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn two_question_quiz(answers: Value) -> Value {
    j!({
        "topic": "fractions",
        "answers": answers,
        "questions": [
            { "question": "1/2 + 1/2?", "options": ["1", "2"], "correctAnswer": 0, "explanation": "Halves add to one." },
            { "question": "1/4 of 8?", "options": ["2", "4"], "correctAnswer": 0 }
        ]
    })
}

// ---------------------------------------------------------------------------
// /api/ai
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reports_the_mock_tutor() {
    let st = test_state();
    let (token, _) = register(&st, "curious", "visual").await;

    let (status, v) = send(&st, get("/api/ai/status", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["aiEnabled"], false);
    assert_eq!(v["features"]["chat"], true);
}

#[tokio::test]
async fn explanation_earns_xp_once_then_comes_from_cache() {
    let st = test_state();
    let (token, _) = register(&st, "reader", "reading").await;
    let body = j!({ "topic": "Photosynthesis", "difficulty": "beginner" });

    let (status, v) = send(
        &st,
        json("POST", "/api/ai/generate-explanation", Some(&token), &body),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["topic"], "Photosynthesis");
    assert_eq!(v["learningStyle"], "reading", "falls back to the account style");
    assert_eq!(v["isMock"], true);
    // 5 for the explanation, 10 for a topic never seen before.
    assert_eq!(v["xpEarned"], 15);
    assert!(v.get("fromCache").is_none());

    let (status, v) = send(
        &st,
        json("POST", "/api/ai/generate-explanation", Some(&token), &body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["fromCache"], true);
    assert!(v.get("xpEarned").is_none());

    let (status, v) = send(
        &st,
        json(
            "POST",
            "/api/ai/generate-explanation",
            Some(&token),
            &j!({ "topic": "  " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["details"][0]["field"], "topic");
}

#[tokio::test]
async fn question_count_is_bounded() {
    let st = test_state();
    let (token, _) = register(&st, "practice", "visual").await;

    let (status, v) = send(
        &st,
        json(
            "POST",
            "/api/ai/generate-questions",
            Some(&token),
            &j!({ "topic": "algebra", "count": 3, "difficulty": "beginner" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["questions"].as_array().unwrap().len(), 3);
    assert_eq!(v["xpEarned"], 3);

    let (status, v) = send(
        &st,
        json(
            "POST",
            "/api/ai/generate-questions",
            Some(&token),
            &j!({ "topic": "algebra", "count": 11 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["details"][0]["field"], "count");
}

#[tokio::test]
async fn learning_path_needs_level_and_goals() {
    let st = test_state();
    let (token, _) = register(&st, "planner", "kinesthetic").await;

    let (status, v) = send(
        &st,
        json(
            "POST",
            "/api/ai/generate-learning-path",
            Some(&token),
            &j!({ "subject": "Chemistry", "goals": "meh" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields = ids_of_details(&v);
    assert_eq!(fields, vec!["currentLevel", "goals"]);

    let (status, v) = send(
        &st,
        json(
            "POST",
            "/api/ai/generate-learning-path",
            Some(&token),
            &j!({ "subject": "Chemistry", "currentLevel": "beginner", "goals": "pass the exam" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["subject"], "Chemistry");
    assert_eq!(v["timeframe"], "4 weeks");
    assert_eq!(v["xpEarned"], 20);
}

fn ids_of_details(v: &Value) -> Vec<&str> {
    v["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect()
}

#[tokio::test]
async fn quiz_is_scored_on_the_server() {
    let st = test_state();
    let (token, _) = register(&st, "quizzer", "visual").await;

    let (status, v) = send(
        &st,
        json("POST", "/api/ai/submit-quiz", Some(&token), &two_question_quiz(j!([0, 0]))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["score"], 100.0);
    assert_eq!(v["correct"], 2);
    assert_eq!(v["passed"], true);
    assert_eq!(v["results"][1]["explanation"], "No explanation available");
    // 2 per question plus a tenth of the score.
    assert_eq!(v["feedback"]["xpEarned"], 14);
    assert_eq!(v["feedback"]["message"], "Excellent work! You scored 100%");
    assert_eq!(v["feedback"]["currentStreak"], 1);
    let earned = ids(&v["feedback"]["newAchievements"]);
    assert!(earned.contains(&"first_quiz_passed".to_string()));
    assert!(earned.contains(&"perfect_score".to_string()));

    let (status, v) = send(
        &st,
        json("POST", "/api/ai/submit-quiz", Some(&token), &two_question_quiz(j!([1]))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["score"], 0.0);
    assert_eq!(v["passed"], false);
    assert_eq!(v["feedback"]["xpEarned"], 4);
    assert!(v["results"][1]["userAnswer"].is_null());

    let (status, v) = send(
        &st,
        json(
            "POST",
            "/api/ai/submit-quiz",
            Some(&token),
            &j!({ "topic": "fractions", "answers": [], "questions": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["details"][0]["field"], "questions");
}

#[tokio::test]
async fn chat_answers_greetings() {
    let st = test_state();
    let (token, _) = register(&st, "chatty", "auditory").await;

    let (status, v) = send(
        &st,
        json("POST", "/api/ai/chat", Some(&token), &j!({ "message": "hello there" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert!(v["response"].as_str().is_some_and(|r| !r.is_empty()));
    assert!(v["timestamp"].is_string());

    let (status, _) = send(
        &st,
        json("POST", "/api/ai/chat", Some(&token), &j!({ "message": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// /api/gamification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_account_holds_the_welcome_achievement() {
    let st = test_state();
    let (token, _) = register(&st, "fresh", "visual").await;

    let (status, v) = send(&st, get("/api/gamification/achievements", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&v["earned"]).contains(&"welcome".to_string()));
    assert!(v["earned"][0]["earnedAt"].is_string());
    assert_eq!(v["totalAvailable"], 14);
    assert!(!ids(&v["available"]).contains(&"welcome".to_string()));

    let (status, v) = send(&st, get("/api/gamification/progress", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["level"], 1);
    assert!(v["achievementsUnlocked"].as_u64().unwrap() >= 1);
    assert_eq!(v["quizzesCompleted"], 0);
    assert_eq!(v["averageQuizScore"], 0);
}

#[tokio::test]
async fn award_xp_moves_the_leaderboard() {
    let st = test_state();
    let hash = hash_password(edm_db::DEMO_PASSWORD, 4).await.unwrap();
    edm_db::seed_demo(st.store.as_ref(), &hash).await.unwrap();
    let (alice, alice_id) = register(&st, "alice", "visual").await;
    let (bob, bob_id) = register(&st, "bob", "visual").await;

    let (status, v) = send(
        &st,
        json("POST", "/api/gamification/award-xp", Some(&alice), &j!({ "amount": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Invalid XP amount");

    let (status, v) = send(
        &st,
        json(
            "POST",
            "/api/gamification/award-xp",
            Some(&alice),
            &j!({ "amount": 50, "userId": bob_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(v["error"], "Access denied");

    let (status, v) = send(
        &st,
        json("POST", "/api/gamification/award-xp", Some(&alice), &j!({ "amount": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["message"], "XP awarded successfully");
    assert_eq!(v["reason"], "Manual XP award");
    assert_eq!(v["xpAwarded"], 500);
    assert_eq!(v["leveledUp"], true);
    assert_eq!(v["userId"], alice_id.as_str());

    let teacher = {
        let (_, v) = send(
            &st,
            json(
                "POST",
                "/api/auth/login",
                None,
                &j!({ "email": "teacher@edumind.ai", "password": edm_db::DEMO_PASSWORD }),
            ),
        )
        .await;
        v["token"].as_str().unwrap().to_string()
    };
    let (status, v) = send(
        &st,
        json(
            "POST",
            "/api/gamification/award-xp",
            Some(&teacher),
            &j!({ "amount": 40, "userId": bob_id, "reason": "Helped a classmate" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["userId"], bob_id.as_str());
    assert_eq!(v["reason"], "Helped a classmate");

    let (status, v) = send(&st, get("/api/gamification/leaderboard?limit=2", Some(&bob))).await;
    assert_eq!(status, StatusCode::OK);
    let board = v["leaderboard"].as_array().unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0]["id"], alice_id.as_str());
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[1]["id"], bob_id.as_str());
    assert_eq!(board[1]["isCurrentUser"], true);
    assert_eq!(v["currentUserRank"], 2);
}

#[tokio::test]
async fn challenges_are_listed_for_the_day() {
    let st = test_state();
    let (token, _) = register(&st, "daily", "visual").await;

    let (status, v) = send(&st, get("/api/gamification/challenges", Some(&token))).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert!(!v["daily"].as_array().unwrap().is_empty());
    assert!(!v["weekly"].as_array().unwrap().is_empty());
    assert_eq!(v["daily"][0]["type"], "daily");
    assert!(v["refreshTime"]["daily"].is_string());
}
