use std::sync::Arc;

use chrono::{DateTime, Utc};
use edm_schemas::{Difficulty, LearningStyle};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chat::{chat_reply, ChatReply};
use crate::mock::{mock_explanation, mock_learning_path, mock_questions, GeneratedQuestion};
use crate::{ChatRequest, LlmClient, TutorError};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub explanation: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub learning_style: LearningStyle,
    pub generated_at: DateTime<Utc>,
    pub is_mock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub questions: Vec<GeneratedQuestion>,
    pub topic: String,
    pub difficulty: Difficulty,
    pub generated_at: DateTime<Utc>,
    pub is_mock: bool,
}

/// A learning path. The plan body is free-form JSON (from the LLM, or the
/// serialized mock plan); the request fields are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    #[serde(flatten)]
    pub plan: Map<String, Value>,
    pub subject: String,
    pub current_level: Difficulty,
    pub goals: String,
    pub timeframe: String,
    pub generated_at: DateTime<Utc>,
    pub is_mock: bool,
}

/// Keys owned by [`LearningPath`] itself; stripped from LLM plans.
const PATH_RESERVED: &[&str] = &[
    "subject",
    "currentLevel",
    "goals",
    "timeframe",
    "generatedAt",
    "isMock",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub explanations: bool,
    pub practice_questions: bool,
    pub chat: bool,
    pub learning_paths: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorStatus {
    pub ai_enabled: bool,
    pub service: String,
    pub message: String,
    pub features: Features,
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

const EXPLAIN_SYSTEM: &str = "You are an expert tutor who explains concepts clearly and adapts to different learning styles and difficulty levels.";
const QUESTIONS_SYSTEM: &str = "You are an educational content creator who writes engaging practice questions.";
const PATH_SYSTEM: &str = "You are a curriculum designer who builds personalized learning paths from a student's needs and goals.";

fn style_instruction(style: LearningStyle) -> &'static str {
    match style {
        LearningStyle::Visual => "Use visual metaphors, descriptions of diagrams, and spatial relationships.",
        LearningStyle::Auditory => "Use rhythm, patterns, and sound-based analogies.",
        LearningStyle::Kinesthetic => "Use hands-on examples and physical analogies.",
        LearningStyle::Reading => "Provide detailed text with clear structure and examples.",
    }
}

fn explain_prompt(topic: &str, difficulty: Difficulty, style: LearningStyle) -> ChatRequest {
    ChatRequest {
        system: EXPLAIN_SYSTEM.to_string(),
        user: format!(
            "Explain \"{topic}\" for a {} level student who learns best through {} methods.\n{}\nKeep it engaging, clear, and appropriate for the difficulty level.",
            difficulty.as_str(),
            style.as_str(),
            style_instruction(style)
        ),
        max_tokens: 500,
        temperature: 0.7,
    }
}

fn questions_prompt(topic: &str, count: u8, difficulty: Difficulty) -> ChatRequest {
    ChatRequest {
        system: QUESTIONS_SYSTEM.to_string(),
        user: format!(
            "Generate {count} multiple-choice questions about \"{topic}\" at {} difficulty. \
             Respond with only a JSON array of objects with fields: question, options (array of 4 strings), \
             correctAnswer (index into options), explanation.",
            difficulty.as_str()
        ),
        max_tokens: 800,
        temperature: 0.6,
    }
}

fn path_prompt(subject: &str, level: Difficulty, goals: &str, timeframe: &str) -> ChatRequest {
    ChatRequest {
        system: PATH_SYSTEM.to_string(),
        user: format!(
            "Create a personalized learning path for \"{subject}\" for a {} level student.\n\
             Goals: {goals}\nTimeframe: {timeframe}\n\
             Include the topic sequence, estimated time per topic, learning resources, and milestones. \
             Respond with only a JSON object describing the learning modules.",
            level.as_str()
        ),
        max_tokens: 1000,
        temperature: 0.5,
    }
}

/// Drops a surrounding Markdown code fence, if any.
fn strip_code_fence(s: &str) -> &str {
    let t = s.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionsPayload {
    Bare(Vec<GeneratedQuestion>),
    Wrapped { questions: Vec<GeneratedQuestion> },
}

fn parse_questions(text: &str) -> Result<Vec<GeneratedQuestion>, TutorError> {
    let payload: QuestionsPayload = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| TutorError::Decode(e.to_string()))?;
    let qs = match payload {
        QuestionsPayload::Bare(qs) | QuestionsPayload::Wrapped { questions: qs } => qs,
    };
    if qs.is_empty() {
        return Err(TutorError::Decode("no questions in response".into()));
    }
    Ok(qs)
}

fn parse_plan(text: &str) -> Result<Map<String, Value>, TutorError> {
    let v: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| TutorError::Decode(e.to_string()))?;
    let Value::Object(mut plan) = v else {
        return Err(TutorError::Decode("learning path is not a JSON object".into()));
    };
    for k in PATH_RESERVED {
        plan.remove(*k);
    }
    Ok(plan)
}

// ---------------------------------------------------------------------------
// Tutor
// ---------------------------------------------------------------------------

/// Tutor facade. Without a client every call is answered by the mock
/// tutor; with one, any client or parse failure is logged and answered by
/// the mock tutor instead.
#[derive(Clone, Default)]
pub struct Tutor {
    client: Option<Arc<dyn LlmClient>>,
}

impl std::fmt::Debug for Tutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tutor")
            .field("client", &self.client.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl Tutor {
    pub fn mock() -> Self {
        Self { client: None }
    }

    pub fn with_client(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn is_live(&self) -> bool {
        self.client.is_some()
    }

    pub fn status(&self) -> TutorStatus {
        let features = Features {
            explanations: true,
            practice_questions: true,
            chat: true,
            learning_paths: true,
        };
        match &self.client {
            Some(c) => TutorStatus {
                ai_enabled: true,
                service: c.name().to_string(),
                message: "Live AI service is active.".to_string(),
                features,
            },
            None => TutorStatus {
                ai_enabled: false,
                service: "Mock Tutor".to_string(),
                message: "Using built-in mock responses. Configure Azure OpenAI credentials to enable live AI.".to_string(),
                features,
            },
        }
    }

    async fn ask(&self, what: &'static str, req: ChatRequest) -> Option<String> {
        let client = self.client.as_ref()?;
        match client.complete(req).await {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!(
                    provider = client.name(),
                    request = what,
                    rate_limited = err.is_rate_limited(),
                    error = %err,
                    "llm call failed; using mock tutor"
                );
                None
            }
        }
    }

    pub async fn explain(
        &self,
        topic: &str,
        difficulty: Difficulty,
        style: LearningStyle,
    ) -> Explanation {
        let live = self
            .ask("explanation", explain_prompt(topic, difficulty, style))
            .await
            .filter(|t| !t.trim().is_empty());
        let is_mock = live.is_none();
        Explanation {
            explanation: live.unwrap_or_else(|| mock_explanation(topic, difficulty, style)),
            topic: topic.to_string(),
            difficulty,
            learning_style: style,
            generated_at: Utc::now(),
            is_mock,
        }
    }

    pub async fn questions(&self, topic: &str, count: u8, difficulty: Difficulty) -> QuestionSet {
        let live = match self
            .ask("questions", questions_prompt(topic, count, difficulty))
            .await
        {
            Some(text) => match parse_questions(&text) {
                Ok(qs) => Some(qs),
                Err(err) => {
                    tracing::warn!(error = %err, "llm questions did not parse; using mock tutor");
                    None
                }
            },
            None => None,
        };
        let is_mock = live.is_none();
        QuestionSet {
            questions: live.unwrap_or_else(|| mock_questions(topic, count, difficulty)),
            topic: topic.to_string(),
            difficulty,
            generated_at: Utc::now(),
            is_mock,
        }
    }

    pub async fn learning_path(
        &self,
        subject: &str,
        current_level: Difficulty,
        goals: &str,
        timeframe: &str,
    ) -> LearningPath {
        let live = match self
            .ask(
                "learning_path",
                path_prompt(subject, current_level, goals, timeframe),
            )
            .await
        {
            Some(text) => match parse_plan(&text) {
                Ok(plan) => Some(plan),
                Err(err) => {
                    tracing::warn!(error = %err, "llm learning path did not parse; using mock tutor");
                    None
                }
            },
            None => None,
        };
        let is_mock = live.is_none();
        let plan = match live {
            Some(plan) => plan,
            None => match serde_json::to_value(mock_learning_path(subject, current_level, timeframe)) {
                Ok(Value::Object(m)) => m,
                _ => Map::new(),
            },
        };
        LearningPath {
            plan,
            subject: subject.to_string(),
            current_level,
            goals: goals.to_string(),
            timeframe: timeframe.to_string(),
            generated_at: Utc::now(),
            is_mock,
        }
    }

    /// Chat is always answered locally.
    pub fn chat(&self, message: &str, style: LearningStyle, context: Vec<Value>) -> ChatReply {
        chat_reply(message, style, context, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  [1] "), "[1]");
    }

    #[test]
    fn questions_parse_bare_or_wrapped() {
        let bare = r#"[{"question":"Q","options":["a","b","c","d"],"correctAnswer":2,"explanation":"e"}]"#;
        assert_eq!(parse_questions(bare).unwrap()[0].correct_answer, 2);
        let wrapped = format!("{{\"questions\": {bare}}}");
        assert_eq!(parse_questions(&wrapped).unwrap().len(), 1);
        assert!(parse_questions("[]").is_err());
        assert!(parse_questions("not json").is_err());
    }

    #[test]
    fn plan_must_be_object_and_loses_reserved_keys() {
        let plan = parse_plan(r#"{"modules": [], "subject": "x"}"#).unwrap();
        assert!(plan.contains_key("modules"));
        assert!(!plan.contains_key("subject"));
        assert!(parse_plan("[1,2]").is_err());
    }

    #[tokio::test]
    async fn mock_tutor_marks_results() {
        let t = Tutor::mock();
        assert!(!t.status().ai_enabled);
        let e = t
            .explain("gravity", Difficulty::Beginner, LearningStyle::Visual)
            .await;
        assert!(e.is_mock);
        let q = t.questions("algebra", 4, Difficulty::Beginner).await;
        assert_eq!(q.questions.len(), 4);
        let p = t
            .learning_path("Chemistry", Difficulty::Beginner, "learn the basics", "4 weeks")
            .await;
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["isMock"], true);
        assert_eq!(v["modules"].as_array().map(Vec::len), Some(3));
        assert_eq!(v["subject"], "Chemistry");
    }
}
