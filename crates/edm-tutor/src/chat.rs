//! Rule-based chat responder.
//!
//! Intent is decided on whole words so that greetings such as "hi" are not
//! found inside "this" or "history". Subject keywords match as word
//! prefixes, so "fractions" still counts as math.

use chrono::{DateTime, Utc};
use edm_schemas::LearningStyle;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    Science,
    Programming,
    Language,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Science => "science",
            Subject::Programming => "programming",
            Subject::Language => "language",
        }
    }
}

const SUBJECT_KEYWORDS: &[(Subject, &[&str])] = &[
    (
        Subject::Math,
        &["math", "algebra", "geometry", "calculus", "equation", "fraction", "number", "solve", "calculat"],
    ),
    (
        Subject::Science,
        &["science", "biology", "chemistry", "physics", "photosynthesis", "gravity", "molecule", "atom"],
    ),
    (
        Subject::Programming,
        &["programming", "code", "coding", "javascript", "python", "html", "css", "function", "variable"],
    ),
    (
        Subject::Language,
        &["english", "grammar", "writing", "essay", "literature", "reading", "vocabulary"],
    ),
];

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

struct Words(Vec<String>);

impl Words {
    fn has(&self, w: &str) -> bool {
        self.0.iter().any(|x| x == w)
    }

    fn has_prefix(&self, p: &str) -> bool {
        self.0.iter().any(|x| x.starts_with(p))
    }

    fn has_phrase(&self, phrase: &[&str]) -> bool {
        self.0
            .windows(phrase.len())
            .any(|win| win.iter().zip(phrase).all(|(a, b)| a == b))
    }
}

/// First subject (in table order) with a keyword present.
pub fn detect_subject(text: &str) -> Option<Subject> {
    let w = Words(words(text));
    SUBJECT_KEYWORDS
        .iter()
        .find(|(_, kws)| kws.iter().any(|k| w.has_prefix(k)))
        .map(|(s, _)| *s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Help,
    Explain,
    Practice,
    Study,
    Homework,
    Greeting,
    Other,
}

fn detect_intent(w: &Words) -> Intent {
    if w.has_prefix("help") || w.has("how") {
        Intent::Help
    } else if w.has_prefix("explain") || w.has_phrase(&["what", "is"]) || w.has_phrase(&["tell", "me", "about"]) {
        Intent::Explain
    } else if ["practice", "quiz", "test", "question"].iter().any(|p| w.has_prefix(p)) {
        Intent::Practice
    } else if w.has_prefix("stud") || w.has_prefix("learn") {
        Intent::Study
    } else if w.has_prefix("homework") || w.has_prefix("assignment") {
        Intent::Homework
    } else if ["hello", "hi", "hey"].iter().any(|g| w.has(g)) {
        Intent::Greeting
    } else {
        Intent::Other
    }
}

fn style_delivery(style: LearningStyle) -> &'static str {
    match style {
        LearningStyle::Visual => "with diagrams, pictures and step-by-step breakdowns",
        LearningStyle::Auditory => "through spoken-style explanations and logical reasoning",
        LearningStyle::Kinesthetic => "with hands-on examples and real-world applications",
        LearningStyle::Reading => "with structured written notes and thorough detail",
    }
}

fn study_tip(style: LearningStyle) -> &'static str {
    match style {
        LearningStyle::Visual => "Draw mind maps and diagrams, and color-code your notes.",
        LearningStyle::Auditory => "Read material aloud, explain it to a friend, and record short summaries.",
        LearningStyle::Kinesthetic => "Study in short active sessions, use objects and examples, and move between topics.",
        LearningStyle::Reading => "Take detailed notes, outline chapters, and rewrite ideas in your own words.",
    }
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        Some(first) => first.to_uppercase().chain(c).collect(),
        None => String::new(),
    }
}

fn respond(message: &str, intent: Intent, subject: Option<Subject>, style: LearningStyle) -> String {
    let style_name = style.as_str();
    match (intent, subject) {
        (Intent::Help, Some(s)) => format!(
            "I can explain concepts in your {style_name} style, write practice questions, suggest study strategies and walk through homework.\n\n\
             For {s} in particular I can cover core principles, problem-solving strategies, practice sets and study techniques. \
             Which {s} topic should we start with?",
            s = s.as_str()
        ),
        (Intent::Help, None) => format!(
            "I can explain concepts in your {style_name} style, write practice questions, suggest study strategies and walk through homework.\n\n\
             Which subject would you like help with today?"
        ),
        (Intent::Explain, Some(s)) => format!(
            "Happy to explain that {s} idea! As a {style_name} learner you'll get it {delivery}.\n\n\
             Which part should I focus on: the definition, how it works step by step, real-world examples, or how it connects to what you know?",
            s = s.as_str(),
            delivery = style_delivery(style)
        ),
        (Intent::Explain, None) => format!(
            "Happy to explain! As a {style_name} learner you'll get it {delivery}.\n\n\
             Tell me the exact topic or concept and I'll tailor the explanation to you.",
            delivery = style_delivery(style)
        ),
        (Intent::Practice, Some(s)) => format!(
            "Practice is the fastest way to master {s}. I can write multiple-choice checks, step-by-step exercises and applied problems suited to a {style_name} learner.\n\n\
             Use the practice generator for a {s} quiz, or tell me which {s} topic to drill.",
            s = s.as_str()
        ),
        (Intent::Practice, None) => format!(
            "Great idea! I can build quizzes, problem sets and review questions suited to a {style_name} learner.\n\n\
             Which topic would you like to practice?"
        ),
        (Intent::Study, Some(s)) => format!(
            "{style_title} study tips for {subject_title}:\n{tip}\n\n\
             A steady approach to {s}: start with the core ideas, practice regularly with varied problems, link new material to what you know, and check yourself with practice questions.\n\n\
             Want a study plan or practice set for {s}?",
            style_title = capitalize(style_name),
            subject_title = capitalize(s.as_str()),
            tip = study_tip(style),
            s = s.as_str()
        ),
        (Intent::Study, None) => format!(
            "Study tips for a {style_name} learner:\n{tip}\n\n\
             Which subject are you studying? I can give more specific strategies or build a learning path.",
            tip = study_tip(style)
        ),
        (Intent::Homework, Some(s)) => format!(
            "Let's work through your {s} homework together. I'll guide you step by step rather than hand over answers, in a way that suits a {style_name} learner.\n\n\
             Share the problem you're stuck on.",
            s = s.as_str()
        ),
        (Intent::Homework, None) => "I'm ready to help with homework. Tell me the subject and the problem, and we'll break it into steps so you understand the method, not just the answer.".to_string(),
        (Intent::Greeting, _) => format!(
            "Hello! I'm your AI tutor. As a {style_name} learner, you'll get explanations shaped to how you learn best. What would you like to explore today?"
        ),
        (Intent::Other, subject) => {
            let mut out = format!("You asked about \"{}\". ", message.trim());
            if let Some(s) = subject {
                out.push_str(&format!("That sounds related to {}. ", s.as_str()));
            }
            out.push_str(&format!(
                "As a {style_name} learner, you'll get the most from a focused question. Are you after an explanation, help with a specific problem, practice questions, or study strategies?"
            ));
            out
        }
    }
}

/// Reply plus the conversation echoed back with the new exchange appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub context: Vec<Value>,
}

fn context_text(turn: &Value) -> Option<&str> {
    turn.get("message")
        .or_else(|| turn.get("content"))
        .and_then(Value::as_str)
}

/// Answers `message`. When the message names no subject, the last two
/// context turns are consulted for one.
pub fn chat_reply(
    message: &str,
    style: LearningStyle,
    context: Vec<Value>,
    now: DateTime<Utc>,
) -> ChatReply {
    let w = Words(words(message));
    let subject = detect_subject(message).or_else(|| {
        context
            .iter()
            .rev()
            .take(2)
            .filter_map(context_text)
            .find_map(detect_subject)
    });
    let response = respond(message, detect_intent(&w), subject, style);

    let mut context = context;
    context.push(json!({ "role": "user", "message": message }));
    context.push(json!({ "role": "assistant", "message": response }));
    ChatReply {
        response,
        timestamp: now,
        context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(s: &str) -> Intent {
        detect_intent(&Words(words(s)))
    }

    #[test]
    fn intents_follow_priority_order() {
        assert_eq!(intent("How do I explain this?"), Intent::Help);
        assert_eq!(intent("Can you explain fractions"), Intent::Explain);
        assert_eq!(intent("what is an atom"), Intent::Explain);
        assert_eq!(intent("give me a quiz to study"), Intent::Practice);
        assert_eq!(intent("I want to learn python"), Intent::Study);
        assert_eq!(intent("my homework is due"), Intent::Homework);
        assert_eq!(intent("hey there"), Intent::Greeting);
        assert_eq!(intent("photosynthesis"), Intent::Other);
    }

    #[test]
    fn greetings_need_whole_words() {
        assert_eq!(intent("this history chapter"), Intent::Other);
        assert_eq!(intent("Hi!"), Intent::Greeting);
    }

    #[test]
    fn subjects_match_in_table_order() {
        assert_eq!(detect_subject("solving fractions"), Some(Subject::Math));
        assert_eq!(detect_subject("Gravity and atoms"), Some(Subject::Science));
        assert_eq!(detect_subject("python code"), Some(Subject::Programming));
        assert_eq!(detect_subject("essay structure"), Some(Subject::Language));
        assert_eq!(detect_subject("the weather"), None);
    }

    #[test]
    fn reply_echoes_context_and_uses_prior_subject() {
        let now = Utc::now();
        let prior = vec![json!({"role": "user", "message": "I am working on algebra"})];
        let r = chat_reply("hmm, not sure", LearningStyle::Reading, prior, now);
        assert!(r.response.contains("related to math"));
        assert!(r.response.contains("reading learner"));
        assert_eq!(r.context.len(), 3);
        assert_eq!(r.context[1]["role"], "user");
        assert_eq!(r.context[2]["message"], r.response.as_str());
    }

    #[test]
    fn study_reply_is_titled_by_style_and_subject() {
        let r = chat_reply(
            "help me study chemistry",
            LearningStyle::Visual,
            Vec::new(),
            Utc::now(),
        );
        // "help" outranks "study".
        assert!(r.response.contains("For science in particular"));

        let r = chat_reply("study chemistry", LearningStyle::Visual, Vec::new(), Utc::now());
        assert!(r.response.starts_with("Visual study tips for Science:"));
    }
}
