//! Deterministic tutor used when no LLM is configured or the LLM fails.
//!
//! Everything here is a pure function of its inputs.

use edm_schemas::{Difficulty, LearningStyle};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Explanations
// ---------------------------------------------------------------------------

/// One explanation per learning style: visual, auditory, kinesthetic, reading.
struct TopicNotes {
    key: &'static str,
    by_style: [&'static str; 4],
}

const TOPICS: &[TopicNotes] = &[
    TopicNotes {
        key: "algebra",
        by_style: [
            "Picture an equation as a balance scale: the unknown x sits on one pan, numbers on the other, and every move you make must keep the scale level until x stands alone.",
            "Say each step out loud: whatever happens on the left happens on the right. Subtract five here, subtract five there, and the rhythm carries you to the value of x.",
            "Treat the unknown as a closed box on a table. Move the known blocks off the box's side, one matching move on each side, until the box is the only thing left.",
            "Algebra uses letters to stand for unknown quantities and rules for rearranging equations so that the unknown can be isolated and evaluated.",
        ],
    },
    TopicNotes {
        key: "geometry",
        by_style: [
            "Sketch the shape first. Label every side and angle, then look for the triangles, parallels and circles hiding inside the figure.",
            "Talk through each property: a triangle's angles sum to one hundred eighty degrees, a square's sides match. Repeating the rules makes the proofs flow.",
            "Cut shapes from paper, fold them, and measure with a ruler. Angles and areas make sense once your hands have handled them.",
            "Geometry studies the size, shape and relative position of figures, building results from definitions, postulates and proven theorems.",
        ],
    },
    TopicNotes {
        key: "fractions",
        by_style: [
            "Draw a pizza cut into eight slices and shade three: that shaded region is 3/8. The bottom number counts the slices, the top counts the ones you have.",
            "Read fractions as 'parts out of': three-eighths is three parts out of eight equal parts. Hearing it that way makes comparing fractions easier.",
            "Fold a strip of paper into four equal parts and tear off one. What remains in your hand is three quarters of the strip.",
            "A fraction expresses a part of a whole as a numerator written over a denominator, where the denominator counts equal parts and the numerator selects some of them.",
        ],
    },
    TopicNotes {
        key: "photosynthesis",
        by_style: [
            "Imagine each leaf as a green factory. Sunlight powers the machines, water arrives through the roots, carbon dioxide comes in through pores, and sugar plus oxygen leave the building.",
            "Follow the cycle as a chant: light in, water up, carbon dioxide in, sugar made, oxygen out. The sequence is the whole story.",
            "Put a water plant in sunlight and watch bubbles form on its leaves. Those bubbles are the oxygen released while the plant builds its food.",
            "Photosynthesis is the process by which chloroplasts convert light energy, water and carbon dioxide into glucose, releasing oxygen as a by-product.",
        ],
    },
    TopicNotes {
        key: "gravity",
        by_style: [
            "Picture a heavy ball resting on a stretched sheet. Smaller marbles roll toward it because the sheet bends, just as objects fall toward massive bodies.",
            "Listen to a dropped object: it gains speed every second, about 9.8 metres per second faster, because gravity keeps pulling.",
            "Drop a book and a sheet of paper, then crumple the paper and repeat. Feeling the difference shows how air resistance competes with gravity.",
            "Gravity is the attractive force between masses. Near Earth's surface it accelerates free-falling objects at roughly 9.8 m/s².",
        ],
    },
    TopicNotes {
        key: "javascript",
        by_style: [
            "Think of a web page as a stage: HTML builds the set, CSS paints it, and JavaScript moves the actors when the audience clicks.",
            "JavaScript listens for events such as clicks and key presses and answers them, a conversation between the visitor and the page.",
            "Open the browser console, type a line of JavaScript, and press enter. Changing a value and watching the page react teaches faster than reading.",
            "JavaScript is a dynamically typed language executed by browsers and servers, used to add behavior to web pages alongside HTML and CSS.",
        ],
    },
    TopicNotes {
        key: "machine learning",
        by_style: [
            "Plot a cloud of points and draw the line that fits them best. Machine learning automates finding that line, or far richer shapes, from examples.",
            "A model learns the way you learned words: by hearing many examples, noticing patterns, and being corrected when it guesses wrong.",
            "Sort a pile of photos into cats and dogs by hand, then write down the rules you used. Training a model is the computer doing that sorting from labelled examples.",
            "Machine learning builds statistical models from data so that a program can make predictions or decisions without explicitly coded rules.",
        ],
    },
];

const PRACTICE_MARKERS: &[&str] = &["practice questions", "quiz", "test"];
const PRACTICE_FILLER: &[&str] = &["create", "practice", "questions", "for", "math", "science", "about"];

fn style_index(style: LearningStyle) -> usize {
    match style {
        LearningStyle::Visual => 0,
        LearningStyle::Auditory => 1,
        LearningStyle::Kinesthetic => 2,
        LearningStyle::Reading => 3,
    }
}

fn letters_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphabetic()).collect()
}

/// Direct match first, then the first table entry that the topic contains
/// or whose key contains the topic's letters.
fn find_topic(topic: &str) -> Option<&'static TopicNotes> {
    let lower = topic.trim().to_lowercase();
    if let Some(t) = TOPICS.iter().find(|t| t.key == lower) {
        return Some(t);
    }
    let squeezed = letters_only(&lower);
    TOPICS
        .iter()
        .find(|t| lower.contains(t.key) || (!squeezed.is_empty() && t.key.contains(&squeezed)))
}

/// Explanation text for `topic`.
pub fn mock_explanation(topic: &str, difficulty: Difficulty, style: LearningStyle) -> String {
    let lower = topic.to_lowercase();
    if PRACTICE_MARKERS.iter().any(|m| lower.contains(m)) {
        return question_writing_strategy(topic, style);
    }
    match find_topic(topic) {
        Some(notes) => notes.by_style[style_index(style)].to_string(),
        None => contextual_explanation(topic.trim(), difficulty, style),
    }
}

fn question_writing_strategy(topic: &str, style: LearningStyle) -> String {
    let subject = topic
        .split_whitespace()
        .filter(|w| !PRACTICE_FILLER.contains(&w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    let subject = if subject.is_empty() {
        "this subject".to_string()
    } else {
        subject
    };
    match style {
        LearningStyle::Visual => format!(
            "To write good practice questions on {subject}, map the key ideas as a diagram first, then ask questions about the relationships the diagram shows: label-the-figure items, pattern spotting and multiple choice built around charts."
        ),
        LearningStyle::Auditory => format!(
            "For {subject}, write questions that read well aloud: short word problems that tell a story, cause-and-effect prompts, and items a study partner can quiz you on verbally."
        ),
        LearningStyle::Kinesthetic => format!(
            "Build {subject} practice around doing: multi-step calculations, real-world scenarios to work through, and questions that ask you to show each step of the solution."
        ),
        LearningStyle::Reading => format!(
            "Structure {subject} practice as written exercises: detailed word problems, fill-in-the-blank definitions, short essays and multiple choice with careful distractors."
        ),
    }
}

fn contextual_explanation(topic: &str, difficulty: Difficulty, style: LearningStyle) -> String {
    let depth = match difficulty {
        Difficulty::Beginner => "starting from the basics and building a firm foundation",
        Difficulty::Intermediate => "connecting the key ideas and looking at practical uses",
        Difficulty::Advanced => "examining the harder relationships and advanced applications",
    };
    let approach = match style {
        LearningStyle::Visual => "diagrams, charts and pictures of how the parts fit together",
        LearningStyle::Auditory => "talking it through, discussion and step-by-step verbal reasoning",
        LearningStyle::Kinesthetic => "hands-on activities, worked examples and experiments",
        LearningStyle::Reading => "careful notes, structured text and written summaries",
    };
    format!(
        "Let's look at {topic}, {depth}, using {approach}.\n\n\
         At the {level} level, focus on four things:\n\
         1. Definition: what {topic} is and why it matters.\n\
         2. Applications: where {topic} shows up in practice.\n\
         3. Problem solving: how to use {topic} to work through problems.\n\
         4. Connections: how {topic} links to what you already know.\n\n\
         As a {style} learner, lean on {approach} while you study {topic}.",
        level = difficulty.as_str(),
        style = style.as_str(),
    )
}

// ---------------------------------------------------------------------------
// Practice questions
// ---------------------------------------------------------------------------

/// Multiple-choice question; `correct_answer` indexes `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

struct BankQuestion {
    question: &'static str,
    options: [&'static str; 4],
    correct: usize,
    explanation: &'static str,
}

impl BankQuestion {
    fn to_question(&self) -> GeneratedQuestion {
        GeneratedQuestion {
            question: self.question.to_string(),
            options: self.options.iter().map(|o| o.to_string()).collect(),
            correct_answer: self.correct,
            explanation: self.explanation.to_string(),
        }
    }
}

struct Bank {
    key: &'static str,
    beginner: &'static [BankQuestion],
    intermediate: &'static [BankQuestion],
    advanced: &'static [BankQuestion],
}

impl Bank {
    /// Questions for `difficulty`, falling back to the beginner set.
    fn for_level(&self, difficulty: Difficulty) -> &'static [BankQuestion] {
        let set = match difficulty {
            Difficulty::Beginner => self.beginner,
            Difficulty::Intermediate => self.intermediate,
            Difficulty::Advanced => self.advanced,
        };
        if set.is_empty() {
            self.beginner
        } else {
            set
        }
    }
}

const BANKS: &[Bank] = &[
    Bank {
        key: "algebra",
        beginner: &[
            BankQuestion {
                question: "If x + 4 = 11, what is x?",
                options: ["4", "7", "11", "15"],
                correct: 1,
                explanation: "Subtract 4 from both sides: x = 11 - 4 = 7.",
            },
            BankQuestion {
                question: "What is 5x when x = 3?",
                options: ["8", "15", "53", "2"],
                correct: 1,
                explanation: "Substitute x = 3: 5 × 3 = 15.",
            },
        ],
        intermediate: &[BankQuestion {
            question: "Solve for y: 3y - 6 = 15",
            options: ["3", "5", "7", "9"],
            correct: 2,
            explanation: "Add 6 to both sides to get 3y = 21, then divide by 3: y = 7.",
        }],
        advanced: &[],
    },
    Bank {
        key: "geometry",
        beginner: &[BankQuestion {
            question: "How many sides does a pentagon have?",
            options: ["4", "5", "6", "8"],
            correct: 1,
            explanation: "A pentagon has five sides and five angles.",
        }],
        intermediate: &[],
        advanced: &[],
    },
    Bank {
        key: "photosynthesis",
        beginner: &[BankQuestion {
            question: "Which gas do plants release during photosynthesis?",
            options: ["Nitrogen", "Carbon dioxide", "Oxygen", "Hydrogen"],
            correct: 2,
            explanation: "Plants take in carbon dioxide and release oxygen while making glucose.",
        }],
        intermediate: &[],
        advanced: &[],
    },
    Bank {
        key: "javascript",
        beginner: &[BankQuestion {
            question: "Which keyword declares a block-scoped variable that cannot be reassigned?",
            options: ["var", "let", "const", "function"],
            correct: 2,
            explanation: "`const` declares a block-scoped binding that cannot be reassigned.",
        }],
        intermediate: &[],
        advanced: &[],
    },
];

fn find_bank(topic: &str) -> Option<&'static Bank> {
    let squeezed = letters_only(&topic.to_lowercase());
    BANKS
        .iter()
        .find(|b| squeezed.contains(b.key) || (!squeezed.is_empty() && b.key.contains(&squeezed)))
}

fn contextual_questions(topic: &str) -> Vec<GeneratedQuestion> {
    let lower = topic.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    let mut out = Vec::new();
    if has_any(&["math", "calculus", "equation"]) {
        out.push(GeneratedQuestion {
            question: format!("What matters most when studying {topic}?"),
            options: vec![
                "Memorizing every formula".into(),
                "Understanding why the methods work".into(),
                "Calculating as fast as possible".into(),
                "Always using a calculator".into(),
            ],
            correct_answer: 1,
            explanation: format!(
                "Understanding the reasoning behind {topic} lets you apply it to problems you have not seen."
            ),
        });
    }
    if has_any(&["science", "biology", "chemistry"]) {
        out.push(GeneratedQuestion {
            question: format!("How should you approach a complex process in {topic}?"),
            options: vec![
                "Read about it once".into(),
                "Break it into smaller steps".into(),
                "Memorize the definitions only".into(),
                "Skip the difficult parts".into(),
            ],
            correct_answer: 1,
            explanation: format!("Splitting {topic} processes into steps builds understanding piece by piece."),
        });
    }
    if has_any(&["programming", "coding", "computer"]) {
        out.push(GeneratedQuestion {
            question: format!("What is the most effective way to learn {topic}?"),
            options: vec![
                "Only watching videos".into(),
                "Writing and running code regularly".into(),
                "Reading documentation only".into(),
                "Memorizing syntax".into(),
            ],
            correct_answer: 1,
            explanation: format!("{topic} is learned by practice: writing, running and fixing code."),
        });
    }
    out
}

fn generic_question(topic: &str, difficulty: Difficulty) -> GeneratedQuestion {
    let adjective = match difficulty {
        Difficulty::Beginner => "basic",
        Difficulty::Intermediate => "important",
        Difficulty::Advanced => "complex",
    };
    GeneratedQuestion {
        question: format!("Which {adjective} habit helps most when studying {topic}?"),
        options: vec![
            "Surface-level memorization".into(),
            "Deep understanding and application".into(),
            "Avoiding the challenging parts".into(),
            "Focusing only on easy material".into(),
        ],
        correct_answer: 1,
        explanation: format!(
            "Understanding {topic} deeply and applying it is what builds mastery at the {} level.",
            difficulty.as_str()
        ),
    }
}

/// Exactly `count` questions. When the source set is shorter than `count`
/// it repeats, and repeats are suffixed with their position.
pub fn mock_questions(topic: &str, count: u8, difficulty: Difficulty) -> Vec<GeneratedQuestion> {
    let topic = topic.trim();
    let mut source: Vec<GeneratedQuestion> = find_bank(topic)
        .map(|b| b.for_level(difficulty).iter().map(BankQuestion::to_question).collect())
        .unwrap_or_default();
    if source.is_empty() {
        source = contextual_questions(topic);
    }
    if source.is_empty() {
        source.push(generic_question(topic, difficulty));
    }

    (0..usize::from(count))
        .map(|i| {
            let mut q = source[i % source.len()].clone();
            if i >= source.len() {
                q.question = format!("{} (Question {})", q.question, i + 1);
            }
            q
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Learning paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathModule {
    pub title: String,
    pub duration: String,
    pub topics: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPlan {
    pub title: String,
    pub description: String,
    pub modules: Vec<PathModule>,
    pub total_duration: String,
    pub estimated_hours: u32,
}

/// Weeks used when the timeframe cannot be read.
const DEFAULT_PATH_WEEKS: u32 = 7;
const HOURS_PER_WEEK: u32 = 6;

/// Reads "4 weeks", "10 days", "3 months" and similar into whole weeks.
fn timeframe_weeks(timeframe: &str) -> Option<u32> {
    let lower = timeframe.trim().to_lowercase();
    let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
    let n: u32 = digits.parse().ok().filter(|n| *n > 0)?;
    let unit = lower[digits.len()..].trim_start();
    let weeks = if unit.starts_with("day") {
        n.div_ceil(7)
    } else if unit.starts_with("month") {
        n.saturating_mul(4)
    } else if unit.starts_with("week") || unit.is_empty() {
        n
    } else {
        return None;
    };
    Some(weeks.max(1))
}

/// Splits `weeks` over three modules, giving remainders to the middle
/// module first, then the first. Each module gets at least one week.
fn spread(weeks: u32) -> [u32; 3] {
    let base = weeks / 3;
    let mut out = [base; 3];
    let rem = weeks % 3;
    if rem >= 1 {
        out[1] += 1;
    }
    if rem == 2 {
        out[0] += 1;
    }
    out.map(|w| w.max(1))
}

fn weeks_label(n: u32) -> String {
    if n == 1 {
        "1 week".to_string()
    } else {
        format!("{n} weeks")
    }
}

/// Three-module plan (fundamentals, intermediate, advanced) spread over the
/// requested timeframe.
pub fn mock_learning_path(subject: &str, current_level: Difficulty, timeframe: &str) -> PathPlan {
    let subject = subject.trim();
    let weeks = timeframe_weeks(timeframe).unwrap_or(DEFAULT_PATH_WEEKS);
    let [a, b, c] = spread(weeks);
    let strings = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    PathPlan {
        title: format!("{subject} Learning Path"),
        description: format!(
            "Personalized learning path for a {} level student",
            current_level.as_str()
        ),
        modules: vec![
            PathModule {
                title: format!("{subject} Fundamentals"),
                duration: weeks_label(a),
                topics: strings(&["Core concepts", "Key principles", "Foundation skills"]),
                resources: strings(&["Interactive tutorials", "Practice exercises", "Video lessons"]),
            },
            PathModule {
                title: format!("Intermediate {subject}"),
                duration: weeks_label(b),
                topics: strings(&["Deeper concepts", "Practical applications", "Problem solving"]),
                resources: strings(&["Hands-on projects", "Case studies", "Peer discussions"]),
            },
            PathModule {
                title: format!("Advanced {subject}"),
                duration: weeks_label(c),
                topics: strings(&["Expert techniques", "Real-world applications", "Independent work"]),
                resources: strings(&["Capstone project", "Research reading", "Expert talks"]),
            },
        ],
        total_duration: timeframe.trim().to_string(),
        estimated_hours: (a + b + c) * HOURS_PER_WEEK,
    }
}
