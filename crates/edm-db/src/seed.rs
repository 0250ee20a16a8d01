use chrono::Utc;
use edm_schemas::{
    AchievementKind, CourseFilter, Difficulty, LearningStyle, LessonType, NewAchievementRecord,
    NewCourse, NewLesson, NewUser, Role, User,
};
use serde::Serialize;

use crate::{Store, StoreResult};

/// Plain-text password of every demo account.
pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub users_created: u32,
    pub users_existing: u32,
    pub courses_created: u32,
    pub lessons_created: u32,
    pub enrollments_created: u32,
    pub achievements_created: u32,
}

struct DemoUser {
    email: &'static str,
    username: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    role: Role,
    bio: Option<&'static str>,
    grade: Option<&'static str>,
    school: Option<&'static str>,
    points: i64,
    level: i32,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        email: "admin@edumind.ai",
        username: "admin",
        first_name: "Admin",
        last_name: "User",
        role: Role::Admin,
        bio: Some("Platform administrator"),
        grade: None,
        school: None,
        points: 0,
        level: 1,
    },
    DemoUser {
        email: "teacher@edumind.ai",
        username: "teacher_sarah",
        first_name: "Sarah",
        last_name: "Johnson",
        role: Role::Teacher,
        bio: Some("Mathematics and Computer Science educator"),
        grade: None,
        school: Some("Tech High School"),
        points: 0,
        level: 1,
    },
    DemoUser {
        email: "student@edumind.ai",
        username: "student_alex",
        first_name: "Alex",
        last_name: "Smith",
        role: Role::Student,
        bio: None,
        grade: Some("10th Grade"),
        school: Some("Tech High School"),
        points: 150,
        level: 2,
    },
];

struct DemoCourse {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    level: Difficulty,
    tags: &'static [&'static str],
    estimated_hours: i32,
    lessons: &'static [(&'static str, &'static str, LessonType, i32)],
    /// Progress the demo student starts with.
    student_progress: f64,
}

const DEMO_COURSES: [DemoCourse; 2] = [
    DemoCourse {
        title: "Algebra Fundamentals",
        description: "Master the basics of algebra with interactive lessons and tutor support",
        category: "Mathematics",
        level: Difficulty::Beginner,
        tags: &["algebra", "math", "equations"],
        estimated_hours: 20,
        lessons: &[
            (
                "Introduction to Variables",
                "What variables are and how they stand in for numbers in an expression.",
                LessonType::Text,
                30,
            ),
            (
                "Solving Linear Equations",
                "Isolating the unknown in equations with one variable, step by step.",
                LessonType::Interactive,
                45,
            ),
            (
                "Graphing Linear Functions",
                "Plotting y = mx + b and reading slope and intercept from a graph.",
                LessonType::Video,
                35,
            ),
        ],
        student_progress: 25.0,
    },
    DemoCourse {
        title: "Introduction to Physics",
        description: "Explore the fundamental concepts of physics through small experiments",
        category: "Science",
        level: Difficulty::Intermediate,
        tags: &["physics", "science", "mechanics"],
        estimated_hours: 25,
        lessons: &[
            (
                "Newton's Laws of Motion",
                "The three laws that relate force, mass and motion.",
                LessonType::Text,
                40,
            ),
            (
                "Force and Acceleration",
                "Working with F = ma on everyday examples.",
                LessonType::Interactive,
                50,
            ),
        ],
        student_progress: 10.0,
    },
];

/// Inserts demo users, two published courses with lessons, the demo
/// student's enrollments and a couple of ledger entries.
///
/// Safe to run repeatedly: existing users are left untouched, courses are
/// matched by title and creator, enrollments by (user, course), and ledger
/// entries are only written when the student account is new.
pub async fn seed_demo(store: &dyn Store, password_hash: &str) -> StoreResult<SeedReport> {
    let mut report = SeedReport::default();
    let mut users: Vec<(User, bool)> = Vec::with_capacity(DEMO_USERS.len());

    for d in &DEMO_USERS {
        if let Some(existing) = store.user_by_email(d.email).await? {
            report.users_existing += 1;
            users.push((existing, false));
            continue;
        }
        let user = store
            .create_user(NewUser {
                email: d.email.to_string(),
                username: d.username.to_string(),
                first_name: d.first_name.to_string(),
                last_name: d.last_name.to_string(),
                password_hash: password_hash.to_string(),
                role: d.role,
                learning_style: LearningStyle::Visual,
                grade: d.grade.map(str::to_string),
                school: d.school.map(str::to_string),
                bio: d.bio.map(str::to_string),
                points: d.points,
                level: d.level,
            })
            .await?;
        tracing::info!(email = d.email, role = %d.role, "seeded demo user");
        report.users_created += 1;
        users.push((user, true));
    }

    let Some((teacher, _)) = users.iter().find(|(u, _)| u.role == Role::Teacher) else {
        return Ok(report);
    };
    let Some((student, student_is_new)) = users.iter().find(|(u, _)| u.role == Role::Student)
    else {
        return Ok(report);
    };

    let existing = store.list_courses(&CourseFilter::default()).await?;
    for d in &DEMO_COURSES {
        let course_id = match existing
            .iter()
            .find(|c| c.course.title == d.title && c.course.creator_id == teacher.id)
        {
            Some(c) => c.course.id,
            None => {
                let course = store
                    .create_course(NewCourse {
                        title: d.title.to_string(),
                        description: d.description.to_string(),
                        category: d.category.to_string(),
                        level: d.level,
                        tags: d.tags.iter().map(|t| t.to_string()).collect(),
                        thumbnail: None,
                        estimated_hours: d.estimated_hours,
                        is_published: true,
                        creator_id: teacher.id,
                    })
                    .await?;
                report.courses_created += 1;
                for (i, (title, content, lesson_type, duration)) in d.lessons.iter().enumerate() {
                    store
                        .create_lesson(
                            course.id,
                            NewLesson {
                                title: title.to_string(),
                                content: content.to_string(),
                                lesson_type: *lesson_type,
                                order: i as i32 + 1,
                                duration: *duration,
                            },
                        )
                        .await?;
                    report.lessons_created += 1;
                }
                tracing::info!(title = d.title, "seeded demo course");
                course.id
            }
        };

        if store.enrollment(student.id, course_id).await?.is_none() {
            store
                .create_enrollment(student.id, course_id, Utc::now())
                .await?;
            store
                .set_enrollment_progress(student.id, course_id, d.student_progress, None)
                .await?;
            report.enrollments_created += 1;
        }
    }

    if *student_is_new {
        let ledger = [
            (
                AchievementKind::LessonStreak,
                "Getting Started",
                "Completed first lesson",
                10,
            ),
            (
                AchievementKind::Engagement,
                "AI Helper",
                "Used the AI tutor for the first time",
                15,
            ),
        ];
        for (kind, title, description, points) in ledger {
            store
                .create_achievement_record(NewAchievementRecord {
                    user_id: student.id,
                    kind,
                    title: title.to_string(),
                    description: description.to_string(),
                    points,
                    metadata: None,
                })
                .await?;
            report.achievements_created += 1;
        }
    }

    Ok(report)
}
