//! scenario_pg_store_roundtrip
//!
//! Requires a live PostgreSQL instance reachable via EDM_DATABASE_URL.
//! Tests skip when that variable is absent. Every row uses fresh unique
//! emails/usernames so reruns against the same database do not collide.

use chrono::Utc;
use edm_db::{Store, StoreError, ENV_DB_URL};
use edm_schemas::{
    CourseFilter, Difficulty, EnrollmentStatus, LearningStyle, LessonType, NewCourse, NewLesson,
    NewUser, Role,
};
use uuid::Uuid;

async fn store() -> anyhow::Result<Option<edm_db::PgStore>> {
    let url = match std::env::var(ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: {ENV_DB_URL} not set");
            return Ok(None);
        }
    };
    let pool = edm_db::connect(&url, 4).await?;
    edm_db::migrate(&pool).await?;
    Ok(Some(edm_db::PgStore::new(pool)))
}

fn new_user(tag: &str, role: Role) -> NewUser {
    NewUser {
        email: format!("{tag}@scenario.test"),
        username: tag.to_string(),
        first_name: "Scenario".into(),
        last_name: "User".into(),
        password_hash: "hash".into(),
        role,
        learning_style: LearningStyle::Visual,
        grade: None,
        school: None,
        bio: None,
        points: 0,
        level: 1,
    }
}

#[tokio::test]
async fn status_reports_schema() -> anyhow::Result<()> {
    let Some(s) = store().await? else {
        return Ok(());
    };
    let st = edm_db::status(s.pool()).await?;
    assert!(st.ok);
    assert!(st.has_users_table);
    Ok(())
}

#[tokio::test]
async fn unique_violations_map_to_conflict() -> anyhow::Result<()> {
    let Some(s) = store().await? else {
        return Ok(());
    };
    let tag = format!("u{}", Uuid::new_v4().simple());
    s.create_user(new_user(&tag, Role::Student)).await?;

    let mut dup_email = new_user(&tag, Role::Student);
    dup_email.username = format!("{tag}x");
    let err = s.create_user(dup_email).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m.contains("email")));

    let mut dup_name = new_user(&tag, Role::Student);
    dup_name.email = format!("{tag}x@scenario.test");
    let err = s.create_user(dup_name).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m.contains("username")));
    Ok(())
}

#[tokio::test]
async fn course_lesson_enrollment_flow() -> anyhow::Result<()> {
    let Some(s) = store().await? else {
        return Ok(());
    };
    let tag = format!("t{}", Uuid::new_v4().simple());
    let teacher = s.create_user(new_user(&tag, Role::Teacher)).await?;
    let student = s
        .create_user(new_user(&format!("{tag}s"), Role::Student))
        .await?;

    let course = s
        .create_course(NewCourse {
            title: format!("Course {tag}"),
            description: "100% practical".into(),
            category: "Science".into(),
            level: Difficulty::Advanced,
            tags: vec![tag.clone()],
            thumbnail: None,
            estimated_hours: 3,
            is_published: true,
            creator_id: teacher.id,
        })
        .await?;
    let lesson = s
        .create_lesson(
            course.id,
            NewLesson {
                title: "Only lesson".into(),
                content: "Body".into(),
                lesson_type: LessonType::Quiz,
                order: 1,
                duration: 15,
            },
        )
        .await?;

    let mut f = CourseFilter::published();
    f.search = Some(tag.clone());
    let hits = s.list_courses(&f).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].lesson_count, 1);
    assert_eq!(hits[0].total_duration, 15);

    let now = Utc::now();
    s.create_enrollment(student.id, course.id, now).await?;
    assert!(matches!(
        s.create_enrollment(student.id, course.id, now).await,
        Err(StoreError::Conflict(_))
    ));

    let first = s.upsert_lesson_progress(student.id, lesson.id, 10, now).await?;
    assert!(first.newly_completed);
    let again = s.upsert_lesson_progress(student.id, lesson.id, 12, now).await?;
    assert!(!again.newly_completed);

    let e = s
        .set_enrollment_progress(student.id, course.id, 100.0, Some(now))
        .await?;
    assert!(e.newly_completed);
    assert_eq!(e.enrollment.status, EnrollmentStatus::Completed);
    let again = s
        .set_enrollment_progress(student.id, course.id, 100.0, Some(now))
        .await?;
    assert!(!again.newly_completed);

    s.delete_course(course.id).await?;
    assert!(s.lesson_by_id(lesson.id).await?.is_none());
    assert_eq!(s.count_completed_lessons(student.id, None).await?, 0);
    Ok(())
}
