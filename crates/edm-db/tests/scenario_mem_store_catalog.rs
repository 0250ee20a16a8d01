//! scenario_mem_store_catalog
//!
//! Exercises the in-process store end to end: users, courses with lessons,
//! enrollment, lesson completion and the cascade on course delete.

use chrono::{Duration, Utc};
use edm_db::{seed_demo, MemStore, Store, StoreError, DEMO_PASSWORD};
use edm_schemas::{
    AchievementKind, CourseFilter, CoursePatch, Difficulty, EnrollmentStatus, LearningStyle,
    LessonType, NewAchievementRecord, NewCourse, NewLesson, NewUser, Role, UserPatch,
};

fn new_user(email: &str, username: &str, role: Role) -> NewUser {
    NewUser {
        email: email.into(),
        username: username.into(),
        first_name: "Test".into(),
        last_name: "User".into(),
        password_hash: "hash".into(),
        role,
        learning_style: LearningStyle::Auditory,
        grade: None,
        school: None,
        bio: None,
        points: 0,
        level: 1,
    }
}

fn new_course(title: &str, creator: uuid::Uuid, published: bool) -> NewCourse {
    NewCourse {
        title: title.into(),
        description: "Course description".into(),
        category: "Mathematics".into(),
        level: Difficulty::Beginner,
        tags: vec!["algebra".into()],
        thumbnail: None,
        estimated_hours: 5,
        is_published: published,
        creator_id: creator,
    }
}

fn new_lesson(title: &str, order: i32, duration: i32) -> NewLesson {
    NewLesson {
        title: title.into(),
        content: "Body".into(),
        lesson_type: LessonType::Text,
        order,
        duration,
    }
}

#[tokio::test]
async fn duplicate_email_and_username_conflict_with_named_field() {
    let s = MemStore::new();
    s.create_user(new_user("a@x.io", "alpha", Role::Student))
        .await
        .unwrap();

    let err = s
        .create_user(new_user("a@x.io", "other", Role::Student))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m.contains("email")));

    let err = s
        .create_user(new_user("b@x.io", "alpha", Role::Student))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m.contains("username")));
}

#[tokio::test]
async fn profile_patch_and_points() {
    let s = MemStore::new();
    let u = s
        .create_user(new_user("p@x.io", "pat", Role::Student))
        .await
        .unwrap();

    let patched = s
        .update_user(
            u.id,
            UserPatch {
                bio: Some("hello".into()),
                learning_style: Some(LearningStyle::Reading),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.bio.as_deref(), Some("hello"));
    assert_eq!(patched.learning_style, LearningStyle::Reading);
    assert_eq!(patched.first_name, "Test");

    assert_eq!(s.add_points(u.id, 25).await.unwrap(), 25);
    assert_eq!(s.add_points(u.id, 10).await.unwrap(), 35);
    assert!(matches!(
        s.add_points(uuid::Uuid::new_v4(), 1).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn course_listing_filters_orders_and_aggregates() {
    let s = MemStore::new();
    let t = s
        .create_user(new_user("t@x.io", "teach", Role::Teacher))
        .await
        .unwrap();

    let first = s.create_course(new_course("Algebra", t.id, true)).await.unwrap();
    let _draft = s.create_course(new_course("Draft", t.id, false)).await.unwrap();
    let second = s
        .create_course(new_course("Geometry", t.id, true))
        .await
        .unwrap();

    s.create_lesson(first.id, new_lesson("Two", 2, 20)).await.unwrap();
    s.create_lesson(first.id, new_lesson("One", 1, 10)).await.unwrap();

    let listed = s.list_courses(&CourseFilter::published()).await.unwrap();
    let titles: Vec<&str> = listed.iter().map(|c| c.course.title.as_str()).collect();
    assert_eq!(titles, vec!["Geometry", "Algebra"]);
    assert_eq!(listed[0].course.id, second.id);

    let algebra = &listed[1];
    assert_eq!(algebra.lesson_count, 2);
    assert_eq!(algebra.total_duration, 30);
    assert_eq!(algebra.lessons[0].title, "One");
    assert_eq!(
        algebra.creator.as_ref().map(|c| c.username.as_str()),
        Some("teach")
    );

    let mut f = CourseFilter::published();
    f.search = Some("GEOM".into());
    let hits = s.list_courses(&f).await.unwrap();
    assert_eq!(hits.len(), 1);

    let patched = s
        .update_course(
            second.id,
            CoursePatch {
                level: Some(Difficulty::Advanced),
                ..CoursePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.level, Difficulty::Advanced);
    assert_eq!(patched.title, "Geometry");
}

#[tokio::test]
async fn enrollment_completion_and_cascade() {
    let s = MemStore::new();
    let t = s
        .create_user(new_user("t@x.io", "teach", Role::Teacher))
        .await
        .unwrap();
    let st = s
        .create_user(new_user("s@x.io", "stud", Role::Student))
        .await
        .unwrap();
    let c = s.create_course(new_course("Algebra", t.id, true)).await.unwrap();
    let l1 = s.create_lesson(c.id, new_lesson("One", 1, 10)).await.unwrap();
    let l2 = s.create_lesson(c.id, new_lesson("Two", 2, 10)).await.unwrap();

    let now = Utc::now();
    s.create_enrollment(st.id, c.id, now).await.unwrap();
    assert!(matches!(
        s.create_enrollment(st.id, c.id, now).await,
        Err(StoreError::Conflict(_))
    ));
    assert!(matches!(
        s.create_enrollment(st.id, uuid::Uuid::new_v4(), now).await,
        Err(StoreError::NotFound)
    ));

    let first = s.upsert_lesson_progress(st.id, l1.id, 12, now).await.unwrap();
    assert!(first.newly_completed);
    let again = s.upsert_lesson_progress(st.id, l1.id, 15, now).await.unwrap();
    assert!(!again.newly_completed);
    assert_eq!(again.progress.time_spent, 15);

    s.upsert_lesson_progress(st.id, l2.id, 5, now).await.unwrap();
    assert_eq!(s.count_completed_lessons(st.id, Some(c.id)).await.unwrap(), 2);
    assert_eq!(s.count_lessons(c.id).await.unwrap(), 2);

    let e = s
        .set_enrollment_progress(st.id, c.id, 100.0, Some(now))
        .await
        .unwrap();
    assert!(e.newly_completed);
    assert_eq!(e.enrollment.status, EnrollmentStatus::Completed);
    let later = now + Duration::minutes(5);
    let again = s
        .set_enrollment_progress(st.id, c.id, 100.0, Some(later))
        .await
        .unwrap();
    assert!(!again.newly_completed);
    assert_eq!(again.enrollment.completed_at, Some(now));
    assert_eq!(
        s.count_enrollments_for_user(st.id, Some(EnrollmentStatus::Completed))
            .await
            .unwrap(),
        1
    );

    let recent = s
        .recent_completions(st.id, now - Duration::days(7), 10)
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].course_title, "Algebra");

    let mine = s.enrollments_for_user(st.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].course.lesson_count, 2);

    s.delete_course(c.id).await.unwrap();
    assert!(s.lesson_by_id(l1.id).await.unwrap().is_none());
    assert!(s.enrollment(st.id, c.id).await.unwrap().is_none());
    assert_eq!(s.count_completed_lessons(st.id, None).await.unwrap(), 0);
    assert!(matches!(s.delete_course(c.id).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn achievement_ledger_is_newest_first_and_limited() {
    let s = MemStore::new();
    let u = s
        .create_user(new_user("a@x.io", "alpha", Role::Student))
        .await
        .unwrap();
    for i in 0..3 {
        s.create_achievement_record(NewAchievementRecord {
            user_id: u.id,
            kind: AchievementKind::Engagement,
            title: format!("entry {i}"),
            description: "d".into(),
            points: 5,
            metadata: None,
        })
        .await
        .unwrap();
    }
    let recs = s.achievement_records(u.id, 2).await.unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].title, "entry 2");
}

#[tokio::test]
async fn demo_seed_is_idempotent() {
    let s = MemStore::new();
    let first = seed_demo(&s, "hashed").await.unwrap();
    assert_eq!(first.users_created, 3);
    assert_eq!(first.courses_created, 2);
    assert_eq!(first.lessons_created, 5);
    assert_eq!(first.enrollments_created, 2);
    assert_eq!(first.achievements_created, 2);

    let second = seed_demo(&s, "hashed").await.unwrap();
    assert_eq!(second.users_created, 0);
    assert_eq!(second.users_existing, 3);
    assert_eq!(second.courses_created, 0);
    assert_eq!(second.enrollments_created, 0);
    assert_eq!(second.achievements_created, 0);

    let student = s
        .user_by_email("student@edumind.ai")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(student.points, 150);
    assert_eq!(s.enrollments_for_user(student.id).await.unwrap().len(), 2);
    assert!(!DEMO_PASSWORD.is_empty());
}
