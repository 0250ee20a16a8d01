//! `/api/learning`: course catalog, authoring, enrollment and lesson
//! progress. Every route here requires a bearer token.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Duration, Utc};
use edm_db::StoreError;
use edm_schemas::{
    AchievementKind, Course, CourseDetail, CourseFilter, CoursePatch, Difficulty,
    EnrollmentStatus, LessonPatch, LessonType, NewAchievementRecord, NewCourse, NewLesson, Role,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{credit_record, current_user, percent};
use crate::{
    api_types::{
        CompleteLessonRequest, CourseEnvelope, CourseList, CourseQuery, CourseRef,
        CourseRequest, CourseWithProgress, EnrollResponse, LearningProgress, LearningStats,
        LessonCompleteResponse, LessonEnvelope, LessonRequest, LessonView, MessageResponse,
        MyCourse, MyCourses, PointsSnapshot, ProgressEnvelope,
    },
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
    validate::{parse_id, ApiJson, Checks},
};

pub(super) const ENROLL_POINTS: i32 = 10;
pub(super) const FIRST_LESSON_POINTS: i32 = 15;
pub(super) const COURSE_COMPLETION_POINTS: i32 = 100;
const RECENT_ACTIVITY_DAYS: i64 = 30;
const RECENT_ACTIVITY_LIMIT: i64 = 20;

pub(super) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/:id",
            get(course_detail).put(update_course).delete(delete_course),
        )
        .route("/courses/:id/lessons", post(create_lesson))
        .route("/courses/:id/enroll", post(enroll))
        .route("/my-courses", get(my_courses))
        .route(
            "/lessons/:id",
            get(lesson_detail).put(update_lesson).delete(delete_lesson),
        )
        .route("/lessons/:id/complete", post(complete_lesson))
        .route("/progress", get(learning_progress))
}

fn manages(auth: &AuthUser, course: &Course) -> bool {
    auth.role() == Role::Admin || course.creator_id == auth.id()
}

/// Unpublished courses are invisible to everyone but their managers.
async fn visible_course(st: &AppState, auth: &AuthUser, id: Uuid) -> ApiResult<CourseDetail> {
    match st.store.course_by_id(id).await? {
        Some(d) if d.course.is_published || manages(auth, &d.course) => Ok(d),
        _ => Err(ApiError::not_found("Course")),
    }
}

async fn managed_course(st: &AppState, auth: &AuthUser, id: Uuid) -> ApiResult<CourseDetail> {
    let detail = st
        .store
        .course_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course"))?;
    if !manages(auth, &detail.course) {
        return Err(ApiError::Forbidden(
            "Only the course creator or an admin can modify this course".into(),
        ));
    }
    Ok(detail)
}

fn not_found_as(what: &'static str) -> impl Fn(StoreError) -> ApiError {
    move |e| match e {
        StoreError::NotFound => ApiError::not_found(what),
        other => other.into(),
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

pub(crate) async fn list_courses(
    State(st): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(q): Query<CourseQuery>,
) -> ApiResult<impl IntoResponse> {
    let mut c = Checks::new();
    let level = c.one_of(q.level.as_deref(), "level", Difficulty::parse);
    c.finish()?;
    let filter = CourseFilter {
        category: q.category.filter(|s| !s.trim().is_empty()),
        level,
        search: q.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        published_only: true,
    };
    let courses = st.store.list_courses(&filter).await?;
    Ok(Json(CourseList { courses }))
}

pub(crate) async fn course_detail(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "Course")?;
    let course = visible_course(&st, &auth, id).await?;
    Ok(Json(CourseEnvelope {
        message: None,
        course,
    }))
}

pub(crate) async fn create_course(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CourseRequest>,
) -> ApiResult<impl IntoResponse> {
    if !auth.role().can_author() {
        return Err(ApiError::Forbidden(
            "Only teachers and admins can create courses".into(),
        ));
    }
    let mut c = Checks::new();
    let title = c.required(body.title.as_deref(), "title");
    let description = c.required(body.description.as_deref(), "description");
    let category = c.required(body.category.as_deref(), "category");
    let level = c
        .one_of(body.level.as_deref(), "level", Difficulty::parse)
        .unwrap_or(Difficulty::Beginner);
    let estimated_hours = body.estimated_hours.unwrap_or(0);
    c.check(estimated_hours >= 0, "estimatedHours", "must not be negative");
    c.finish()?;

    let course = st
        .store
        .create_course(NewCourse {
            title,
            description,
            category,
            level,
            tags: body.tags.unwrap_or_default(),
            thumbnail: body.thumbnail,
            estimated_hours,
            is_published: body.is_published.unwrap_or(false),
            creator_id: auth.id(),
        })
        .await?;
    info!(course_id = %course.id, creator = %auth.id(), "course created");
    Ok((
        StatusCode::CREATED,
        Json(CourseEnvelope {
            message: Some("Course created successfully"),
            course,
        }),
    ))
}

pub(crate) async fn update_course(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CourseRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "Course")?;
    managed_course(&st, &auth, id).await?;

    let mut c = Checks::new();
    let title = non_blank(body.title);
    let description = non_blank(body.description);
    let category = non_blank(body.category);
    for (v, field) in [
        (&title, "title"),
        (&description, "description"),
        (&category, "category"),
    ] {
        c.check(
            v.as_deref().map_or(true, |s| !s.is_empty()),
            field,
            "must not be empty",
        );
    }
    let level = c.one_of(body.level.as_deref(), "level", Difficulty::parse);
    c.check(
        body.estimated_hours.map_or(true, |h| h >= 0),
        "estimatedHours",
        "must not be negative",
    );
    c.finish()?;

    let course = st
        .store
        .update_course(
            id,
            CoursePatch {
                title,
                description,
                category,
                level,
                tags: body.tags,
                thumbnail: body.thumbnail,
                estimated_hours: body.estimated_hours,
                is_published: body.is_published,
            },
        )
        .await
        .map_err(not_found_as("Course"))?;
    Ok(Json(CourseEnvelope {
        message: Some("Course updated successfully"),
        course,
    }))
}

pub(crate) async fn delete_course(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "Course")?;
    managed_course(&st, &auth, id).await?;
    st.store
        .delete_course(id)
        .await
        .map_err(not_found_as("Course"))?;
    info!(course_id = %id, by = %auth.id(), "course deleted");
    Ok(Json(MessageResponse {
        message: "Course deleted successfully".into(),
    }))
}

// ---------------------------------------------------------------------------
// Lesson authoring
// ---------------------------------------------------------------------------

pub(crate) async fn create_lesson(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<LessonRequest>,
) -> ApiResult<impl IntoResponse> {
    let course_id = parse_id(&id, "Course")?;
    managed_course(&st, &auth, course_id).await?;

    let mut c = Checks::new();
    let title = c.required(body.title.as_deref(), "title");
    let content = c.required(body.content.as_deref(), "content");
    let lesson_type = c
        .one_of(body.lesson_type.as_deref(), "type", LessonType::parse)
        .unwrap_or_default();
    let duration = body.duration.unwrap_or(0);
    c.check(duration >= 0, "duration", "must not be negative");
    c.finish()?;

    let order = match body.order {
        Some(o) => o,
        None => i32::try_from(st.store.count_lessons(course_id).await?)
            .unwrap_or(i32::MAX)
            .saturating_add(1),
    };
    let lesson = st
        .store
        .create_lesson(
            course_id,
            NewLesson {
                title,
                content,
                lesson_type,
                order,
                duration,
            },
        )
        .await
        .map_err(not_found_as("Course"))?;
    Ok((
        StatusCode::CREATED,
        Json(LessonEnvelope {
            message: Some("Lesson created successfully"),
            lesson,
        }),
    ))
}

async fn managed_lesson(
    st: &AppState,
    auth: &AuthUser,
    raw_id: &str,
) -> ApiResult<edm_schemas::Lesson> {
    let id = parse_id(raw_id, "Lesson")?;
    let lesson = st
        .store
        .lesson_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson"))?;
    managed_course(st, auth, lesson.course_id).await?;
    Ok(lesson)
}

pub(crate) async fn update_lesson(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<LessonRequest>,
) -> ApiResult<impl IntoResponse> {
    let lesson = managed_lesson(&st, &auth, &id).await?;

    let mut c = Checks::new();
    let title = non_blank(body.title);
    let content = non_blank(body.content);
    c.check(
        title.as_deref().map_or(true, |s| !s.is_empty()),
        "title",
        "must not be empty",
    );
    c.check(
        content.as_deref().map_or(true, |s| !s.is_empty()),
        "content",
        "must not be empty",
    );
    let lesson_type = c.one_of(body.lesson_type.as_deref(), "type", LessonType::parse);
    c.check(
        body.duration.map_or(true, |d| d >= 0),
        "duration",
        "must not be negative",
    );
    c.finish()?;

    let lesson = st
        .store
        .update_lesson(
            lesson.id,
            LessonPatch {
                title,
                content,
                lesson_type,
                order: body.order,
                duration: body.duration,
            },
        )
        .await
        .map_err(not_found_as("Lesson"))?;
    Ok(Json(LessonEnvelope {
        message: Some("Lesson updated successfully"),
        lesson,
    }))
}

pub(crate) async fn delete_lesson(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let lesson = managed_lesson(&st, &auth, &id).await?;
    st.store
        .delete_lesson(lesson.id)
        .await
        .map_err(not_found_as("Lesson"))?;
    Ok(Json(MessageResponse {
        message: "Lesson deleted successfully".into(),
    }))
}

// ---------------------------------------------------------------------------
// Enrollment
// ---------------------------------------------------------------------------

fn already_enrolled() -> ApiError {
    ApiError::Conflict {
        error: "Already enrolled".into(),
        message: "You are already enrolled in this course".into(),
    }
}

pub(crate) async fn enroll(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let course_id = parse_id(&id, "Course")?;
    let detail = visible_course(&st, &auth, course_id).await?;
    let user_id = auth.id();
    if st.store.enrollment(user_id, course_id).await?.is_some() {
        return Err(already_enrolled());
    }

    let now = Utc::now();
    let enrollment = st
        .store
        .create_enrollment(user_id, course_id, now)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => already_enrolled(),
            other => other.into(),
        })?;

    let title = &detail.course.title;
    credit_record(
        &st,
        NewAchievementRecord {
            user_id,
            kind: AchievementKind::Engagement,
            title: "Course Enrolled".into(),
            description: format!("Enrolled in {title}"),
            points: ENROLL_POINTS,
            metadata: Some(json!({ "courseId": course_id, "courseName": title })),
        },
    )
    .await?;

    let outcome = st
        .progress
        .update(user_id, now, |p| {
            edm_gamify::record_enrollment(p, course_id, now)
        })
        .await;
    st.announce(user_id, "enrollment", &outcome);
    info!(%user_id, %course_id, "enrolled");

    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            message: "Successfully enrolled in course",
            enrollment,
            new_achievements: outcome.new_achievements,
        }),
    ))
}

pub(crate) async fn my_courses(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user_id = auth.id();
    let mut enrollments = Vec::new();
    for ec in st.store.enrollments_for_user(user_id).await? {
        let completed_lessons = st
            .store
            .count_completed_lessons(user_id, Some(ec.course.course.id))
            .await?;
        let progress = percent(completed_lessons, ec.course.lesson_count).round() as i64;
        enrollments.push(MyCourse {
            enrollment: ec.enrollment,
            course: CourseWithProgress {
                summary: ec.course,
                completed_lessons,
                progress,
            },
        });
    }
    Ok(Json(MyCourses { enrollments }))
}

// ---------------------------------------------------------------------------
// Lessons (learner side)
// ---------------------------------------------------------------------------

/// Lesson plus its course, gated on enrollment (managers pass without one).
async fn accessible_lesson(
    st: &AppState,
    auth: &AuthUser,
    raw_id: &str,
    denied: &str,
) -> ApiResult<(edm_schemas::Lesson, CourseDetail, Option<edm_schemas::Enrollment>)> {
    let id = parse_id(raw_id, "Lesson")?;
    let lesson = st
        .store
        .lesson_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson"))?;
    let detail = st
        .store
        .course_by_id(lesson.course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course"))?;
    let enrollment = st.store.enrollment(auth.id(), lesson.course_id).await?;
    if enrollment.is_none() && !manages(auth, &detail.course) {
        return Err(ApiError::Forbidden(denied.to_string()));
    }
    Ok((lesson, detail, enrollment))
}

pub(crate) async fn lesson_detail(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (lesson, detail, _) = accessible_lesson(
        &st,
        &auth,
        &id,
        "You must be enrolled in the course to access this lesson",
    )
    .await?;
    let user_progress = st.store.lesson_progress(auth.id(), lesson.id).await?;
    Ok(Json(LessonEnvelope {
        message: None,
        lesson: LessonView {
            course: CourseRef {
                id: detail.course.id,
                title: detail.course.title,
            },
            lesson,
            user_progress,
        },
    }))
}

pub(crate) async fn complete_lesson(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    body: Option<ApiJson<CompleteLessonRequest>>,
) -> ApiResult<impl IntoResponse> {
    let (lesson, detail, enrollment) = accessible_lesson(
        &st,
        &auth,
        &id,
        "You must be enrolled in the course to complete this lesson",
    )
    .await?;
    if enrollment.is_none() {
        return Err(ApiError::Forbidden(
            "You must be enrolled in the course to complete this lesson".into(),
        ));
    }
    let user_id = auth.id();
    let course_id = detail.course.id;
    let time_spent = body
        .and_then(|ApiJson(b)| b.time_spent)
        .unwrap_or(0)
        .max(0);

    let now = Utc::now();
    let completion = st
        .store
        .upsert_lesson_progress(user_id, lesson.id, time_spent, now)
        .await?;

    let total = st.store.count_lessons(course_id).await?;
    let done = st.store.count_completed_lessons(user_id, Some(course_id)).await?;
    let course_progress = percent(done, total);
    let all_done = total > 0 && done >= total;
    // Only the request that flips the enrollment credits the completion.
    let finishes_course = st
        .store
        .set_enrollment_progress(user_id, course_id, course_progress, all_done.then_some(now))
        .await?
        .newly_completed;

    if completion.newly_completed && st.store.count_completed_lessons(user_id, None).await? == 1 {
        credit_record(
            &st,
            NewAchievementRecord {
                user_id,
                kind: AchievementKind::LessonStreak,
                title: "First Lesson Complete!".into(),
                description: "Completed your first lesson".into(),
                points: FIRST_LESSON_POINTS,
                metadata: Some(json!({ "lessonId": lesson.id, "lessonTitle": lesson.title })),
            },
        )
        .await?;
    }
    if finishes_course {
        credit_record(
            &st,
            NewAchievementRecord {
                user_id,
                kind: AchievementKind::CourseCompletion,
                title: "Course Completed!".into(),
                description: format!("Completed {}", detail.course.title),
                points: COURSE_COMPLETION_POINTS,
                metadata: Some(json!({ "courseId": course_id, "courseName": detail.course.title })),
            },
        )
        .await?;
        info!(%user_id, %course_id, "course completed");
    }

    let newly = completion.newly_completed;
    let (new_achievements, current_streak) = st
        .progress
        .update(user_id, now, |p| {
            let mut granted = Vec::new();
            if newly {
                granted.extend(edm_gamify::record_lesson_completion(p, now).new_achievements);
            }
            if finishes_course {
                granted.extend(
                    edm_gamify::record_course_completion(p, course_id, now).new_achievements,
                );
            }
            (granted, p.learning_streak)
        })
        .await;
    st.announce_achievements(user_id, &new_achievements);

    Ok(Json(LessonCompleteResponse {
        message: "Lesson marked as completed",
        progress: completion.progress,
        course_progress: course_progress.round() as i64,
        new_achievements,
        current_streak,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/learning/progress
// ---------------------------------------------------------------------------

pub(crate) async fn learning_progress(
    State(st): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = current_user(&st, &auth).await?;
    let total_enrollments = st.store.count_enrollments_for_user(user.id, None).await?;
    let completed_courses = st
        .store
        .count_enrollments_for_user(user.id, Some(EnrollmentStatus::Completed))
        .await?;
    let total_lessons_completed = st.store.count_completed_lessons(user.id, None).await?;
    let recent_achievements = st.store.achievement_records(user.id, 10).await?;
    let since = Utc::now() - Duration::days(RECENT_ACTIVITY_DAYS);
    let recent_activity = st
        .store
        .recent_completions(user.id, since, RECENT_ACTIVITY_LIMIT)
        .await?;

    Ok(Json(ProgressEnvelope {
        progress: LearningProgress {
            user: PointsSnapshot {
                points: user.points,
                level: user.level,
                created_at: user.created_at,
            },
            stats: LearningStats {
                total_enrollments,
                completed_courses,
                total_lessons_completed,
                completion_rate: percent(completed_courses, total_enrollments).round() as i64,
            },
            recent_achievements,
            recent_activity,
        },
    }))
}
