use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edm_schemas::{
    AchievementKind, AchievementRecord, CompletedLesson, Course, CourseDetail, CourseFilter,
    CoursePatch, CourseSummary, CreatorInfo, Difficulty, EnrolledCourse, Enrollment,
    EnrollmentStatus, LearningStyle, Lesson, LessonOutline, LessonPatch, LessonProgress,
    LessonType, NewAchievementRecord, NewCourse, NewLesson, NewUser, Role, User, UserPatch,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    like_escape, EnrollmentUpdate, LessonCompletion, Store, StoreError, StoreResult, ENV_DB_URL,
};

// ---------------------------------------------------------------------------
// Pool, migrations, status
// ---------------------------------------------------------------------------

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Connect to Postgres using EDM_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, 10).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_users_table: bool,
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='users'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_users_table: exists,
    })
}

// ---------------------------------------------------------------------------
// Column lists and row mapping
// ---------------------------------------------------------------------------

macro_rules! user_cols {
    () => {
        "id, email, username, first_name, last_name, password_hash, role, avatar, bio, \
         learning_style, grade, school, timezone, points, level, created_at, updated_at, \
         last_active"
    };
}

macro_rules! course_cols {
    () => {
        "c.id, c.title, c.description, c.category, c.level, c.tags, c.thumbnail, \
         c.estimated_hours, c.is_published, c.creator_id, c.created_at, c.updated_at, \
         u.first_name as creator_first_name, u.last_name as creator_last_name, \
         u.username as creator_username, \
         (select count(*) from course_enrollments e where e.course_id = c.id)::bigint \
         as enrollment_count"
    };
}

macro_rules! lesson_cols {
    () => {
        "id, course_id, title, content, lesson_type, position, duration, created_at, updated_at"
    };
}

macro_rules! enrollment_cols {
    () => {
        "id, user_id, course_id, status, progress, enrolled_at, completed_at"
    };
}

macro_rules! progress_cols {
    () => {
        "id, user_id, lesson_id, completed, time_spent, completed_at"
    };
}

macro_rules! achievement_cols {
    () => {
        "id, user_id, kind, title, description, points, metadata, created_at"
    };
}

fn text_col<T>(r: &PgRow, col: &str, parse: fn(&str) -> Option<T>) -> StoreResult<T> {
    let s: String = r.try_get(col)?;
    parse(&s).ok_or_else(|| StoreError::Corrupt(format!("{col}={s}")))
}

fn user_from_row(r: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: r.try_get("id")?,
        email: r.try_get("email")?,
        username: r.try_get("username")?,
        first_name: r.try_get("first_name")?,
        last_name: r.try_get("last_name")?,
        password_hash: r.try_get("password_hash")?,
        role: text_col(r, "role", Role::parse)?,
        avatar: r.try_get("avatar")?,
        bio: r.try_get("bio")?,
        learning_style: text_col(r, "learning_style", LearningStyle::parse)?,
        grade: r.try_get("grade")?,
        school: r.try_get("school")?,
        timezone: r.try_get("timezone")?,
        points: r.try_get("points")?,
        level: r.try_get("level")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
        last_active: r.try_get("last_active")?,
    })
}

fn course_from_row(r: &PgRow) -> StoreResult<Course> {
    Ok(Course {
        id: r.try_get("id")?,
        title: r.try_get("title")?,
        description: r.try_get("description")?,
        category: r.try_get("category")?,
        level: text_col(r, "level", Difficulty::parse)?,
        tags: r.try_get("tags")?,
        thumbnail: r.try_get("thumbnail")?,
        estimated_hours: r.try_get("estimated_hours")?,
        is_published: r.try_get("is_published")?,
        creator_id: r.try_get("creator_id")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn creator_from_row(r: &PgRow) -> StoreResult<Option<CreatorInfo>> {
    let username: Option<String> = r.try_get("creator_username")?;
    let Some(username) = username else {
        return Ok(None);
    };
    Ok(Some(CreatorInfo {
        first_name: r.try_get("creator_first_name")?,
        last_name: r.try_get("creator_last_name")?,
        username,
    }))
}

/// Summary without lessons; see [`PgStore::attach_lessons`].
fn summary_from_row(r: &PgRow) -> StoreResult<CourseSummary> {
    Ok(CourseSummary {
        course: course_from_row(r)?,
        creator: creator_from_row(r)?,
        lessons: Vec::new(),
        total_duration: 0,
        enrollment_count: r.try_get("enrollment_count")?,
        lesson_count: 0,
    })
}

fn lesson_from_row(r: &PgRow) -> StoreResult<Lesson> {
    Ok(Lesson {
        id: r.try_get("id")?,
        course_id: r.try_get("course_id")?,
        title: r.try_get("title")?,
        content: r.try_get("content")?,
        lesson_type: text_col(r, "lesson_type", LessonType::parse)?,
        order: r.try_get("position")?,
        duration: r.try_get("duration")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn enrollment_from_row(r: &PgRow) -> StoreResult<Enrollment> {
    Ok(Enrollment {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        course_id: r.try_get("course_id")?,
        status: text_col(r, "status", EnrollmentStatus::parse)?,
        progress: r.try_get("progress")?,
        enrolled_at: r.try_get("enrolled_at")?,
        completed_at: r.try_get("completed_at")?,
    })
}

fn progress_from_row(r: &PgRow) -> StoreResult<LessonProgress> {
    Ok(LessonProgress {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        lesson_id: r.try_get("lesson_id")?,
        completed: r.try_get("completed")?,
        time_spent: r.try_get("time_spent")?,
        completed_at: r.try_get("completed_at")?,
    })
}

fn achievement_from_row(r: &PgRow) -> StoreResult<AchievementRecord> {
    Ok(AchievementRecord {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        kind: text_col(r, "kind", AchievementKind::parse)?,
        title: r.try_get("title")?,
        description: r.try_get("description")?,
        points: r.try_get("points")?,
        metadata: r.try_get("metadata")?,
        created_at: r.try_get("created_at")?,
    })
}

/// Maps constraint violations onto `Conflict` / `NotFound`.
///
/// `unique` pairs a constraint name with the conflict message it produces.
fn classify(err: sqlx::Error, unique: &[(&str, &str)]) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or_default();
            let msg = unique
                .iter()
                .find(|(name, _)| *name == constraint)
                .map(|(_, msg)| *msg)
                .unwrap_or("already exists");
            return StoreError::Conflict(msg.to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    StoreError::Database(err)
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fills `lessons`, `lesson_count` and `total_duration` with one query.
    async fn attach_lessons(&self, summaries: &mut [CourseSummary]) -> StoreResult<()> {
        if summaries.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = summaries.iter().map(|s| s.course.id).collect();
        let rows = sqlx::query(concat!(
            "select ",
            lesson_cols!(),
            " from lessons where course_id = any($1) order by position asc, created_at asc"
        ))
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut by_course: HashMap<Uuid, Vec<LessonOutline>> = HashMap::new();
        for r in &rows {
            let l = lesson_from_row(r)?;
            by_course
                .entry(l.course_id)
                .or_default()
                .push(LessonOutline::from(&l));
        }
        for s in summaries.iter_mut() {
            let lessons = by_course.remove(&s.course.id).unwrap_or_default();
            s.total_duration = lessons.iter().map(|l| l.duration).sum();
            s.lesson_count = lessons.len() as i64;
            s.lessons = lessons;
        }
        Ok(())
    }
}

const USER_UNIQUE: &[(&str, &str)] = &[
    ("users_email_key", "email already registered"),
    ("users_username_key", "username already taken"),
];

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let row = sqlx::query(concat!(
            r#"
            insert into users (
              id, email, username, first_name, last_name, password_hash, role,
              learning_style, grade, school, bio, points, level
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
            )
            returning "#,
            user_cols!()
        ))
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.username)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(new.learning_style.as_str())
        .bind(&new.grade)
        .bind(&new.school)
        .bind(&new.bio)
        .bind(new.points)
        .bind(new.level)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, USER_UNIQUE))?;
        user_from_row(&row)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query(concat!("select ", user_cols!(), " from users where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(concat!("select ", user_cols!(), " from users where email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> StoreResult<User> {
        let row = sqlx::query(concat!(
            r#"
            update users set
              first_name     = coalesce($2, first_name),
              last_name      = coalesce($3, last_name),
              bio            = coalesce($4, bio),
              learning_style = coalesce($5, learning_style),
              grade          = coalesce($6, grade),
              school         = coalesce($7, school),
              timezone       = coalesce($8, timezone),
              updated_at     = now()
            where id = $1
            returning "#,
            user_cols!()
        ))
        .bind(id)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.bio)
        .bind(patch.learning_style.map(|s| s.as_str()))
        .bind(&patch.grade)
        .bind(&patch.school)
        .bind(&patch.timezone)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref()
            .map(user_from_row)
            .transpose()?
            .ok_or(StoreError::NotFound)
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let res = sqlx::query("update users set last_active = $2 where id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn add_points(&self, id: Uuid, points: i64) -> StoreResult<i64> {
        let row: Option<(i64,)> =
            sqlx::query_as("update users set points = points + $2 where id = $1 returning points")
                .bind(id)
                .bind(points)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(p,)| p).ok_or(StoreError::NotFound)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(concat!("select ", user_cols!(), " from users order by created_at asc"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn list_courses(&self, filter: &CourseFilter) -> StoreResult<Vec<CourseSummary>> {
        let search = filter.search.as_deref().filter(|q| !q.is_empty());
        let pattern = search.map(|q| format!("%{}%", like_escape(q)));
        let rows = sqlx::query(concat!(
            "select ",
            course_cols!(),
            r#"
            from courses c
            left join users u on u.id = c.creator_id
            where (not $1::bool or c.is_published)
              and ($2::text is null or c.category = $2)
              and ($3::text is null or c.level = $3)
              and ($4::text is null
                   or c.title ilike $5::text
                   or c.description ilike $5::text
                   or $4 = any(c.tags))
            order by c.created_at desc
            "#
        ))
        .bind(filter.published_only)
        .bind(&filter.category)
        .bind(filter.level.map(|l| l.as_str()))
        .bind(search)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        let mut out = rows
            .iter()
            .map(summary_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        self.attach_lessons(&mut out).await?;
        Ok(out)
    }

    async fn course_by_id(&self, id: Uuid) -> StoreResult<Option<CourseDetail>> {
        let row = sqlx::query(concat!(
            "select ",
            course_cols!(),
            " from courses c left join users u on u.id = c.creator_id where c.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let lesson_rows = sqlx::query(concat!(
            "select ",
            lesson_cols!(),
            " from lessons where course_id = $1 order by position asc, created_at asc"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CourseDetail {
            course: course_from_row(&row)?,
            creator: creator_from_row(&row)?,
            lessons: lesson_rows
                .iter()
                .map(lesson_from_row)
                .collect::<StoreResult<Vec<_>>>()?,
            enrollment_count: row.try_get("enrollment_count")?,
        }))
    }

    async fn create_course(&self, new: NewCourse) -> StoreResult<Course> {
        let row = sqlx::query(
            r#"
            insert into courses (
              id, title, description, category, level, tags, thumbnail,
              estimated_hours, is_published, creator_id
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            returning id, title, description, category, level, tags, thumbnail,
                      estimated_hours, is_published, creator_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.level.as_str())
        .bind(&new.tags)
        .bind(&new.thumbnail)
        .bind(new.estimated_hours)
        .bind(new.is_published)
        .bind(new.creator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, &[]))?;
        course_from_row(&row)
    }

    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> StoreResult<Course> {
        let row = sqlx::query(
            r#"
            update courses set
              title           = coalesce($2, title),
              description     = coalesce($3, description),
              category        = coalesce($4, category),
              level           = coalesce($5, level),
              tags            = coalesce($6, tags),
              thumbnail       = coalesce($7, thumbnail),
              estimated_hours = coalesce($8, estimated_hours),
              is_published    = coalesce($9, is_published),
              updated_at      = now()
            where id = $1
            returning id, title, description, category, level, tags, thumbnail,
                      estimated_hours, is_published, creator_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.category)
        .bind(patch.level.map(|l| l.as_str()))
        .bind(&patch.tags)
        .bind(&patch.thumbnail)
        .bind(patch.estimated_hours)
        .bind(patch.is_published)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref()
            .map(course_from_row)
            .transpose()?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_course(&self, id: Uuid) -> StoreResult<()> {
        // Lessons, enrollments and lesson progress cascade.
        let res = sqlx::query("delete from courses where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn lesson_by_id(&self, id: Uuid) -> StoreResult<Option<Lesson>> {
        let row = sqlx::query(concat!("select ", lesson_cols!(), " from lessons where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(lesson_from_row).transpose()
    }

    async fn create_lesson(&self, course_id: Uuid, new: NewLesson) -> StoreResult<Lesson> {
        let row = sqlx::query(concat!(
            r#"
            insert into lessons (id, course_id, title, content, lesson_type, position, duration)
            values ($1, $2, $3, $4, $5, $6, $7)
            returning "#,
            lesson_cols!()
        ))
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.lesson_type.as_str())
        .bind(new.order)
        .bind(new.duration)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, &[]))?;
        lesson_from_row(&row)
    }

    async fn update_lesson(&self, id: Uuid, patch: LessonPatch) -> StoreResult<Lesson> {
        let row = sqlx::query(concat!(
            r#"
            update lessons set
              title       = coalesce($2, title),
              content     = coalesce($3, content),
              lesson_type = coalesce($4, lesson_type),
              position    = coalesce($5, position),
              duration    = coalesce($6, duration),
              updated_at  = now()
            where id = $1
            returning "#,
            lesson_cols!()
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.content)
        .bind(patch.lesson_type.map(|t| t.as_str()))
        .bind(patch.order)
        .bind(patch.duration)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref()
            .map(lesson_from_row)
            .transpose()?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_lesson(&self, id: Uuid) -> StoreResult<()> {
        let res = sqlx::query("delete from lessons where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count_lessons(&self, course_id: Uuid) -> StoreResult<i64> {
        let (n,): (i64,) =
            sqlx::query_as("select count(*)::bigint from lessons where course_id = $1")
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(n)
    }

    async fn enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let row = sqlx::query(concat!(
            "select ",
            enrollment_cols!(),
            " from course_enrollments where user_id = $1 and course_id = $2"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(enrollment_from_row).transpose()
    }

    async fn create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Enrollment> {
        let row = sqlx::query(concat!(
            r#"
            insert into course_enrollments (id, user_id, course_id, status, progress, enrolled_at)
            values ($1, $2, $3, 'ACTIVE', 0, $4)
            returning "#,
            enrollment_cols!()
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(course_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify(
                e,
                &[("course_enrollments_user_course_key", "already enrolled")],
            )
        })?;
        enrollment_from_row(&row)
    }

    async fn enrollments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<EnrolledCourse>> {
        let rows = sqlx::query(concat!(
            "select ",
            enrollment_cols!(),
            " from course_enrollments where user_id = $1 order by enrolled_at desc"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let enrollments = rows
            .iter()
            .map(enrollment_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        if enrollments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = enrollments.iter().map(|e| e.course_id).collect();
        let course_rows = sqlx::query(concat!(
            "select ",
            course_cols!(),
            " from courses c left join users u on u.id = c.creator_id where c.id = any($1)"
        ))
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;
        let mut summaries = course_rows
            .iter()
            .map(summary_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        self.attach_lessons(&mut summaries).await?;
        let mut by_id: HashMap<Uuid, CourseSummary> =
            summaries.into_iter().map(|s| (s.course.id, s)).collect();

        Ok(enrollments
            .into_iter()
            .filter_map(|e| {
                let course = by_id.remove(&e.course_id)?;
                Some(EnrolledCourse {
                    enrollment: e,
                    course,
                })
            })
            .collect())
    }

    async fn set_enrollment_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        progress: f64,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<EnrollmentUpdate> {
        let progress = progress.clamp(0.0, 100.0);

        // A concurrent completer blocks on the row lock and then fails the
        // status predicate, so only one caller sees the transition.
        if let Some(at) = completed_at {
            let row = sqlx::query(concat!(
                r#"
                update course_enrollments set
                  progress     = $3,
                  status       = 'COMPLETED',
                  completed_at = $4
                where user_id = $1 and course_id = $2 and status <> 'COMPLETED'
                returning "#,
                enrollment_cols!()
            ))
            .bind(user_id)
            .bind(course_id)
            .bind(progress)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
            if let Some(row) = row {
                return Ok(EnrollmentUpdate {
                    enrollment: enrollment_from_row(&row)?,
                    newly_completed: true,
                });
            }
        }

        let row = sqlx::query(concat!(
            r#"
            update course_enrollments set progress = $3
            where user_id = $1 and course_id = $2
            returning "#,
            enrollment_cols!()
        ))
        .bind(user_id)
        .bind(course_id)
        .bind(progress)
        .fetch_optional(&self.pool)
        .await?;
        let enrollment = row
            .as_ref()
            .map(enrollment_from_row)
            .transpose()?
            .ok_or(StoreError::NotFound)?;
        Ok(EnrollmentUpdate {
            enrollment,
            newly_completed: false,
        })
    }

    async fn count_enrollments_for_user(
        &self,
        user_id: Uuid,
        status: Option<EnrollmentStatus>,
    ) -> StoreResult<i64> {
        let (n,): (i64,) = sqlx::query_as(
            r#"
            select count(*)::bigint
            from course_enrollments
            where user_id = $1 and ($2::text is null or status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    async fn lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> StoreResult<Option<LessonProgress>> {
        let row = sqlx::query(concat!(
            "select ",
            progress_cols!(),
            " from lesson_progress where user_id = $1 and lesson_id = $2"
        ))
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(progress_from_row).transpose()
    }

    async fn upsert_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        time_spent: i32,
        at: DateTime<Utc>,
    ) -> StoreResult<LessonCompletion> {
        // `prev` reads the pre-statement snapshot.
        let row = sqlx::query(concat!(
            r#"
            with prev as (
              select completed from lesson_progress where user_id = $1 and lesson_id = $2
            )
            insert into lesson_progress (id, user_id, lesson_id, completed, time_spent, completed_at)
            values ($3, $1, $2, true, $4, $5)
            on conflict (user_id, lesson_id) do update set
              completed    = true,
              time_spent   = excluded.time_spent,
              completed_at = excluded.completed_at
            returning "#,
            progress_cols!(),
            r#",
              (select coalesce(bool_or(completed), false) from prev) as was_completed
            "#
        ))
        .bind(user_id)
        .bind(lesson_id)
        .bind(Uuid::new_v4())
        .bind(time_spent.max(0))
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, &[]))?;
        let was_completed: bool = row.try_get("was_completed")?;
        Ok(LessonCompletion {
            progress: progress_from_row(&row)?,
            newly_completed: !was_completed,
        })
    }

    async fn count_completed_lessons(
        &self,
        user_id: Uuid,
        course_id: Option<Uuid>,
    ) -> StoreResult<i64> {
        let (n,): (i64,) = sqlx::query_as(
            r#"
            select count(*)::bigint
            from lesson_progress p
            join lessons l on l.id = p.lesson_id
            where p.user_id = $1
              and p.completed
              and ($2::uuid is null or l.course_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    async fn recent_completions(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<CompletedLesson>> {
        let rows = sqlx::query(
            r#"
            select l.id as lesson_id, l.title as lesson_title, c.title as course_title,
                   p.completed_at
            from lesson_progress p
            join lessons l on l.id = p.lesson_id
            join courses c on c.id = l.course_id
            where p.user_id = $1 and p.completed and p.completed_at >= $2
            order by p.completed_at desc
            limit $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(CompletedLesson {
                    lesson_id: r.try_get("lesson_id")?,
                    lesson_title: r.try_get("lesson_title")?,
                    course_title: r.try_get("course_title")?,
                    completed_at: r.try_get("completed_at")?,
                })
            })
            .collect()
    }

    async fn create_achievement_record(
        &self,
        new: NewAchievementRecord,
    ) -> StoreResult<AchievementRecord> {
        let row = sqlx::query(concat!(
            r#"
            insert into achievements (id, user_id, kind, title, description, points, metadata)
            values ($1, $2, $3, $4, $5, $6, $7)
            returning "#,
            achievement_cols!()
        ))
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.kind.as_str())
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.points)
        .bind(&new.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, &[]))?;
        achievement_from_row(&row)
    }

    async fn achievement_records(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<AchievementRecord>> {
        let rows = sqlx::query(concat!(
            "select ",
            achievement_cols!(),
            " from achievements where user_id = $1 order by created_at desc limit $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(achievement_from_row).collect()
    }
}
