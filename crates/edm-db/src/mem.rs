use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edm_schemas::{
    AchievementRecord, CompletedLesson, Course, CourseDetail, CourseFilter, CoursePatch,
    CourseSummary, CreatorInfo, EnrolledCourse, Enrollment, EnrollmentStatus, Lesson,
    LessonOutline, LessonPatch, LessonProgress, NewAchievementRecord, NewCourse, NewLesson,
    NewUser, User, UserPatch,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{EnrollmentUpdate, LessonCompletion, Store, StoreError, StoreResult};

/// In-memory [`Store`]. Vectors keep insertion order; listings sort on top
/// of that so ties resolve newest-inserted first.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    courses: Vec<Course>,
    lessons: Vec<Lesson>,
    enrollments: Vec<Enrollment>,
    lesson_progress: Vec<LessonProgress>,
    achievements: Vec<AchievementRecord>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn user_mut(&mut self, id: Uuid) -> StoreResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)
    }

    fn creator(&self, course: &Course) -> Option<CreatorInfo> {
        self.users
            .iter()
            .find(|u| u.id == course.creator_id)
            .map(|u| CreatorInfo {
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                username: u.username.clone(),
            })
    }

    fn lessons_of(&self, course_id: Uuid) -> Vec<Lesson> {
        let mut ls: Vec<Lesson> = self
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        ls.sort_by_key(|l| (l.order, l.created_at));
        ls
    }

    fn enrollment_count(&self, course_id: Uuid) -> i64 {
        self.enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .count() as i64
    }

    fn summary(&self, course: &Course) -> CourseSummary {
        let lessons = self.lessons_of(course.id);
        CourseSummary {
            course: course.clone(),
            creator: self.creator(course),
            total_duration: lessons.iter().map(|l| l.duration).sum(),
            lesson_count: lessons.len() as i64,
            lessons: lessons.iter().map(LessonOutline::from).collect(),
            enrollment_count: self.enrollment_count(course.id),
        }
    }

    fn lesson_course(&self, lesson_id: Uuid) -> Option<Uuid> {
        self.lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .map(|l| l.course_id)
    }
}

#[async_trait]
impl Store for MemStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut g = self.inner.write().await;
        if g.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        if g.users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict("username already taken".into()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            role: new.role,
            avatar: None,
            bio: new.bio,
            learning_style: new.learning_style,
            grade: new.grade,
            school: new.school,
            timezone: None,
            points: new.points,
            level: new.level,
            created_at: now,
            updated_at: now,
            last_active: None,
        };
        g.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let g = self.inner.read().await;
        Ok(g.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let g = self.inner.read().await;
        Ok(g.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> StoreResult<User> {
        let mut g = self.inner.write().await;
        let u = g.user_mut(id)?;
        if let Some(v) = patch.first_name {
            u.first_name = v;
        }
        if let Some(v) = patch.last_name {
            u.last_name = v;
        }
        if let Some(v) = patch.bio {
            u.bio = Some(v);
        }
        if let Some(v) = patch.learning_style {
            u.learning_style = v;
        }
        if let Some(v) = patch.grade {
            u.grade = Some(v);
        }
        if let Some(v) = patch.school {
            u.school = Some(v);
        }
        if let Some(v) = patch.timezone {
            u.timezone = Some(v);
        }
        u.updated_at = Utc::now();
        Ok(u.clone())
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut g = self.inner.write().await;
        g.user_mut(id)?.last_active = Some(at);
        Ok(())
    }

    async fn add_points(&self, id: Uuid, points: i64) -> StoreResult<i64> {
        let mut g = self.inner.write().await;
        let u = g.user_mut(id)?;
        u.points = u.points.saturating_add(points);
        Ok(u.points)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.inner.read().await.users.clone())
    }

    async fn list_courses(&self, filter: &CourseFilter) -> StoreResult<Vec<CourseSummary>> {
        let g = self.inner.read().await;
        let mut hits: Vec<&Course> = g.courses.iter().rev().filter(|c| filter.matches(c)).collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(hits.into_iter().map(|c| g.summary(c)).collect())
    }

    async fn course_by_id(&self, id: Uuid) -> StoreResult<Option<CourseDetail>> {
        let g = self.inner.read().await;
        Ok(g.courses.iter().find(|c| c.id == id).map(|c| CourseDetail {
            course: c.clone(),
            creator: g.creator(c),
            lessons: g.lessons_of(c.id),
            enrollment_count: g.enrollment_count(c.id),
        }))
    }

    async fn create_course(&self, new: NewCourse) -> StoreResult<Course> {
        let mut g = self.inner.write().await;
        if !g.users.iter().any(|u| u.id == new.creator_id) {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            category: new.category,
            level: new.level,
            tags: new.tags,
            thumbnail: new.thumbnail,
            estimated_hours: new.estimated_hours,
            is_published: new.is_published,
            creator_id: new.creator_id,
            created_at: now,
            updated_at: now,
        };
        g.courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> StoreResult<Course> {
        let mut g = self.inner.write().await;
        let c = g
            .courses
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(v) = patch.title {
            c.title = v;
        }
        if let Some(v) = patch.description {
            c.description = v;
        }
        if let Some(v) = patch.category {
            c.category = v;
        }
        if let Some(v) = patch.level {
            c.level = v;
        }
        if let Some(v) = patch.tags {
            c.tags = v;
        }
        if let Some(v) = patch.thumbnail {
            c.thumbnail = Some(v);
        }
        if let Some(v) = patch.estimated_hours {
            c.estimated_hours = v;
        }
        if let Some(v) = patch.is_published {
            c.is_published = v;
        }
        c.updated_at = Utc::now();
        Ok(c.clone())
    }

    async fn delete_course(&self, id: Uuid) -> StoreResult<()> {
        let mut g = self.inner.write().await;
        let before = g.courses.len();
        g.courses.retain(|c| c.id != id);
        if g.courses.len() == before {
            return Err(StoreError::NotFound);
        }
        let lesson_ids: Vec<Uuid> = g
            .lessons
            .iter()
            .filter(|l| l.course_id == id)
            .map(|l| l.id)
            .collect();
        g.lessons.retain(|l| l.course_id != id);
        g.lesson_progress.retain(|p| !lesson_ids.contains(&p.lesson_id));
        g.enrollments.retain(|e| e.course_id != id);
        Ok(())
    }

    async fn lesson_by_id(&self, id: Uuid) -> StoreResult<Option<Lesson>> {
        let g = self.inner.read().await;
        Ok(g.lessons.iter().find(|l| l.id == id).cloned())
    }

    async fn create_lesson(&self, course_id: Uuid, new: NewLesson) -> StoreResult<Lesson> {
        let mut g = self.inner.write().await;
        if !g.courses.iter().any(|c| c.id == course_id) {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now();
        let lesson = Lesson {
            id: Uuid::new_v4(),
            course_id,
            title: new.title,
            content: new.content,
            lesson_type: new.lesson_type,
            order: new.order,
            duration: new.duration,
            created_at: now,
            updated_at: now,
        };
        g.lessons.push(lesson.clone());
        Ok(lesson)
    }

    async fn update_lesson(&self, id: Uuid, patch: LessonPatch) -> StoreResult<Lesson> {
        let mut g = self.inner.write().await;
        let l = g
            .lessons
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(v) = patch.title {
            l.title = v;
        }
        if let Some(v) = patch.content {
            l.content = v;
        }
        if let Some(v) = patch.lesson_type {
            l.lesson_type = v;
        }
        if let Some(v) = patch.order {
            l.order = v;
        }
        if let Some(v) = patch.duration {
            l.duration = v;
        }
        l.updated_at = Utc::now();
        Ok(l.clone())
    }

    async fn delete_lesson(&self, id: Uuid) -> StoreResult<()> {
        let mut g = self.inner.write().await;
        let before = g.lessons.len();
        g.lessons.retain(|l| l.id != id);
        if g.lessons.len() == before {
            return Err(StoreError::NotFound);
        }
        g.lesson_progress.retain(|p| p.lesson_id != id);
        Ok(())
    }

    async fn count_lessons(&self, course_id: Uuid) -> StoreResult<i64> {
        let g = self.inner.read().await;
        Ok(g.lessons.iter().filter(|l| l.course_id == course_id).count() as i64)
    }

    async fn enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let g = self.inner.read().await;
        Ok(g
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned())
    }

    async fn create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Enrollment> {
        let mut g = self.inner.write().await;
        if !g.courses.iter().any(|c| c.id == course_id) || !g.users.iter().any(|u| u.id == user_id)
        {
            return Err(StoreError::NotFound);
        }
        if g
            .enrollments
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id)
        {
            return Err(StoreError::Conflict("already enrolled".into()));
        }
        let e = Enrollment {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            status: EnrollmentStatus::Active,
            progress: 0.0,
            enrolled_at: at,
            completed_at: None,
        };
        g.enrollments.push(e.clone());
        Ok(e)
    }

    async fn enrollments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<EnrolledCourse>> {
        let g = self.inner.read().await;
        let mut mine: Vec<&Enrollment> = g
            .enrollments
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .collect();
        mine.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(mine
            .into_iter()
            .filter_map(|e| {
                let course = g.courses.iter().find(|c| c.id == e.course_id)?;
                Some(EnrolledCourse {
                    enrollment: e.clone(),
                    course: g.summary(course),
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
        let mut g = self.inner.write().await;
        let e = g
            .enrollments
            .iter_mut()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .ok_or(StoreError::NotFound)?;
        e.progress = progress.clamp(0.0, 100.0);
        let mut newly_completed = false;
        if let Some(at) = completed_at {
            if e.status != EnrollmentStatus::Completed {
                e.status = EnrollmentStatus::Completed;
                e.completed_at = Some(at);
                newly_completed = true;
            }
        }
        Ok(EnrollmentUpdate {
            enrollment: e.clone(),
            newly_completed,
        })
    }

    async fn count_enrollments_for_user(
        &self,
        user_id: Uuid,
        status: Option<EnrollmentStatus>,
    ) -> StoreResult<i64> {
        let g = self.inner.read().await;
        Ok(g
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id && status.map_or(true, |s| e.status == s))
            .count() as i64)
    }

    async fn lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> StoreResult<Option<LessonProgress>> {
        let g = self.inner.read().await;
        Ok(g
            .lesson_progress
            .iter()
            .find(|p| p.user_id == user_id && p.lesson_id == lesson_id)
            .cloned())
    }

    async fn upsert_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        time_spent: i32,
        at: DateTime<Utc>,
    ) -> StoreResult<LessonCompletion> {
        let mut g = self.inner.write().await;
        if g.lesson_course(lesson_id).is_none() {
            return Err(StoreError::NotFound);
        }
        let time_spent = time_spent.max(0);
        if let Some(p) = g
            .lesson_progress
            .iter_mut()
            .find(|p| p.user_id == user_id && p.lesson_id == lesson_id)
        {
            let newly_completed = !p.completed;
            p.completed = true;
            p.time_spent = time_spent;
            p.completed_at = Some(at);
            return Ok(LessonCompletion {
                progress: p.clone(),
                newly_completed,
            });
        }
        let p = LessonProgress {
            id: Uuid::new_v4(),
            user_id,
            lesson_id,
            completed: true,
            time_spent,
            completed_at: Some(at),
        };
        g.lesson_progress.push(p.clone());
        Ok(LessonCompletion {
            progress: p,
            newly_completed: true,
        })
    }

    async fn count_completed_lessons(
        &self,
        user_id: Uuid,
        course_id: Option<Uuid>,
    ) -> StoreResult<i64> {
        let g = self.inner.read().await;
        Ok(g
            .lesson_progress
            .iter()
            .filter(|p| p.user_id == user_id && p.completed)
            .filter(|p| match course_id {
                Some(c) => g.lesson_course(p.lesson_id) == Some(c),
                None => true,
            })
            .count() as i64)
    }

    async fn recent_completions(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<CompletedLesson>> {
        let g = self.inner.read().await;
        let mut out: Vec<CompletedLesson> = g
            .lesson_progress
            .iter()
            .filter(|p| p.user_id == user_id && p.completed)
            .filter_map(|p| {
                let at = p.completed_at.filter(|t| *t >= since)?;
                let lesson = g.lessons.iter().find(|l| l.id == p.lesson_id)?;
                let course = g.courses.iter().find(|c| c.id == lesson.course_id)?;
                Some(CompletedLesson {
                    lesson_id: lesson.id,
                    lesson_title: lesson.title.clone(),
                    course_title: course.title.clone(),
                    completed_at: at,
                })
            })
            .collect();
        out.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }

    async fn create_achievement_record(
        &self,
        new: NewAchievementRecord,
    ) -> StoreResult<AchievementRecord> {
        let mut g = self.inner.write().await;
        if !g.users.iter().any(|u| u.id == new.user_id) {
            return Err(StoreError::NotFound);
        }
        let rec = AchievementRecord {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            description: new.description,
            points: new.points,
            metadata: new.metadata,
            created_at: Utc::now(),
        };
        g.achievements.push(rec.clone());
        Ok(rec)
    }

    async fn achievement_records(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<AchievementRecord>> {
        let g = self.inner.read().await;
        let mut out: Vec<AchievementRecord> = g
            .achievements
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }
}
