use chrono::{Duration, TimeZone, Utc};
use lesson_core::model::{
    CourseId, CourseModule, Enrollment, LessonId, LessonProgress, ModuleId, UserId,
};
use lesson_core::time::fixed_now;
use storage::repository::{EnrollmentRepository, FlagRepository, ProgressRepository};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_progress_upsert_overwrites_and_keeps_completion() {
    let repo = connect("memdb_progress").await;
    let user = UserId::random();
    let lesson = LessonId::new(11);
    let now = fixed_now();

    let mut progress = LessonProgress::new(user, lesson, now);
    progress.record_position(45.9, now);
    repo.upsert_progress(&progress).await.unwrap();

    let stored = repo.read_progress(user, lesson).await.unwrap().expect("row");
    assert_eq!(stored.watched_seconds(), 45);
    assert!(!stored.is_completed());
    assert_eq!(stored.completed_at(), None);

    let done_at = now + Duration::minutes(3);
    progress.record_position(92.2, done_at);
    progress.mark_completed(done_at);
    repo.upsert_progress(&progress).await.unwrap();

    let stored = repo.read_progress(user, lesson).await.unwrap().expect("row");
    assert_eq!(stored.watched_seconds(), 92);
    assert!(stored.is_completed());
    assert_eq!(stored.completed_at(), Some(done_at));
    assert_eq!(stored.updated_at(), done_at);
}

#[tokio::test]
async fn sqlite_missing_progress_reads_none() {
    let repo = connect("memdb_progress_missing").await;
    let found = repo
        .read_progress(UserId::random(), LessonId::new(1))
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn sqlite_enrollment_and_modules_roundtrip() {
    let repo = connect("memdb_enrollment").await;
    let user = UserId::random();
    let course = CourseId::new(5);
    let enrolled = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    repo.upsert_enrollment(&Enrollment::new(user, course, enrolled))
        .await
        .unwrap();
    for (id, position, offset) in [(3_u64, 2_u32, 14_u32), (1, 0, 0), (2, 1, 7)] {
        let module = CourseModule::new(
            ModuleId::new(id),
            course,
            format!("Module {id}"),
            position,
            offset,
        );
        repo.upsert_module(&module).await.unwrap();
    }

    let enrollment = repo.get_enrollment(user, course).await.unwrap().unwrap();
    assert_eq!(enrollment.enrolled_at, Some(enrolled));

    let modules = repo.list_modules(course).await.unwrap();
    let ids: Vec<u64> = modules.iter().map(|m| m.id.value()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(modules[2].drip_offset_days, 14);
}

#[tokio::test]
async fn sqlite_malformed_enrollment_date_reads_as_unknown() {
    let repo = connect("memdb_enrollment_malformed").await;
    let user = UserId::random();

    sqlx::query("INSERT INTO enrollments (user_id, course_id, enrolled_at) VALUES (?1, ?2, ?3)")
        .bind(user.to_string())
        .bind(9_i64)
        .bind("not-a-date")
        .execute(repo.pool())
        .await
        .unwrap();

    let enrollment = repo
        .get_enrollment(user, CourseId::new(9))
        .await
        .unwrap()
        .expect("row");
    assert_eq!(enrollment.enrolled_at, None);
}

#[tokio::test]
async fn sqlite_flags_toggle() {
    let repo = connect("memdb_flags").await;
    let user = UserId::random();

    assert!(!repo.get_flag(user, "course_unlocked").await.unwrap());
    repo.set_flag(user, "course_unlocked", true).await.unwrap();
    assert!(repo.get_flag(user, "course_unlocked").await.unwrap());
    repo.set_flag(user, "course_unlocked", false).await.unwrap();
    assert!(!repo.get_flag(user, "course_unlocked").await.unwrap());
}
