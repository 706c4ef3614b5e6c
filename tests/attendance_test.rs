//! Attendance ledger, lifecycle and change audit working together

mod helpers;

use assert_matches::assert_matches;
use helpers::*;
use CourseDesk::database::ScheduleStore;
use CourseDesk::models::{AttendanceStatus, Channel, LessonStatus, EXTERNAL_ACTOR_ID};
use CourseDesk::services::{Caller, LessonReport, ReminderStats};
use CourseDesk::CourseDeskError;

#[tokio::test]
async fn test_sick_is_stored_as_absent() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let teacher = fx.teacher("Maria", Some(555));
    let student = fx.student("Ivan");
    let group = fx.friday_group(teacher.id);
    let lesson = fx.lesson_on(group.id, date(2024, 1, 12)).await;

    let outcome = fx
        .services
        .attendance
        .set_attendance(lesson.id, student.id, "sick", &field_teacher(555), Channel::Telegram)
        .await
        .unwrap();
    assert_eq!(outcome.attendance.status, AttendanceStatus::Absent);

    let rows = fx.services.attendance.list(lesson.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AttendanceStatus::Absent);
    assert_eq!(rows[0].updated_by, Some(EXTERNAL_ACTOR_ID));
}

#[tokio::test]
async fn test_upsert_converges_to_latest_status() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let teacher = fx.teacher("Maria", None);
    let student = fx.student("Ivan");
    let group = fx.friday_group(teacher.id);
    let lesson = fx.lesson_on(group.id, date(2024, 1, 12)).await;
    let ledger = &fx.services.attendance;

    ledger.set_attendance(lesson.id, student.id, "present", &admin(), Channel::Admin).await.unwrap();
    ledger.set_attendance(lesson.id, student.id, "absent", &admin(), Channel::Admin).await.unwrap();

    let rows = ledger.list(lesson.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AttendanceStatus::Absent);
    assert_eq!(fx.store.attendance_count().unwrap(), 1);

    let history = fx.services.audit.history(lesson.id).await.unwrap();
    let attendance_entries: Vec<_> = history
        .iter()
        .filter(|e| e.field_name == format!("attendance:{}", student.id))
        .collect();
    assert_eq!(attendance_entries.len(), 2);
    assert_eq!(attendance_entries[0].old_value, None);
    assert_eq!(attendance_entries[1].old_value.as_deref(), Some("present"));
    assert_eq!(attendance_entries[1].new_value.as_deref(), Some("absent"));

    // Same status again: stored, but nothing new to audit
    ledger.set_attendance(lesson.id, student.id, "ABSENT ", &admin(), Channel::Admin).await.unwrap();
    assert_eq!(fx.services.audit.history(lesson.id).await.unwrap().len(), history.len());
}

#[tokio::test]
async fn test_first_mark_completes_lesson_exactly_once() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let teacher = fx.teacher("Maria", Some(555));
    let group = fx.friday_group(teacher.id);
    let lesson = fx.lesson_on(group.id, date(2024, 1, 12)).await;
    let students: Vec<_> = ["Ivan", "Olga", "Petr"].iter().map(|n| fx.student(n)).collect();

    let first = fx
        .services
        .attendance
        .set_attendance(lesson.id, students[0].id, "present", &field_teacher(555), Channel::Telegram)
        .await
        .unwrap();
    assert!(first.completed_lesson);
    assert_eq!(first.lesson_status, LessonStatus::Done);

    let done = fx.reload(lesson.id).await;
    assert_eq!(done.reported_via, Some(Channel::Telegram));
    assert_eq!(done.reported_by, Some(EXTERNAL_ACTOR_ID));

    for student in &students[1..] {
        let outcome = fx
            .services
            .attendance
            .set_attendance(lesson.id, student.id, "absent", &field_teacher(555), Channel::Telegram)
            .await
            .unwrap();
        assert!(!outcome.completed_lesson);
        assert_eq!(outcome.lesson_status, LessonStatus::Done);
    }

    let after = fx.reload(lesson.id).await;
    assert_eq!(after.status, LessonStatus::Done);
    assert_eq!(after.reported_at, done.reported_at);

    let status_changes = fx
        .services
        .audit
        .history(lesson.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.field_name == "status")
        .count();
    assert_eq!(status_changes, 1);
}

#[tokio::test]
async fn test_past_lesson_is_locked_for_field_channel_only() {
    let fx = Fixture::at(utc(2024, 1, 13, 10, 0));
    let teacher = fx.teacher("Maria", Some(555));
    let student = fx.student("Ivan");
    let group = fx.friday_group(teacher.id);
    let yesterday = fx.lesson_on(group.id, date(2024, 1, 12)).await;

    assert_matches!(
        fx.services
            .attendance
            .set_attendance(yesterday.id, student.id, "present", &field_teacher(555), Channel::Telegram)
            .await,
        Err(CourseDeskError::PastLessonLocked { lesson_id, .. }) if lesson_id == yesterday.id
    );
    assert_eq!(fx.store.attendance_count().unwrap(), 0);

    let outcome = fx
        .services
        .attendance
        .set_attendance(yesterday.id, student.id, "present", &admin(), Channel::Admin)
        .await
        .unwrap();
    assert_eq!(outcome.attendance.status, AttendanceStatus::Present);
}

#[tokio::test]
async fn test_today_is_evaluated_in_group_timezone() {
    // 16:00 UTC on the 12th is already the 13th in Tokyo
    let fx = Fixture::at(utc(2024, 1, 12, 16, 0));
    let teacher = fx.teacher("Maria", Some(555));
    let student = fx.student("Ivan");

    let tokyo = fx.group_with(teacher.id, "Asia/Tokyo", date(2024, 1, 12), None);
    let tokyo_lesson = fx.lesson_on(tokyo.id, date(2024, 1, 12)).await;
    assert_matches!(
        fx.services
            .attendance
            .set_attendance(tokyo_lesson.id, student.id, "present", &field_teacher(555), Channel::Telegram)
            .await,
        Err(CourseDeskError::PastLessonLocked { .. })
    );

    let utc_group = fx.friday_group(teacher.id);
    let utc_lesson = fx.lesson_on(utc_group.id, date(2024, 1, 12)).await;
    assert!(fx
        .services
        .attendance
        .set_attendance(utc_lesson.id, student.id, "present", &field_teacher(555), Channel::Telegram)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_attendance_rejections() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let teacher = fx.teacher("Maria", None);
    let student = fx.student("Ivan");
    let group = fx.friday_group(teacher.id);
    let lesson = fx.lesson_on(group.id, date(2024, 1, 12)).await;
    let ledger = &fx.services.attendance;

    assert_matches!(
        ledger.set_attendance(lesson.id, student.id, "late", &admin(), Channel::Admin).await,
        Err(CourseDeskError::Validation(_))
    );
    assert_matches!(
        ledger.set_attendance(lesson.id, 404, "present", &admin(), Channel::Admin).await,
        Err(CourseDeskError::NotFound { entity: "Student", id: 404 })
    );
    assert_matches!(
        ledger.set_attendance(404, student.id, "present", &admin(), Channel::Admin).await,
        Err(CourseDeskError::NotFound { entity: "Lesson", id: 404 })
    );

    fx.services.lifecycle.cancel(lesson.id, &admin()).await.unwrap();
    assert_matches!(
        ledger.set_attendance(lesson.id, student.id, "present", &admin(), Channel::Admin).await,
        Err(CourseDeskError::InvalidTransition { .. })
    );
    assert_eq!(fx.store.attendance_count().unwrap(), 0);
}

#[tokio::test]
async fn test_terminal_states() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let teacher = fx.teacher("Maria", None);
    let group = fx.friday_group(teacher.id);
    let canceled = fx.lesson_on(group.id, date(2024, 1, 12)).await;
    let done = fx.lesson_on(group.id, date(2024, 1, 19)).await;
    let lifecycle = &fx.services.lifecycle;

    lifecycle.cancel(canceled.id, &admin()).await.unwrap();
    assert_matches!(
        lifecycle.mark_done(canceled.id, &admin(), Channel::Admin).await,
        Err(CourseDeskError::InvalidTransition { from, to }) if from == "canceled" && to == "done"
    );

    lifecycle.mark_done(done.id, &admin(), Channel::Admin).await.unwrap();
    assert_matches!(
        lifecycle.cancel(done.id, &admin()).await,
        Err(CourseDeskError::InvalidTransition { from, to }) if from == "done" && to == "canceled"
    );
    assert_eq!(fx.reload(done.id).await.status, LessonStatus::Done);
    assert_eq!(fx.reload(canceled.id).await.status, LessonStatus::Canceled);
}

#[tokio::test]
async fn test_report_and_history() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let teacher = fx.teacher("Maria", Some(555));
    let group = fx.friday_group(teacher.id);
    let lesson = fx.lesson_on(group.id, date(2024, 1, 12)).await;

    let report = LessonReport {
        topic: Some("Turns".to_string()),
        notes: Some("Everyone on time".to_string()),
    };
    let reported = fx
        .services
        .lifecycle
        .report(lesson.id, &report, &field_teacher(555), Channel::Telegram)
        .await
        .unwrap();
    assert_eq!(reported.status, LessonStatus::Done);
    assert_eq!(reported.topic_set_by, Some(EXTERNAL_ACTOR_ID));
    assert_eq!(reported.notes_set_by, Some(EXTERNAL_ACTOR_ID));
    assert_eq!(reported.reported_by, Some(EXTERNAL_ACTOR_ID));

    fx.clock.advance(chrono::Duration::minutes(5));
    fx.services
        .lifecycle
        .set_notes(lesson.id, "Two students late", &admin(), Channel::Admin)
        .await
        .unwrap();

    let history = fx.services.audit.history(lesson.id).await.unwrap();
    let fields: Vec<_> = history.iter().map(|e| e.field_name.as_str()).collect();
    assert_eq!(fields, vec!["status", "topic", "notes", "notes"]);
    assert_eq!(history[0].changed_by, EXTERNAL_ACTOR_ID);
    assert_eq!(history[0].changed_by_external_id.as_deref(), Some("555"));
    assert_eq!(history[0].changed_via, "telegram");
    assert_eq!(history[3].changed_by, 1);
    assert_eq!(history[3].changed_by_name, "School Admin");
    assert_eq!(history[3].old_value.as_deref(), Some("Everyone on time"));
    assert!(history[3].created_at > history[0].created_at);
}

#[tokio::test]
async fn test_replacement_decides_effective_teacher_and_access() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let regular = fx.teacher("Maria", Some(555));
    let substitute = fx.teacher("Olga", Some(777));
    let group = fx.friday_group(regular.id);
    let covered = fx.lesson_on(group.id, date(2024, 1, 12)).await;
    let normal = fx.lesson_on(group.id, date(2024, 1, 19)).await;
    fx.store.add_replacement(covered.id, substitute.id).unwrap();

    let resolver = &fx.services.resolver;
    assert_eq!(resolver.effective_teacher(covered.id).await.unwrap(), substitute.id);
    assert_eq!(resolver.effective_teacher(normal.id).await.unwrap(), regular.id);
    assert_matches!(resolver.effective_teacher(404).await, Err(CourseDeskError::NotFound { .. }));

    let access = &fx.services.access;
    assert!(access.authorize(covered.id, Caller::Teacher(substitute.id)).await.is_ok());
    assert_matches!(
        access.authorize(covered.id, Caller::Teacher(regular.id)).await,
        Err(CourseDeskError::Forbidden(_))
    );
    assert!(access.authorize(normal.id, Caller::Teacher(regular.id)).await.is_ok());
    assert!(access.authorize(covered.id, Caller::Admin).await.is_ok());
}

#[tokio::test]
async fn test_reminder_goes_to_effective_teacher() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let regular = fx.teacher("Maria", Some(555));
    let substitute = fx.teacher("Olga", Some(777));
    let offline = fx.teacher("Nina", None);
    let group = fx.friday_group(regular.id);
    let covered = fx.lesson_on(group.id, date(2024, 1, 12)).await;
    let normal = fx.lesson_on(group.id, date(2024, 1, 19)).await;
    let unreachable = fx.lesson_on(group.id, date(2024, 1, 26)).await;
    fx.store.add_replacement(covered.id, substitute.id).unwrap();
    fx.store.add_replacement(unreachable.id, offline.id).unwrap();

    let notification = &fx.services.notification;
    let reminder = notification.prepare_reminder(covered.id).await.unwrap().unwrap();
    assert_eq!(reminder.teacher_id, substitute.id);
    assert_eq!(reminder.chat_id.0, 777);

    let reminder = notification.prepare_reminder(normal.id).await.unwrap().unwrap();
    assert_eq!(reminder.chat_id.0, 555);

    assert!(notification.prepare_reminder(unreachable.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reminders_for_unreachable_teachers_are_counted_not_sent() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let offline = fx.teacher("Nina", None);
    let group = fx.friday_group(offline.id);
    let lesson = fx.lesson_on(group.id, date(2024, 1, 12)).await;
    let canceled = fx.lesson_on(fx.friday_group(offline.id).id, date(2024, 1, 12)).await;
    fx.services.lifecycle.cancel(canceled.id, &admin()).await.unwrap();

    let notification = &fx.services.notification;
    assert!(!notification.remind_lesson(lesson.id).await.unwrap());
    assert_matches!(notification.remind_lesson(404).await, Err(CourseDeskError::NotFound { .. }));

    let stats = notification.remind_day(date(2024, 1, 12)).await.unwrap();
    assert_eq!(stats, ReminderStats { sent: 0, unreachable: 1, failed: 0 });
}

#[tokio::test]
async fn test_external_actor_needs_display_name() {
    let fx = Fixture::at(utc(2024, 1, 12, 9, 0));
    let teacher = fx.teacher("Maria", None);
    let group = fx.friday_group(teacher.id);
    let lesson = fx.lesson_on(group.id, date(2024, 1, 12)).await;

    let nameless = CourseDesk::models::Actor::external("555", " ");
    assert_matches!(
        fx.services.lifecycle.set_topic(lesson.id, "Turns", &nameless, Channel::Telegram).await,
        Err(CourseDeskError::Validation(_))
    );
    assert!(fx.store.list_change_logs(lesson.id).await.unwrap().is_empty());
}
