//! crates/training_portal_core/src/progress.rs
//!
//! The progress model: pure functions over in-memory collections of
//! trainings and completion records. Deterministic and side-effect-free, so
//! callers may evaluate them on every request without caching.

use uuid::Uuid;

use crate::domain::{CompletedLesson, Training};

/// True iff at least one completion record matches both the training and the
/// user. Duplicate records for the same pair are harmless here.
pub fn is_lesson_completed(
    training_id: Uuid,
    user_id: Uuid,
    completed_lessons: &[CompletedLesson],
) -> bool {
    completed_lessons
        .iter()
        .any(|lesson| lesson.training_id == training_id && lesson.user_id == user_id)
}

/// True iff every training of the course is completed by the user.
///
/// A course with no trainings is vacuously complete. That is deliberate: an
/// empty course is trivially "done" and must not block the completion view.
pub fn is_course_completed(
    course_id: Uuid,
    trainings: &[Training],
    completed_lessons: &[CompletedLesson],
    user_id: Uuid,
) -> bool {
    trainings
        .iter()
        .filter(|training| training.course_id == course_id)
        .all(|training| is_lesson_completed(training.id, user_id, completed_lessons))
}

/// Display order: `order_number` ascending, ties broken by insertion order
/// (creation time, then id as a stable fallback).
fn display_order(a: &Training, b: &Training) -> std::cmp::Ordering {
    a.order_number
        .cmp(&b.order_number)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts a training list into display order in place.
pub fn sort_for_display(trainings: &mut [Training]) {
    trainings.sort_by(display_order);
}

/// The course's trainings in display order.
pub fn course_trainings(course_id: Uuid, trainings: &[Training]) -> Vec<&Training> {
    let mut selected: Vec<&Training> = trainings
        .iter()
        .filter(|training| training.course_id == course_id)
        .collect();
    selected.sort_by(|a, b| display_order(a, b));
    selected
}
