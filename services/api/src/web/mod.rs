pub mod admin;
pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers the binary needs to build the web server router.
pub use middleware::{require_admin, require_auth};
pub use rest::{
    complete_lesson_handler, course_progress_handler, list_completed_lessons_handler,
    list_courses_handler, list_trainings_handler,
};
