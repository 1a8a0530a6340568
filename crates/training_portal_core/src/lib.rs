pub mod domain;
pub mod gate;
pub mod ports;
pub mod progress;

pub use domain::{
    AccountCredentials, AuthSession, CompletedLesson, Course, CourseDraft, Profile, Role,
    Training, TrainingDraft, UnknownRole,
};
pub use gate::{verify_role, GateError, GateState, RoleGate};
pub use ports::{CatalogStore, PortError, PortResult, SessionGateway};
pub use progress::{course_trainings, is_course_completed, is_lesson_completed, sort_for_display};
