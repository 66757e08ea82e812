//! Entity types persisted by the platform.
//!
//! Every entity serializes with camelCase field names, matching the JSON
//! shape served by the HTTP API.

/// Implements `ALL`, `as_str`, `Display` and `FromStr` for a string-backed enum.
macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = crate::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(crate::CoreError::invalid(
                        stringify!($ty),
                        format!("unknown value '{}'", other),
                    )),
                }
            }
        }
    };
}

pub mod catalog;
pub mod credit;
pub mod mentor;
pub mod progress;
pub mod user;

pub use catalog::{Course, CourseStatus, Lesson, QuizQuestion, Topic};
pub use credit::{CreditKind, CreditTransaction};
pub use mentor::{MentorApplication, MentorApplicationStatus};
pub use progress::{Progress, ProgressStatus, QuizAnswer};
pub use user::{Role, User};
