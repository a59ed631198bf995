use derive_new::new;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::define_id;

pub use content::*;
pub use member::*;
pub use progress::*;
pub use timestamp::*;

mod content;
mod member;
mod progress;
mod timestamp;

define_id!("member", MemberId);
define_id!("course", CourseId);
define_id!("content", ContentId);

#[derive(Debug, Clone, PartialEq, Eq, Snafu, new)]
#[snafu(display("invalid {resource} id: `{text}`"))]
pub struct ParseId {
    pub resource: &'static str,
    pub text: String,
}
