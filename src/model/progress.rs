use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct ContentProgress {
    pub content_id: ContentId,
    #[serde(default)]
    pub progress_seconds: u64,
    #[serde(default)]
    pub total_seconds: u64,
    #[serde(default)]
    pub is_completed: bool,
}

impl ContentProgress {
    /// Fraction of the video watched, in `0.0..=1.0`.
    pub fn watched_ratio(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        (self.progress_seconds as f64 / self.total_seconds as f64).min(1.0)
    }
}

/// Body of a periodic playback save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub progress_seconds: u64,
    pub total_seconds: u64,
}

impl ProgressSample {
    /// Builds a sample from the player's floating point clock, flooring both values.
    pub fn from_player(current_time: f64, duration: f64) -> Self {
        let floor = |value: f64| if value.is_finite() && value > 0.0 { value.floor() as u64 } else { 0 };
        Self {
            progress_seconds: floor(current_time),
            total_seconds: floor(duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: CourseId,
    #[serde(default)]
    pub items: Vec<ContentProgress>,
}

impl CourseProgress {
    pub fn completed(&self) -> impl Iterator<Item = ContentId> + '_ {
        self.items.iter().filter(|p| p.is_completed).map(|p| p.content_id)
    }

    pub fn completed_count(&self) -> usize {
        self.completed().count()
    }

    /// Completion percentage relative to `total_items`, the number of items in the course.
    pub fn percent_complete(&self, total_items: usize) -> u8 {
        if total_items == 0 {
            return 0;
        }
        let done = self.completed_count().min(total_items);
        ((done * 100) / total_items) as u8
    }
}
