use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    #[new(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: ContentId,
    pub course_id: CourseId,
    pub title: String,
    #[serde(default)]
    pub unlock_type: UnlockType,
    #[serde(default)]
    pub unlock_value: u32,
    #[serde(default)]
    #[new(default)]
    pub sort_order: i64,
    #[serde(default)]
    #[new(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    #[new(default)]
    pub status: ContentStatus,
}

impl ContentItem {
    /// Content that no unlock rule can hold back.
    pub fn is_always_open(&self) -> bool {
        self.unlock_type == UnlockType::Immediate || self.unlock_value == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockType {
    #[default]
    Immediate,
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Published,
    Draft,
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentStatus::Published => write!(f, "published"),
            ContentStatus::Draft => write!(f, "draft"),
        }
    }
}
