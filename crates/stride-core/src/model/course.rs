use serde::{Deserialize, Serialize};

use crate::error::{Result, StrideError};
use crate::model::user::validate_required;

/// Spots-left threshold at which a course is flagged as almost full.
pub const ALMOST_FULL_SPOTS: u32 = 3;

pub const MAX_TITLE_LENGTH: usize = 200;

/// A trainer-authored fitness program with a capacity and a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub trainer_id: String,
    pub duration: String,
    pub difficulty: Difficulty,
    pub max_capacity: u32,
    /// Maintained by the store; whatever a caller puts here is overwritten.
    #[serde(default)]
    pub current_enrollment: u32,
    pub schedule: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Course {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        trainer_id: impl Into<String>,
        difficulty: Difficulty,
        max_capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            trainer_id: trainer_id.into(),
            duration: String::new(),
            difficulty,
            max_capacity,
            current_enrollment: 0,
            schedule: String::new(),
            objectives: Vec::new(),
            image: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }

    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = schedule.into();
        self
    }

    pub fn with_objectives(mut self, objectives: Vec<String>) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn spots_left(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_enrollment)
    }

    pub fn is_full(&self) -> bool {
        self.spots_left() == 0
    }

    pub fn is_almost_full(&self) -> bool {
        let left = self.spots_left();
        left > 0 && left <= ALMOST_FULL_SPOTS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Sort key for the catalog: Beginner first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Beginner => 1,
            Self::Intermediate => 2,
            Self::Advanced => 3,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "Beginner"),
            Self::Intermediate => write!(f, "Intermediate"),
            Self::Advanced => write!(f, "Advanced"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(format!("unknown difficulty: {s}")),
        }
    }
}

/// Split a comma-separated objectives field into trimmed, non-empty entries.
pub fn parse_objectives(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Validate a course coming from a create or edit form.
pub fn validate_course(course: &Course) -> Result<()> {
    validate_required("id", &course.id)?;
    validate_required("title", &course.title)?;
    validate_required("trainerId", &course.trainer_id)?;
    if course.title.trim().len() > MAX_TITLE_LENGTH {
        return Err(StrideError::InvalidInput(format!(
            "title exceeds maximum length of {MAX_TITLE_LENGTH} characters"
        )));
    }
    if course.max_capacity == 0 {
        return Err(StrideError::InvalidInput(
            "maxCapacity must be at least 1".into(),
        ));
    }
    Ok(())
}
