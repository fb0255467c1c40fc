//! Course browser: search, filter and sort over a snapshot's courses.

use serde::{Deserialize, Serialize};

use crate::model::{Course, Difficulty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseSort {
    #[default]
    Title,
    /// Beginner first.
    Difficulty,
    /// Most enrolled first.
    Enrollment,
}

impl std::fmt::Display for CourseSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Difficulty => write!(f, "difficulty"),
            Self::Enrollment => write!(f, "enrollment"),
        }
    }
}

impl std::str::FromStr for CourseSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "difficulty" => Ok(Self::Difficulty),
            "enrollment" => Ok(Self::Enrollment),
            _ => Err(format!("unknown sort: {s}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseQuery {
    /// Case-insensitive substring of the title or description.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub trainer_id: Option<String>,
    #[serde(default)]
    pub sort: CourseSort,
}

impl CourseQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_trainer(mut self, trainer_id: impl Into<String>) -> Self {
        self.trainer_id = Some(trainer_id.into());
        self
    }

    pub fn with_sort(mut self, sort: CourseSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, course: &Course) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                course.title.to_lowercase().contains(&term)
                    || course.description.to_lowercase().contains(&term)
            }
        };
        search_ok
            && self.difficulty.map_or(true, |d| course.difficulty == d)
            && self
                .trainer_id
                .as_deref()
                .map_or(true, |t| course.trainer_id == t)
    }

    /// Matching courses in the requested order. The sort is stable.
    pub fn run<'a>(&self, courses: &'a [Course]) -> Vec<&'a Course> {
        let mut found: Vec<&Course> = courses.iter().filter(|c| self.matches(c)).collect();
        match self.sort {
            CourseSort::Title => {
                found.sort_by_cached_key(|c| c.title.to_lowercase());
            }
            CourseSort::Difficulty => found.sort_by_key(|c| c.difficulty.rank()),
            CourseSort::Enrollment => {
                found.sort_by(|a, b| b.current_enrollment.cmp(&a.current_enrollment))
            }
        }
        found
    }
}
