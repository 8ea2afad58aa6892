use super::{ANIMAL, GAME_SCORE};
use crate::model::{Record, RecordId};
use crate::projection::Filterable;
use crate::service::Entity;
use crate::store::SortKey;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnimalCategory {
    Mammal,
    Bird,
    Reptile,
    Fish,
}

impl AnimalCategory {
    pub const ALL: [Self; 4] = [Self::Mammal, Self::Bird, Self::Reptile, Self::Fish];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mammal => "mammal",
            Self::Bird => "bird",
            Self::Reptile => "reptile",
            Self::Fish => "fish",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animal {
    pub id: RecordId,
    pub name: String,
    pub scientific_name: String,
    pub description: String,
    pub habitat: String,
    pub lifespan: String,
    pub fact: String,
    pub category: AnimalCategory,
    pub image_name: String,
    pub is_favorite: bool,
}

impl Entity for Animal {
    const NAME: &'static str = ANIMAL;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::asc("name")];
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "scientific_name", "description"];

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            name: record.string("name"),
            scientific_name: record.string("scientific_name"),
            description: record.string("description"),
            habitat: record.string("habitat"),
            lifespan: record.string("lifespan"),
            fact: record.string("fact"),
            // Unknown stored categories fall back to mammal.
            category: record
                .text("category")
                .and_then(AnimalCategory::parse)
                .unwrap_or(AnimalCategory::Mammal),
            image_name: record.string("image_name"),
            is_favorite: record.flag("is_favorite"),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("name", self.name.as_str())
            .set("scientific_name", self.scientific_name.as_str())
            .set("description", self.description.as_str())
            .set("habitat", self.habitat.as_str())
            .set("lifespan", self.lifespan.as_str())
            .set("fact", self.fact.as_str())
            .set("category", self.category.as_str())
            .set("image_name", self.image_name.as_str())
            .set("is_favorite", self.is_favorite);
    }
}

impl Filterable for Animal {
    type Category = AnimalCategory;

    fn flag(&self) -> bool {
        self.is_favorite
    }

    fn category(&self) -> Option<&AnimalCategory> {
        Some(&self.category)
    }

    fn text_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.scientific_name.as_str(),
            self.description.as_str(),
        ]
    }
}

/// One finished quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct GameScore {
    pub id: RecordId,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub played_at: Option<DateTime<Utc>>,
}

impl GameScore {
    /// Correct answers in percent; `0` for an empty quiz.
    pub fn percentage(&self) -> f64 {
        percent(self.correct_answers, self.total_questions)
    }
}

impl Entity for GameScore {
    const NAME: &'static str = GAME_SCORE;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::desc("played_at")];

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            correct_answers: record.integer("correct_answers").unwrap_or(0),
            total_questions: record.integer("total_questions").unwrap_or(0),
            played_at: record.timestamp("played_at"),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("correct_answers", self.correct_answers)
            .set("total_questions", self.total_questions)
            .set("played_at", self.played_at);
    }
}

/// Lifetime quiz totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProgress {
    pub games_played: i64,
    pub total_correct_answers: i64,
    pub total_questions: i64,
}

impl UserProgress {
    pub(crate) fn from_record(record: &Record) -> Self {
        Self {
            games_played: record.integer("games_played").unwrap_or(0),
            total_correct_answers: record.integer("total_correct_answers").unwrap_or(0),
            total_questions: record.integer("total_questions").unwrap_or(0),
        }
    }

    pub fn average_score(&self) -> f64 {
        percent(self.total_correct_answers, self.total_questions)
    }
}

fn percent(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
