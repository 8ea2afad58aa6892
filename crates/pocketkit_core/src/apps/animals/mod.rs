//! Animal encyclopedia with a multiple-choice quiz.

mod model;
mod quiz;
mod seed;
mod service;
mod view_model;

pub use model::{Animal, AnimalCategory, GameScore, UserProgress};
pub use quiz::{QuestionKind, QuizError, QuizQuestion, QuizRound, MAX_DISTRACTORS, QUIZ_LENGTH};
pub use service::{AnimalService, QuizService, RECENT_SCORES_LIMIT};
pub use view_model::EncyclopediaViewModel;

use super::{open_store, seed_detached, StoreLocation};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::schema::{EntitySchema, FieldDef, Schema};
use crate::store::{Store, StoreResult};
use std::path::Path;
use std::sync::Arc;

pub const ANIMAL: &str = "animal";
pub const GAME_SCORE: &str = "game_score";
pub const USER_PROGRESS: &str = "user_progress";

pub static SCHEMA: Schema = Schema {
    name: "animals",
    version: 1,
    entities: &[
        EntitySchema {
            name: ANIMAL,
            fields: &[
                FieldDef::text("name").required(),
                FieldDef::text("scientific_name"),
                FieldDef::text("description"),
                FieldDef::text("habitat"),
                FieldDef::text("lifespan"),
                FieldDef::text("fact"),
                FieldDef::text("category"),
                FieldDef::text("image_name"),
                FieldDef::boolean("is_favorite"),
            ],
        },
        EntitySchema {
            name: GAME_SCORE,
            fields: &[
                FieldDef::integer("correct_answers"),
                FieldDef::integer("total_questions"),
                FieldDef::timestamp("played_at"),
            ],
        },
        EntitySchema {
            name: USER_PROGRESS,
            fields: &[
                FieldDef::integer("games_played"),
                FieldDef::integer("total_correct_answers"),
                FieldDef::integer("total_questions"),
            ],
        },
    ],
};

/// Opened animals app: one store shared by its services.
pub struct AnimalsApp {
    store: Store,
    animals: AnimalService,
    quiz: QuizService,
}

impl AnimalsApp {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(
            StoreLocation::File(path.as_ref()),
            StoreConfig::default(),
            Arc::new(SystemClock),
        )
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_with(StoreLocation::Memory, StoreConfig::default(), Arc::new(SystemClock))
    }

    /// Opens the store and seeds the default animals when it is empty.
    pub fn open_with(
        location: StoreLocation<'_>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let store = open_store(&SCHEMA, location, config)?;
        seed_detached(&store, SCHEMA.name, |worker| {
            AnimalService::new(worker.clone()).seed_if_empty()
        });

        let animals = AnimalService::new(store.clone());
        let quiz = QuizService::new(store.clone(), clock);
        Ok(Self {
            store,
            animals,
            quiz,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn animals(&self) -> &AnimalService {
        &self.animals
    }

    pub fn quiz(&self) -> &QuizService {
        &self.quiz
    }

    pub fn encyclopedia(&self) -> EncyclopediaViewModel {
        EncyclopediaViewModel::new(self.animals.clone())
    }
}
