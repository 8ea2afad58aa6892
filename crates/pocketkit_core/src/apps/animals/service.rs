use super::model::{Animal, AnimalCategory, GameScore, UserProgress};
use super::quiz::{QuizError, QuizRound, QUIZ_LENGTH};
use super::seed::default_animals;
use super::USER_PROGRESS;
use crate::clock::Clock;
use crate::model::{Record, RecordId};
use crate::service::{
    first_or_create, staged_unit, Entity, EntityService, ServiceResult, ValidationError,
    WriteOutcome,
};
use crate::store::{Condition, Query, Store};
use log::{error, info};
use rand::Rng;
use std::sync::Arc;

pub const RECENT_SCORES_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct AnimalService {
    animals: EntityService<Animal>,
}

impl AnimalService {
    pub fn new(store: Store) -> Self {
        Self {
            animals: EntityService::new(store),
        }
    }

    pub fn store(&self) -> &Store {
        self.animals.store()
    }

    /// Every animal sorted by name.
    pub fn fetch_all(&self) -> Vec<Animal> {
        self.animals.fetch_all()
    }

    pub fn fetch_favorites(&self) -> Vec<Animal> {
        self.animals
            .fetch_where([Condition::eq("is_favorite", true)])
    }

    pub fn fetch_by_category(&self, category: AnimalCategory) -> Vec<Animal> {
        self.animals
            .fetch_where([Condition::eq("category", category.as_str())])
    }

    pub fn get(&self, id: RecordId) -> Option<Animal> {
        self.animals.get(id)
    }

    pub fn toggle_favorite(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        self.animals.toggle(id, "is_favorite")
    }

    /// Name, scientific name or description containing `text`.
    pub fn search(&self, text: &str) -> Vec<Animal> {
        self.animals.search(text)
    }

    /// Inserts the default animals when none exist yet.
    pub fn seed_if_empty(&self) -> ServiceResult<usize> {
        let store = self.animals.store();
        if store.count(Animal::NAME, &Query::new())? > 0 {
            return Ok(0);
        }

        let mut seeded = 0;
        for record in default_animals() {
            self.animals.stage_create(record)?;
            seeded += 1;
        }
        store.commit()?;
        Ok(seeded)
    }
}

/// Quiz rounds, score history and lifetime progress.
#[derive(Clone)]
pub struct QuizService {
    store: Store,
    scores: EntityService<GameScore>,
    animals: AnimalService,
    clock: Arc<dyn Clock>,
}

impl QuizService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            scores: EntityService::new(store.clone()),
            animals: AnimalService::new(store.clone()),
            store,
            clock,
        }
    }

    /// Starts a round of [`QUIZ_LENGTH`] questions.
    pub fn start_round<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<QuizRound, QuizError> {
        let animals = self.animals.fetch_all();
        let round = QuizRound::generate(&animals, QUIZ_LENGTH, rng);
        match &round {
            Ok(round) => info!(
                "event=quiz_start module=apps status=ok questions={}",
                round.len()
            ),
            Err(err) => error!("event=quiz_start module=apps status=error error={err}"),
        }
        round
    }

    /// Saves the score of a finished round.
    pub fn finish_round(&self, round: &QuizRound) -> ServiceResult<GameScore> {
        if !round.is_finished() {
            return Err(ValidationError::InvalidValue {
                field: "round",
                message: "round is not finished".to_string(),
            }
            .into());
        }
        self.save_score(round.correct_count() as i64, round.len() as i64)
    }

    /// Records a score and updates lifetime progress in one commit.
    pub fn save_score(&self, correct_answers: i64, total_questions: i64) -> ServiceResult<GameScore> {
        if total_questions < 0 || correct_answers < 0 || correct_answers > total_questions {
            return Err(ValidationError::InvalidValue {
                field: "correct_answers",
                message: format!("must be within 0..={total_questions}"),
            }
            .into());
        }

        let score = staged_unit(&self.store, || {
            let score = Record::new(GameScore::NAME)
                .with("correct_answers", correct_answers)
                .with("total_questions", total_questions)
                .with("played_at", self.clock.now());
            let score = self.scores.stage_create(score)?;

            let mut progress = first_or_create(&self.store, USER_PROGRESS, |record| {
                record
                    .set("games_played", 0_i64)
                    .set("total_correct_answers", 0_i64)
                    .set("total_questions", 0_i64);
            })?;
            let totals = UserProgress::from_record(&progress);
            progress
                .set("games_played", totals.games_played + 1)
                .set(
                    "total_correct_answers",
                    totals.total_correct_answers + correct_answers,
                )
                .set("total_questions", totals.total_questions + total_questions);
            self.store.update(&mut progress)?;
            Ok(score)
        })?;

        self.store.commit()?;
        info!(
            "event=quiz_score_save module=apps status=ok correct={} total={}",
            correct_answers, total_questions
        );
        Ok(GameScore::from_record(&score))
    }

    /// Latest scores, newest first.
    pub fn recent_scores(&self) -> Vec<GameScore> {
        self.scores.fetch(
            &Query::new()
                .sorted_by(GameScore::NATURAL_SORT)
                .limit(RECENT_SCORES_LIMIT),
        )
    }

    pub fn user_progress(&self) -> UserProgress {
        match self.store.query(USER_PROGRESS, &Query::new().limit(1)) {
            Ok(records) => records
                .first()
                .map(UserProgress::from_record)
                .unwrap_or_default(),
            Err(err) => {
                error!("event=quiz_progress_fetch module=apps status=error error={err}");
                UserProgress::default()
            }
        }
    }
}
