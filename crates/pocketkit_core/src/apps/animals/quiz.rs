//! Multiple-choice quiz generation and grading.
//!
//! # Invariants
//! - A round never repeats an animal.
//! - Distractors are distinct, non-empty and never equal the correct answer.
//! - Each question is graded at most once.

use super::model::Animal;
use crate::model::RecordId;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const QUIZ_LENGTH: usize = 10;
pub const MAX_DISTRACTORS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    NotEnoughAnimals { required: usize, available: usize },
}

impl Display for QuizError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEnoughAnimals {
                required,
                available,
            } => write!(
                f,
                "quiz needs {required} animals but only {available} are available"
            ),
        }
    }
}

impl Error for QuizError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Name,
    Habitat,
    ScientificName,
}

impl QuestionKind {
    pub const ALL: [Self; 3] = [Self::Name, Self::Habitat, Self::ScientificName];

    fn answer_of(self, animal: &Animal) -> &str {
        match self {
            Self::Name => &animal.name,
            Self::Habitat => &animal.habitat,
            Self::ScientificName => &animal.scientific_name,
        }
    }

    fn prompt_for(self, animal: &Animal) -> String {
        match self {
            Self::Name => "Which animal is this?".to_string(),
            Self::Habitat => format!("Where does the {} live?", animal.name),
            Self::ScientificName => format!("What is the scientific name of the {}?", animal.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub animal_id: RecordId,
    /// Image shown with the question.
    pub image_name: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub correct_answer: String,
    /// Correct answer and distractors, shuffled.
    pub answers: Vec<String>,
}

impl QuizQuestion {
    pub fn build<R: Rng + ?Sized>(
        animal: &Animal,
        others: &[&Animal],
        kind: QuestionKind,
        rng: &mut R,
    ) -> Self {
        let correct_answer = kind.answer_of(animal).to_string();
        let candidates: BTreeSet<&str> = others
            .iter()
            .map(|other| kind.answer_of(other))
            .filter(|answer| !answer.is_empty() && *answer != correct_answer)
            .collect();

        let mut distractors: Vec<&str> = candidates.into_iter().collect();
        distractors.shuffle(rng);
        distractors.truncate(MAX_DISTRACTORS);

        let mut answers: Vec<String> = distractors.into_iter().map(str::to_string).collect();
        answers.push(correct_answer.clone());
        answers.shuffle(rng);

        Self {
            animal_id: animal.id,
            image_name: animal.image_name.clone(),
            kind,
            prompt: kind.prompt_for(animal),
            correct_answer,
            answers,
        }
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_answer
    }
}

/// One quiz in progress.
#[derive(Debug, Clone)]
pub struct QuizRound {
    questions: Vec<QuizQuestion>,
    position: usize,
    correct: usize,
    selected: Option<String>,
}

impl QuizRound {
    /// Builds `length` questions about distinct animals picked at random.
    ///
    /// # Errors
    /// - `NotEnoughAnimals` when fewer than `length` animals exist.
    pub fn generate<R: Rng + ?Sized>(
        animals: &[Animal],
        length: usize,
        rng: &mut R,
    ) -> Result<Self, QuizError> {
        if length == 0 || animals.len() < length {
            return Err(QuizError::NotEnoughAnimals {
                required: length.max(1),
                available: animals.len(),
            });
        }

        let picked: Vec<&Animal> = animals.choose_multiple(rng, length).collect();
        let mut questions = Vec::with_capacity(length);
        for animal in picked {
            let others: Vec<&Animal> = animals.iter().filter(|other| other.id != animal.id).collect();
            let kind = QuestionKind::ALL
                .choose(rng)
                .copied()
                .unwrap_or(QuestionKind::Name);
            questions.push(QuizQuestion::build(animal, &others, kind, rng));
        }

        Ok(Self {
            questions,
            position: 0,
            correct: 0,
            selected: None,
        })
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Zero-based index of the current question.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.position)
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Grades `answer` for the current question.
    ///
    /// Returns `None` when the question was already answered or the round
    /// is over.
    pub fn select_answer(&mut self, answer: &str) -> Option<bool> {
        if self.selected.is_some() {
            return None;
        }
        let correct = self.current()?.is_correct(answer);
        self.selected = Some(answer.to_string());
        if correct {
            self.correct += 1;
        }
        Some(correct)
    }

    /// Moves to the next question; `false` once the round is finished.
    pub fn advance(&mut self) -> bool {
        if !self.is_finished() {
            self.position += 1;
        }
        self.selected = None;
        !self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.questions.len()
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }
}

#[cfg(test)]
mod tests {
    use super::{QuestionKind, QuizError, QuizQuestion, QuizRound, MAX_DISTRACTORS};
    use crate::apps::animals::{Animal, AnimalCategory};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn animal(name: &str, habitat: &str) -> Animal {
        Animal {
            id: Uuid::new_v4(),
            name: name.to_string(),
            scientific_name: format!("{name}us"),
            description: String::new(),
            habitat: habitat.to_string(),
            lifespan: String::new(),
            fact: String::new(),
            category: AnimalCategory::Mammal,
            image_name: name.to_lowercase(),
            is_favorite: false,
        }
    }

    fn zoo(count: usize) -> Vec<Animal> {
        (0..count)
            .map(|index| animal(&format!("Animal{index}"), &format!("Habitat{}", index % 4)))
            .collect()
    }

    #[test]
    fn generate_requires_enough_animals() {
        let mut rng = StdRng::seed_from_u64(7);
        let err = QuizRound::generate(&zoo(4), 10, &mut rng).unwrap_err();
        assert_eq!(
            err,
            QuizError::NotEnoughAnimals {
                required: 10,
                available: 4
            }
        );
    }

    #[test]
    fn round_uses_distinct_animals_and_valid_answers() {
        let animals = zoo(12);
        let mut rng = StdRng::seed_from_u64(42);
        let round = QuizRound::generate(&animals, 10, &mut rng).unwrap();

        let ids: BTreeSet<_> = round.questions().iter().map(|q| q.animal_id).collect();
        assert_eq!(ids.len(), 10);

        for question in round.questions() {
            assert!(question.answers.contains(&question.correct_answer));
            assert!(question.answers.len() <= MAX_DISTRACTORS + 1);
            let unique: BTreeSet<_> = question.answers.iter().collect();
            assert_eq!(unique.len(), question.answers.len());
        }
    }

    #[test]
    fn habitat_distractors_exclude_the_correct_habitat() {
        let target = animal("Fox", "Forest");
        let others = [
            animal("Deer", "Forest"),
            animal("Seal", "Coast"),
            animal("Camel", "Desert"),
        ];
        let refs: Vec<&Animal> = others.iter().collect();
        let mut rng = StdRng::seed_from_u64(1);

        let question = QuizQuestion::build(&target, &refs, QuestionKind::Habitat, &mut rng);
        let mut answers = question.answers.clone();
        answers.sort();
        assert_eq!(answers, vec!["Coast", "Desert", "Forest"]);
    }

    #[test]
    fn each_question_is_graded_once() {
        let animals = zoo(10);
        let mut rng = StdRng::seed_from_u64(3);
        let mut round = QuizRound::generate(&animals, 2, &mut rng).unwrap();

        let correct = round.current().unwrap().correct_answer.clone();
        assert_eq!(round.select_answer(&correct), Some(true));
        assert_eq!(round.select_answer(&correct), None);
        assert_eq!(round.correct_count(), 1);

        assert!(round.advance());
        assert_eq!(round.select_answer("definitely wrong"), Some(false));
        assert!(!round.advance());
        assert!(round.is_finished());
        assert_eq!(round.select_answer(&correct), None);
        assert_eq!(round.correct_count(), 1);
    }
}
