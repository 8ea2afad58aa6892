//! Bounce toy: physics settings and the persisted play session.
//!
//! # Invariants
//! - Settings are clamped on construction: gravity `[0, 2000]`,
//!   bounciness `[0, 1]`, air resistance `[0.9, 1]`.
//! - The stored high score never decreases.

use super::{open_store, StoreLocation};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::model::{Record, RecordId};
use crate::schema::{EntitySchema, FieldDef, Schema};
use crate::service::{Entity, EntityService, ServiceResult};
use crate::store::{Query, SortKey, Store, StoreResult};
use chrono::{DateTime, Utc};
use log::info;
use std::path::Path;
use std::sync::Arc;

pub const GAME_SESSION: &str = "game_session";

pub static SCHEMA: Schema = Schema {
    name: "ball",
    version: 1,
    entities: &[EntitySchema {
        name: GAME_SESSION,
        fields: &[
            FieldDef::integer("bounces"),
            FieldDef::real("gravity"),
            FieldDef::real("bounciness"),
            FieldDef::real("air_resistance"),
            FieldDef::integer("high_score"),
            FieldDef::timestamp("last_played"),
        ],
    }],
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsSettings {
    gravity: f64,
    bounciness: f64,
    air_resistance: f64,
}

impl PhysicsSettings {
    pub const MAX_GRAVITY: f64 = 2000.0;
    pub const MIN_AIR_RESISTANCE: f64 = 0.9;

    pub fn new(gravity: f64, bounciness: f64, air_resistance: f64) -> Self {
        Self {
            gravity: clamp_or(gravity, 0.0, Self::MAX_GRAVITY),
            bounciness: clamp_or(bounciness, 0.0, 1.0),
            air_resistance: clamp_or(air_resistance, Self::MIN_AIR_RESISTANCE, 1.0),
        }
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn bounciness(&self) -> f64 {
        self.bounciness
    }

    pub fn air_resistance(&self) -> f64 {
        self.air_resistance
    }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self::new(980.0, 0.8, 0.99)
    }
}

/// NaN maps to the lower bound.
fn clamp_or(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub id: RecordId,
    pub bounces: i64,
    pub settings: PhysicsSettings,
    pub high_score: i64,
    pub last_played: Option<DateTime<Utc>>,
}

impl Entity for GameSession {
    const NAME: &'static str = GAME_SESSION;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::desc("last_played")];

    fn from_record(record: &Record) -> Self {
        let defaults = PhysicsSettings::default();
        Self {
            id: record.id(),
            bounces: record.integer("bounces").unwrap_or(0),
            settings: PhysicsSettings::new(
                record.real("gravity").unwrap_or(defaults.gravity),
                record.real("bounciness").unwrap_or(defaults.bounciness),
                record.real("air_resistance").unwrap_or(defaults.air_resistance),
            ),
            high_score: record.integer("high_score").unwrap_or(0),
            last_played: record.timestamp("last_played"),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("bounces", self.bounces)
            .set("gravity", self.settings.gravity)
            .set("bounciness", self.settings.bounciness)
            .set("air_resistance", self.settings.air_resistance)
            .set("high_score", self.high_score)
            .set("last_played", self.last_played);
    }
}

#[derive(Clone)]
pub struct SessionService {
    sessions: EntityService<GameSession>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: EntityService::new(store),
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        self.sessions.store()
    }

    /// Most recently played session.
    pub fn latest(&self) -> Option<GameSession> {
        self.sessions
            .fetch(&Query::new().sorted_by(GameSession::NATURAL_SORT).limit(1))
            .into_iter()
            .next()
    }

    /// Saves the current bounce count and settings.
    ///
    /// Updates the latest session, or creates one when none exists or it
    /// vanished meanwhile.
    pub fn save(&self, bounces: i64, settings: PhysicsSettings) -> ServiceResult<GameSession> {
        let now = self.clock.now();
        if let Some(mut session) = self.latest() {
            session.bounces = bounces;
            session.settings = settings;
            session.high_score = session.high_score.max(bounces);
            session.last_played = Some(now);
            if self.sessions.update(&session)?.is_applied() {
                info!(
                    "event=ball_session_save module=apps status=ok mode=update high_score={}",
                    session.high_score
                );
                return Ok(session);
            }
        }

        let session = GameSession {
            id: RecordId::nil(),
            bounces,
            settings,
            high_score: bounces.max(0),
            last_played: Some(now),
        };
        let mut record = Record::new(GameSession::NAME);
        session.apply_to(&mut record);
        let created = self.sessions.create(record)?;
        info!(
            "event=ball_session_save module=apps status=ok mode=create high_score={}",
            created.high_score
        );
        Ok(created)
    }
}

/// In-memory bounce counter backed by the persisted session.
pub struct BallGameViewModel {
    service: SessionService,
    bounces: i64,
    high_score: i64,
    settings: PhysicsSettings,
}

impl BallGameViewModel {
    /// Restores high score and settings from the latest session.
    pub fn new(service: SessionService) -> Self {
        let (high_score, settings) = service
            .latest()
            .map(|session| (session.high_score, session.settings))
            .unwrap_or_default();
        Self {
            service,
            bounces: 0,
            high_score,
            settings,
        }
    }

    pub fn bounces(&self) -> i64 {
        self.bounces
    }

    pub fn high_score(&self) -> i64 {
        self.high_score
    }

    pub fn settings(&self) -> PhysicsSettings {
        self.settings
    }

    /// Counts one bounce; returns whether it set a new high score.
    pub fn record_bounce(&mut self) -> bool {
        self.bounces += 1;
        if self.bounces > self.high_score {
            self.high_score = self.bounces;
            return true;
        }
        false
    }

    pub fn update_settings(&mut self, settings: PhysicsSettings) -> ServiceResult<()> {
        self.settings = settings;
        self.save()
    }

    /// Persists the run and starts counting from zero.
    pub fn reset(&mut self) -> ServiceResult<()> {
        self.save()?;
        self.bounces = 0;
        Ok(())
    }

    pub fn save(&self) -> ServiceResult<()> {
        self.service.save(self.bounces, self.settings).map(|_| ())
    }
}

pub struct BallApp {
    store: Store,
    sessions: SessionService,
}

impl BallApp {
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

    pub fn open_with(
        location: StoreLocation<'_>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let store = open_store(&SCHEMA, location, config)?;
        let sessions = SessionService::new(store.clone(), clock);
        Ok(Self { store, sessions })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    pub fn game(&self) -> BallGameViewModel {
        BallGameViewModel::new(self.sessions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::PhysicsSettings;

    #[test]
    fn settings_are_clamped() {
        let settings = PhysicsSettings::new(5000.0, 1.5, 0.5);
        assert_eq!(settings.gravity(), 2000.0);
        assert_eq!(settings.bounciness(), 1.0);
        assert_eq!(settings.air_resistance(), 0.9);

        let settings = PhysicsSettings::new(-10.0, -1.0, 2.0);
        assert_eq!(settings.gravity(), 0.0);
        assert_eq!(settings.bounciness(), 0.0);
        assert_eq!(settings.air_resistance(), 1.0);
    }

    #[test]
    fn defaults_match_earth_like_values() {
        let settings = PhysicsSettings::default();
        assert_eq!(settings.gravity(), 980.0);
        assert_eq!(settings.bounciness(), 0.8);
        assert_eq!(settings.air_resistance(), 0.99);
    }

    #[test]
    fn nan_falls_back_to_lower_bound() {
        let settings = PhysicsSettings::new(f64::NAN, f64::NAN, f64::NAN);
        assert_eq!(settings.gravity(), 0.0);
        assert_eq!(settings.air_resistance(), 0.9);
    }
}
