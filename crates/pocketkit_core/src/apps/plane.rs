//! Plane-dodge arcade game: flight history and game settings.
//!
//! # Invariants
//! - `game_settings` holds at most one record, created by the first write.
//! - Saving a flight bumps `total_flights` and raises `high_score` in the
//!   same commit.

use super::{open_store, StoreLocation};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::model::{Record, RecordId};
use crate::projection::LiveProjection;
use crate::schema::{EntitySchema, FieldDef, Schema};
use crate::service::{
    first_or_create, staged_unit, Entity, EntityService, ServiceResult, ValidationError,
};
use crate::store::{Query, SortKey, Store, StoreResult};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::path::Path;
use std::sync::Arc;

pub const FLIGHT: &str = "flight";
pub const GAME_SETTINGS: &str = "game_settings";

pub const MIN_DIFFICULTY: i64 = 1;
pub const MAX_DIFFICULTY: i64 = 3;

pub static SCHEMA: Schema = Schema {
    name: "plane",
    version: 1,
    entities: &[
        EntitySchema {
            name: FLIGHT,
            fields: &[
                FieldDef::timestamp("played_at"),
                FieldDef::integer("score"),
                FieldDef::integer("duration"),
                FieldDef::integer("obstacles_avoided"),
            ],
        },
        EntitySchema {
            name: GAME_SETTINGS,
            fields: &[
                FieldDef::integer("difficulty"),
                FieldDef::boolean("sound_enabled"),
                FieldDef::integer("high_score"),
                FieldDef::integer("total_flights"),
            ],
        },
    ],
};

#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    pub id: RecordId,
    pub played_at: Option<DateTime<Utc>>,
    pub score: i64,
    /// Seconds in the air.
    pub duration: i64,
    pub obstacles_avoided: i64,
}

impl Entity for Flight {
    const NAME: &'static str = FLIGHT;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::desc("played_at")];

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            played_at: record.timestamp("played_at"),
            score: record.integer("score").unwrap_or(0),
            duration: record.integer("duration").unwrap_or(0),
            obstacles_avoided: record.integer("obstacles_avoided").unwrap_or(0),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("played_at", self.played_at)
            .set("score", self.score)
            .set("duration", self.duration)
            .set("obstacles_avoided", self.obstacles_avoided);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    pub difficulty: i64,
    pub sound_enabled: bool,
    pub high_score: i64,
    pub total_flights: i64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            difficulty: MIN_DIFFICULTY,
            sound_enabled: true,
            high_score: 0,
            total_flights: 0,
        }
    }
}

impl GameSettings {
    fn from_record(record: &Record) -> Self {
        let defaults = Self::default();
        Self {
            difficulty: record.integer("difficulty").unwrap_or(defaults.difficulty),
            sound_enabled: record.boolean("sound_enabled").unwrap_or(defaults.sound_enabled),
            high_score: record.integer("high_score").unwrap_or(0),
            total_flights: record.integer("total_flights").unwrap_or(0),
        }
    }

    fn write_defaults(record: &mut Record) {
        let defaults = Self::default();
        record
            .set("difficulty", defaults.difficulty)
            .set("sound_enabled", defaults.sound_enabled)
            .set("high_score", defaults.high_score)
            .set("total_flights", defaults.total_flights);
    }
}

#[derive(Clone)]
pub struct FlightService {
    flights: EntityService<Flight>,
    clock: Arc<dyn Clock>,
}

impl FlightService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            flights: EntityService::new(store),
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        self.flights.store()
    }

    /// Flights, newest first.
    pub fn fetch_flights(&self) -> Vec<Flight> {
        self.flights.fetch_all()
    }

    pub fn save_flight(
        &self,
        score: i64,
        duration: i64,
        obstacles_avoided: i64,
    ) -> ServiceResult<Flight> {
        if score < 0 || duration < 0 || obstacles_avoided < 0 {
            return Err(ValidationError::InvalidValue {
                field: "score",
                message: "flight values must not be negative".to_string(),
            }
            .into());
        }

        let (record, current) = staged_unit(self.store(), || {
            let record = Record::new(Flight::NAME)
                .with("played_at", self.clock.now())
                .with("score", score)
                .with("duration", duration)
                .with("obstacles_avoided", obstacles_avoided);
            let record = self.flights.stage_create(record)?;

            let mut settings = self.load_settings()?;
            let current = GameSettings::from_record(&settings);
            settings.set("total_flights", current.total_flights + 1);
            if score > current.high_score {
                settings.set("high_score", score);
            }
            self.store().update(&mut settings)?;
            Ok((record, current))
        })?;

        self.store().commit()?;
        info!(
            "event=flight_save module=apps status=ok score={} new_high_score={}",
            score,
            score > current.high_score
        );
        Ok(Flight::from_record(&record))
    }

    /// Stored settings; defaults until the first write creates them.
    pub fn settings(&self) -> GameSettings {
        match self.store().query(GAME_SETTINGS, &Query::new().limit(1)) {
            Ok(records) => records
                .first()
                .map(GameSettings::from_record)
                .unwrap_or_default(),
            Err(err) => {
                error!("event=plane_settings_fetch module=apps status=error error={err}");
                GameSettings::default()
            }
        }
    }

    /// Changes only the provided settings.
    pub fn update_settings(
        &self,
        difficulty: Option<i64>,
        sound_enabled: Option<bool>,
    ) -> ServiceResult<GameSettings> {
        if let Some(difficulty) = difficulty {
            if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
                return Err(ValidationError::InvalidValue {
                    field: "difficulty",
                    message: format!("must be within {MIN_DIFFICULTY}..={MAX_DIFFICULTY}"),
                }
                .into());
            }
        }

        let record = staged_unit(self.store(), || {
            let mut record = self.load_settings()?;
            if let Some(difficulty) = difficulty {
                record.set("difficulty", difficulty);
            }
            if let Some(sound_enabled) = sound_enabled {
                record.set("sound_enabled", sound_enabled);
            }
            self.store().update(&mut record)?;
            Ok(record)
        })?;
        self.store().commit()?;
        info!("event=plane_settings_update module=apps status=ok");
        Ok(GameSettings::from_record(&record))
    }

    /// Deletes every flight and resets high score and flight count.
    pub fn delete_all_flights(&self) -> ServiceResult<usize> {
        let store = self.store();
        let flights = staged_unit(store, || {
            let flights = store.query(Flight::NAME, &Query::new())?;
            for flight in &flights {
                store.delete(flight)?;
            }

            let mut settings = self.load_settings()?;
            settings.set("high_score", 0_i64).set("total_flights", 0_i64);
            store.update(&mut settings)?;
            Ok(flights)
        })?;

        store.commit()?;
        info!(
            "event=flight_delete_all module=apps status=ok deleted={}",
            flights.len()
        );
        Ok(flights.len())
    }

    fn load_settings(&self) -> StoreResult<Record> {
        first_or_create(self.store(), GAME_SETTINGS, GameSettings::write_defaults)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightStats {
    pub flights: Vec<Flight>,
    pub settings: GameSettings,
}

impl FlightStats {
    pub fn total_score(&self) -> i64 {
        self.flights.iter().map(|flight| flight.score).sum()
    }

    pub fn total_duration(&self) -> i64 {
        self.flights.iter().map(|flight| flight.duration).sum()
    }

    /// Integer mean score; `0` without flights.
    pub fn average_score(&self) -> i64 {
        if self.flights.is_empty() {
            return 0;
        }
        self.total_score() / self.flights.len() as i64
    }
}

/// Flight history and totals, refreshed on store changes.
pub struct StatsViewModel {
    service: FlightService,
    stats: LiveProjection<FlightStats>,
}

impl StatsViewModel {
    pub fn new(service: FlightService) -> Self {
        let loader = service.clone();
        let stats = LiveProjection::new(service.store(), move || FlightStats {
            flights: loader.fetch_flights(),
            settings: loader.settings(),
        });
        Self { service, stats }
    }

    pub fn stats(&self) -> Arc<FlightStats> {
        self.stats.snapshot()
    }

    pub fn delete_all_flights(&self) -> ServiceResult<usize> {
        let deleted = self.service.delete_all_flights()?;
        self.stats.reload();
        Ok(deleted)
    }

    pub fn reload(&self) {
        self.stats.reload();
    }
}

pub struct PlaneApp {
    store: Store,
    flights: FlightService,
}

impl PlaneApp {
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
        let flights = FlightService::new(store.clone(), clock);
        Ok(Self { store, flights })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn flights(&self) -> &FlightService {
        &self.flights
    }

    pub fn stats(&self) -> StatsViewModel {
        StatsViewModel::new(self.flights.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{Flight, FlightStats};
    use uuid::Uuid;

    fn flight(score: i64, duration: i64) -> Flight {
        Flight {
            id: Uuid::new_v4(),
            played_at: None,
            score,
            duration,
            obstacles_avoided: 0,
        }
    }

    #[test]
    fn stats_totals_and_integer_average() {
        let stats = FlightStats {
            flights: vec![flight(10, 30), flight(25, 45), flight(0, 5)],
            ..FlightStats::default()
        };
        assert_eq!(stats.total_score(), 35);
        assert_eq!(stats.total_duration(), 80);
        assert_eq!(stats.average_score(), 11);
        assert_eq!(FlightStats::default().average_score(), 0);
    }
}
