use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use postgres::error::SqlState;
use postgres::types::ToSql;
use postgres::{Client, NoTls, Row};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, TimingError};
use crate::models::{
    Capture, CaptureId, CaptureView, Category, CategoryId, Driver, Event, EventId, NewCapture,
    Penalties, Stage, StageId, VehicleId, VehicleProfile,
};
use crate::store::CaptureStore;

type Manager = PostgresConnectionManager<NoTls>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL
);
CREATE TABLE IF NOT EXISTS stages (
    id BIGSERIAL PRIMARY KEY,
    event_id BIGINT NOT NULL REFERENCES events (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    order_number INTEGER NOT NULL,
    neutralized BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE TABLE IF NOT EXISTS categories (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    picture TEXT,
    team_name TEXT
);
CREATE TABLE IF NOT EXISTS vehicles (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    category_id BIGINT NOT NULL REFERENCES categories (id),
    user_id BIGINT REFERENCES users (id)
);
CREATE TABLE IF NOT EXISTS stage_results (
    id BIGSERIAL PRIMARY KEY,
    stage_id BIGINT NOT NULL REFERENCES stages (id) ON DELETE CASCADE,
    vehicle_id BIGINT NOT NULL REFERENCES vehicles (id) ON DELETE CASCADE,
    ts TIMESTAMP,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    elapsed_seconds BIGINT,
    penalty_waypoint_ms BIGINT NOT NULL DEFAULT 0,
    penalty_speed_ms BIGINT NOT NULL DEFAULT 0,
    discount_claim_ms BIGINT NOT NULL DEFAULT 0,
    UNIQUE (vehicle_id, stage_id)
);
CREATE INDEX IF NOT EXISTS stage_results_stage_idx ON stage_results (stage_id);
";

const CAPTURE_COLUMNS: &str = "r.id, r.stage_id, r.vehicle_id, r.ts, r.latitude, r.longitude, r.elapsed_seconds,
    r.penalty_waypoint_ms, r.penalty_speed_ms, r.discount_claim_ms";

const VEHICLE_COLUMNS: &str = "v.id AS profile_id, v.name AS vehicle_name,
    c.id AS category_id, c.name AS category_name,
    u.id AS user_id, u.first_name, u.last_name, u.picture, u.team_name";

const VEHICLE_JOINS: &str = "INNER JOIN categories c ON c.id = v.category_id
    LEFT JOIN users u ON u.id = v.user_id";

pub fn establish_connection(config: &Config) -> Result<Client> {
    Ok(Client::connect(config.database_url()?, NoTls)?)
}

pub fn create_db(db: &mut Client) -> Result<()> {
    db.batch_execute(SCHEMA)?;
    info!("schema created");
    Ok(())
}

pub fn empty_db(db: &mut Client) -> Result<()> {
    db.batch_execute(
        "DROP TABLE IF EXISTS stage_results, vehicles, users, categories, stages, events CASCADE",
    )?;
    info!("schema dropped");
    Ok(())
}

/// Postgres-backed capture store on an r2d2 pool.
pub struct PgStore {
    pool: Pool<Manager>,
}

impl PgStore {
    pub fn connect(config: &Config) -> Result<Self> {
        let pg_config: postgres::Config = config.database_url()?.parse()?;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder().max_size(config.pool_size).build(manager)?;
        Ok(PgStore { pool })
    }

    fn conn(&self) -> Result<PooledConnection<Manager>> {
        Ok(self.pool.get()?)
    }

    fn views(&self, filter: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<CaptureView>> {
        let sql = format!(
            "SELECT {CAPTURE_COLUMNS}, s.order_number, s.neutralized, {VEHICLE_COLUMNS}
             FROM stage_results r
             INNER JOIN stages s ON s.id = r.stage_id
             INNER JOIN vehicles v ON v.id = r.vehicle_id
             {VEHICLE_JOINS}
             WHERE s.event_id = $1 {filter}
             ORDER BY r.vehicle_id, s.order_number, r.id"
        );
        let rows = self.conn()?.query(sql.as_str(), params)?;

        let mut vehicles: HashMap<VehicleId, Arc<VehicleProfile>> = HashMap::new();
        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let capture = decode_capture(row)?;
            let vehicle = match vehicles.get(&capture.vehicle_id) {
                Some(vehicle) => Arc::clone(vehicle),
                None => {
                    let vehicle = Arc::new(decode_vehicle(row)?);
                    vehicles.insert(capture.vehicle_id, Arc::clone(&vehicle));
                    vehicle
                }
            };
            views.push(CaptureView {
                capture,
                stage_order: row.try_get("order_number")?,
                neutralized: row.try_get("neutralized")?,
                vehicle,
            });
        }
        Ok(views)
    }
}

fn decode_event(row: &Row) -> Result<Event> {
    Ok(Event {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
    })
}

fn decode_stage(row: &Row) -> Result<Stage> {
    Ok(Stage {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        name: row.try_get("name")?,
        order_number: row.try_get("order_number")?,
        neutralized: row.try_get("neutralized")?,
    })
}

fn decode_capture(row: &Row) -> Result<Capture> {
    Ok(Capture {
        id: row.try_get("id")?,
        stage_id: row.try_get("stage_id")?,
        vehicle_id: row.try_get("vehicle_id")?,
        timestamp: row.try_get("ts")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        elapsed_time_seconds: row.try_get("elapsed_seconds")?,
        penalties: Penalties {
            waypoint: Duration::milliseconds(row.try_get("penalty_waypoint_ms")?),
            speed: Duration::milliseconds(row.try_get("penalty_speed_ms")?),
            discount: Duration::milliseconds(row.try_get("discount_claim_ms")?),
        },
    })
}

fn decode_vehicle(row: &Row) -> Result<VehicleProfile> {
    let user_id: Option<i64> = row.try_get("user_id")?;
    let driver = match user_id {
        Some(_) => Some(Driver {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            picture: row.try_get::<_, Option<String>>("picture")?.unwrap_or_default(),
            team_name: row.try_get::<_, Option<String>>("team_name")?.unwrap_or_default(),
        }),
        None => None,
    };
    Ok(VehicleProfile {
        id: row.try_get("profile_id")?,
        name: row.try_get("vehicle_name")?,
        category: Category {
            id: row.try_get("category_id")?,
            name: row.try_get("category_name")?,
        },
        driver,
    })
}

fn duplicate_or(err: postgres::Error, vehicle_id: VehicleId, stage_id: StageId) -> TimingError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        TimingError::DuplicateCapture {
            vehicle_id,
            stage_id,
        }
    } else {
        err.into()
    }
}

impl CaptureStore for PgStore {
    fn event(&self, id: EventId) -> Result<Option<Event>> {
        let row = self.conn()?.query_opt(
            "SELECT id, name, start_date, end_date FROM events WHERE id = $1",
            &[&id],
        )?;
        row.as_ref().map(decode_event).transpose()
    }

    fn stage(&self, id: StageId) -> Result<Option<Stage>> {
        let row = self.conn()?.query_opt(
            "SELECT id, event_id, name, order_number, neutralized FROM stages WHERE id = $1",
            &[&id],
        )?;
        row.as_ref().map(decode_stage).transpose()
    }

    fn vehicle(&self, id: VehicleId) -> Result<Option<VehicleProfile>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles v {VEHICLE_JOINS} WHERE v.id = $1");
        let row = self.conn()?.query_opt(sql.as_str(), &[&id])?;
        row.as_ref().map(decode_vehicle).transpose()
    }

    fn capture(&self, id: CaptureId) -> Result<Option<Capture>> {
        let sql = format!("SELECT {CAPTURE_COLUMNS} FROM stage_results r WHERE r.id = $1");
        let row = self.conn()?.query_opt(sql.as_str(), &[&id])?;
        row.as_ref().map(decode_capture).transpose()
    }

    fn timed_captures(&self, event_id: EventId) -> Result<Vec<CaptureView>> {
        self.views("AND r.ts IS NOT NULL", &[&event_id])
    }

    fn captures_for_event(&self, event_id: EventId) -> Result<Vec<CaptureView>> {
        self.views("", &[&event_id])
    }

    fn captures_for_category(&self, event_id: EventId, category_id: CategoryId) -> Result<Vec<CaptureView>> {
        self.views("AND v.category_id = $2", &[&event_id, &category_id])
    }

    fn captures_for_stage_order(&self, event_id: EventId, stage_order: i32) -> Result<Vec<CaptureView>> {
        self.views("AND s.order_number = $2", &[&event_id, &stage_order])
    }

    fn exists(&self, vehicle_id: VehicleId, stage_id: StageId) -> Result<bool> {
        let row = self.conn()?.query_one(
            "SELECT EXISTS (SELECT 1 FROM stage_results WHERE vehicle_id = $1 AND stage_id = $2)",
            &[&vehicle_id, &stage_id],
        )?;
        Ok(row.try_get(0)?)
    }

    fn find_by_vehicle_and_stage(&self, vehicle_id: VehicleId, stage_id: StageId) -> Result<Option<Capture>> {
        let sql = format!(
            "SELECT {CAPTURE_COLUMNS} FROM stage_results r WHERE r.vehicle_id = $1 AND r.stage_id = $2"
        );
        let row = self.conn()?.query_opt(sql.as_str(), &[&vehicle_id, &stage_id])?;
        row.as_ref().map(decode_capture).transpose()
    }

    fn insert_capture(&self, new: &NewCapture) -> Result<Capture> {
        let sql = format!(
            "INSERT INTO stage_results AS r (stage_id, vehicle_id, ts, latitude, longitude)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CAPTURE_COLUMNS}"
        );
        let row = self
            .conn()?
            .query_one(
                sql.as_str(),
                &[&new.stage_id, &new.vehicle_id, &new.timestamp, &new.latitude, &new.longitude],
            )
            .map_err(|e| duplicate_or(e, new.vehicle_id, new.stage_id))?;
        decode_capture(&row)
    }

    fn save_capture(&self, capture: &Capture) -> Result<()> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE stage_results SET
                    stage_id = $2, vehicle_id = $3, ts = $4, latitude = $5, longitude = $6,
                    elapsed_seconds = $7, penalty_waypoint_ms = $8, penalty_speed_ms = $9,
                    discount_claim_ms = $10
                 WHERE id = $1",
                &[
                    &capture.id,
                    &capture.stage_id,
                    &capture.vehicle_id,
                    &capture.timestamp,
                    &capture.latitude,
                    &capture.longitude,
                    &capture.elapsed_time_seconds,
                    &capture.penalties.waypoint.num_milliseconds(),
                    &capture.penalties.speed.num_milliseconds(),
                    &capture.penalties.discount.num_milliseconds(),
                ],
            )
            .map_err(|e| duplicate_or(e, capture.vehicle_id, capture.stage_id))?;
        if updated == 0 {
            return Err(TimingError::capture_not_found(capture.id));
        }
        Ok(())
    }

    fn save_elapsed(&self, id: CaptureId, elapsed_time_seconds: i64) -> Result<()> {
        let updated = self.conn()?.execute(
            "UPDATE stage_results SET elapsed_seconds = $2 WHERE id = $1",
            &[&id, &elapsed_time_seconds],
        )?;
        if updated == 0 {
            return Err(TimingError::capture_not_found(id));
        }
        Ok(())
    }

    fn delete_capture(&self, id: CaptureId) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM stage_results WHERE id = $1", &[&id])?;
        Ok(deleted > 0)
    }
}
