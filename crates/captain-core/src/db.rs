//! Persistent card and robot storage using redb.
//!
//! Two tables, both keyed by a string and holding JSON values:
//! `cards` (card id → [`StoredCard`]) and `robots` (robot name → [`Robot`]).
//! Association checks run inside a single write transaction, so two
//! concurrent `associate` calls cannot both put a robot on the same card.

use crate::card::{Robot, RobotFilter, StoredCard};
use crate::error::{CaptainError, Result};
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const CARDS: TableDefinition<&str, &[u8]> = TableDefinition::new("cards");
const ROBOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("robots");

fn store_err(e: impl std::fmt::Display) -> CaptainError {
    CaptainError::Store(e.to_string())
}

static ROBOT_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn validate_robot_name(name: &str) -> Result<()> {
    let re = ROBOT_NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());
    if re.is_match(name) {
        Ok(())
    } else {
        Err(CaptainError::InvalidRobotName(name.to_string()))
    }
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(store_err)
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(store_err)
}

// ---------------------------------------------------------------------------
// CardDb
// ---------------------------------------------------------------------------

pub struct CardDb {
    db: Database,
}

impl std::fmt::Debug for CardDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDb").finish_non_exhaustive()
    }
}

impl CardDb {
    /// Open or create the database at `path`, creating both tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(CARDS).map_err(store_err)?;
        wt.open_table(ROBOTS).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Cards
    // -----------------------------------------------------------------------

    pub fn get_card(&self, card_id: &str) -> Result<Option<StoredCard>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(CARDS).map_err(store_err)?;
        let entry = table.get(card_id).map_err(store_err)?;
        entry.map(|v| decode(v.value())).transpose()
    }

    pub fn card_exists(&self, card_id: &str) -> Result<bool> {
        Ok(self.get_card(card_id)?.is_some())
    }

    /// Insert or replace a card, stamping `updated_at`.
    pub fn put_card(&self, card_id: &str, notes: &str, program: Option<&str>) -> Result<StoredCard> {
        let card = StoredCard {
            card_id: card_id.to_string(),
            notes: notes.to_string(),
            program: program.map(str::to_string),
            updated_at: Utc::now(),
        };
        let value = encode(&card)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(CARDS).map_err(store_err)?;
            table.insert(card_id, value.as_slice()).map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(card)
    }

    // -----------------------------------------------------------------------
    // Robots
    // -----------------------------------------------------------------------

    /// Robots ordered by name.
    pub fn list_robots(&self, filter: RobotFilter) -> Result<Vec<Robot>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(ROBOTS).map_err(store_err)?;
        let mut robots = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (_, v) = entry.map_err(store_err)?;
            let robot: Robot = decode(v.value())?;
            if filter.matches(&robot) {
                robots.push(robot);
            }
        }
        Ok(robots)
    }

    pub fn get_robot(&self, name: &str) -> Result<Robot> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(ROBOTS).map_err(store_err)?;
        let entry = table.get(name).map_err(store_err)?;
        match entry {
            Some(v) => decode(v.value()),
            None => Err(CaptainError::RobotNotFound(name.to_string())),
        }
    }

    /// Create a robot or change its URL. An existing association is kept.
    pub fn put_robot(&self, name: &str, url: &str) -> Result<Robot> {
        validate_robot_name(name)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        let robot = {
            let mut table = wt.open_table(ROBOTS).map_err(store_err)?;
            let card_id = match table.get(name).map_err(store_err)? {
                Some(v) => decode::<Robot>(v.value())?.card_id,
                None => String::new(),
            };
            let robot = Robot {
                name: name.to_string(),
                url: url.to_string(),
                card_id,
            };
            let value = encode(&robot)?;
            table.insert(name, value.as_slice()).map_err(store_err)?;
            robot
        };
        wt.commit().map_err(store_err)?;
        Ok(robot)
    }

    /// Remove a robot. Returns false when there was nothing to remove.
    pub fn delete_robot(&self, name: &str) -> Result<bool> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let removed = {
            let mut table = wt.open_table(ROBOTS).map_err(store_err)?;
            let old = table.remove(name).map_err(store_err)?;
            old.is_some()
        };
        wt.commit().map_err(store_err)?;
        Ok(removed)
    }

    /// Put robot `name` on card `card_id`. The card must exist and have no
    /// robot yet.
    pub fn associate(&self, name: &str, card_id: &str) -> Result<Robot> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let robot = {
            let cards = wt.open_table(CARDS).map_err(store_err)?;
            if cards.get(card_id).map_err(store_err)?.is_none() {
                return Err(CaptainError::CardNotFound(card_id.to_string()));
            }
            let mut robots = wt.open_table(ROBOTS).map_err(store_err)?;
            for entry in robots.iter().map_err(store_err)? {
                let (_, v) = entry.map_err(store_err)?;
                let other: Robot = decode(v.value())?;
                if other.card_id == card_id {
                    return Err(CaptainError::RobotAlreadyAssociated(card_id.to_string()));
                }
            }
            let mut robot: Robot = match robots.get(name).map_err(store_err)? {
                Some(v) => decode(v.value())?,
                None => return Err(CaptainError::RobotNotFound(name.to_string())),
            };
            robot.card_id = card_id.to_string();
            let value = encode(&robot)?;
            robots.insert(name, value.as_slice()).map_err(store_err)?;
            robot
        };
        wt.commit().map_err(store_err)?;
        Ok(robot)
    }

    pub fn dissociate(&self, name: &str) -> Result<Robot> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let robot = {
            let mut robots = wt.open_table(ROBOTS).map_err(store_err)?;
            let mut robot: Robot = match robots.get(name).map_err(store_err)? {
                Some(v) => decode(v.value())?,
                None => return Err(CaptainError::RobotNotFound(name.to_string())),
            };
            robot.card_id.clear();
            let value = encode(&robot)?;
            robots.insert(name, value.as_slice()).map_err(store_err)?;
            robot
        };
        wt.commit().map_err(store_err)?;
        Ok(robot)
    }

    pub fn robot_for_card(&self, card_id: &str) -> Result<Option<Robot>> {
        if card_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list_robots(RobotFilter::Used)?
            .into_iter()
            .find(|r| r.card_id == card_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, CardDb) {
        let dir = TempDir::new().unwrap();
        let db = CardDb::open(&dir.path().join("test.redb")).unwrap();
        (dir, db)
    }

    #[test]
    fn unknown_card_is_none() {
        let (_dir, db) = open_tmp();
        assert!(db.get_card("A1").unwrap().is_none());
        assert!(!db.card_exists("A1").unwrap());
    }

    #[test]
    fn put_card_upserts() {
        let (_dir, db) = open_tmp();
        let first = db.put_card("A1", "one", Some("W10=")).unwrap();
        let second = db.put_card("A1", "two", None).unwrap();
        assert!(second.updated_at >= first.updated_at);

        let stored = db.get_card("A1").unwrap().unwrap();
        assert_eq!(stored.notes, "two");
        assert_eq!(stored.program, None);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.redb");
        {
            let db = CardDb::open(&path).unwrap();
            db.put_card("A1", "kept", Some("W10=")).unwrap();
            db.put_robot("r1", "http://r1").unwrap();
        }
        let db = CardDb::open(&path).unwrap();
        assert_eq!(db.get_card("A1").unwrap().unwrap().notes, "kept");
        assert_eq!(db.get_robot("r1").unwrap().url, "http://r1");
    }

    #[test]
    fn put_robot_keeps_association() {
        let (_dir, db) = open_tmp();
        db.put_card("A1", "", None).unwrap();
        db.put_robot("r1", "http://old").unwrap();
        db.associate("r1", "A1").unwrap();

        let robot = db.put_robot("r1", "http://new").unwrap();
        assert_eq!(robot.url, "http://new");
        assert_eq!(robot.card_id, "A1");
    }

    #[test]
    fn robot_names_are_validated() {
        let (_dir, db) = open_tmp();
        assert!(matches!(
            db.put_robot("bad name", "http://x"),
            Err(CaptainError::InvalidRobotName(_))
        ));
        assert!(matches!(
            db.put_robot("../x", "http://x"),
            Err(CaptainError::InvalidRobotName(_))
        ));
        db.put_robot("thymio-2_b", "http://x").unwrap();
    }

    #[test]
    fn associate_requires_existing_card_and_robot() {
        let (_dir, db) = open_tmp();
        db.put_robot("r1", "http://r1").unwrap();
        assert!(matches!(
            db.associate("r1", "A1"),
            Err(CaptainError::CardNotFound(_))
        ));
        db.put_card("A1", "", None).unwrap();
        assert!(matches!(
            db.associate("ghost", "A1"),
            Err(CaptainError::RobotNotFound(_))
        ));
        db.associate("r1", "A1").unwrap();
        assert_eq!(db.robot_for_card("A1").unwrap().unwrap().name, "r1");
    }

    #[test]
    fn one_robot_per_card() {
        let (_dir, db) = open_tmp();
        db.put_card("A1", "", None).unwrap();
        db.put_robot("r1", "http://r1").unwrap();
        db.put_robot("r2", "http://r2").unwrap();
        db.associate("r1", "A1").unwrap();
        assert!(matches!(
            db.associate("r2", "A1"),
            Err(CaptainError::RobotAlreadyAssociated(_))
        ));
        db.dissociate("r1").unwrap();
        db.associate("r2", "A1").unwrap();
        assert_eq!(db.robot_for_card("A1").unwrap().unwrap().name, "r2");
    }

    #[test]
    fn list_robots_filters_and_orders_by_name() {
        let (_dir, db) = open_tmp();
        db.put_card("A1", "", None).unwrap();
        db.put_robot("zeta", "http://z").unwrap();
        db.put_robot("alpha", "http://a").unwrap();
        db.associate("zeta", "A1").unwrap();

        let all: Vec<String> = db
            .list_robots(RobotFilter::All)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(all, vec!["alpha", "zeta"]);
        assert_eq!(db.list_robots(RobotFilter::Used).unwrap()[0].name, "zeta");
        assert_eq!(db.list_robots(RobotFilter::Free).unwrap()[0].name, "alpha");
    }

    #[test]
    fn delete_and_dissociate_unknown_robot() {
        let (_dir, db) = open_tmp();
        assert!(!db.delete_robot("ghost").unwrap());
        assert!(matches!(
            db.dissociate("ghost"),
            Err(CaptainError::RobotNotFound(_))
        ));
        db.put_robot("r1", "http://r1").unwrap();
        assert!(db.delete_robot("r1").unwrap());
        assert!(db.get_robot("r1").is_err());
    }

    #[test]
    fn robot_for_card_without_robot_is_none() {
        let (_dir, db) = open_tmp();
        db.put_robot("r1", "http://r1").unwrap();
        assert!(db.robot_for_card("A1").unwrap().is_none());
        assert!(db.robot_for_card("").unwrap().is_none());
    }
}
