use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};

use crate::{
    DatabaseError,
    persistence::{DatabaseResult, get_connection, to_sql_option},
    player::{Player, PlayerId, Profession, Race},
};

pub const PLAYERS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    title TEXT,
    race TEXT NOT NULL,
    profession TEXT NOT NULL,
    birthday INTEGER NOT NULL,
    experience INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 0,
    until_next_level INTEGER NOT NULL DEFAULT 0,
    banned INTEGER NOT NULL DEFAULT 0
);";

impl ToSql for Race {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Race {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Race::from_literal(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl ToSql for Profession {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Profession {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Profession::from_literal(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

/// Conjunction of independently optional clauses; an absent field imposes no
/// constraint. Ranges are inclusive at both ends.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlayerFilter {
    pub name: Option<String>,
    pub title: Option<String>,
    pub race: Option<Race>,
    pub profession: Option<Profession>,
    pub after: Option<i64>,
    pub before: Option<i64>,
    pub banned: Option<bool>,
    pub min_experience: Option<i32>,
    pub max_experience: Option<i32>,
    pub min_level: Option<i32>,
    pub max_level: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerOrder {
    Id,
    Name,
    Experience,
    Birthday,
    Level,
}

impl PlayerOrder {
    pub const ALL: [PlayerOrder; 5] = [
        PlayerOrder::Id,
        PlayerOrder::Name,
        PlayerOrder::Experience,
        PlayerOrder::Birthday,
        PlayerOrder::Level,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            PlayerOrder::Id => "id",
            PlayerOrder::Name => "name",
            PlayerOrder::Experience => "experience",
            PlayerOrder::Birthday => "birthday",
            PlayerOrder::Level => "level",
        }
    }

    pub fn from_field_name(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.field_name() == s)
    }
}

pub trait PlayerRepository {
    fn get_player_by_id(&self, id: PlayerId) -> DatabaseResult<Option<Player>>;
    fn create_player(&self, player: &Player) -> DatabaseResult<PlayerId>;
    fn update_player(&self, player: &Player) -> DatabaseResult<()>;
    fn delete_player(&self, id: PlayerId) -> DatabaseResult<()>;
    fn get_players(
        &self,
        filter: &PlayerFilter,
        page: &PageRequest,
        order: PlayerOrder,
    ) -> DatabaseResult<Vec<Player>>;
    fn count_players(&self, filter: &PlayerFilter) -> DatabaseResult<usize>;
}

pub struct PlayerRepositoryImpl {
    pool: Pool<SqliteConnectionManager>,
}

impl PlayerRepositoryImpl {
    pub fn new() -> Self {
        let db_path = std::env::var("PLAYER_DB").expect("PLAYER_DB env var not set");
        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .expect("Failed to create DB pool");
        Self { pool }
    }

    /// Single pooled connection so every handle sees the same in-memory
    /// database.
    pub fn new_in_memory() -> Self {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create DB pool");
        pool.get()
            .expect("Failed to get DB connection")
            .execute_batch(PLAYERS_TABLE_SQL)
            .expect("Failed to create players table");
        Self { pool }
    }

    fn player_from_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
        Ok(Player {
            id: row.get("id")?,
            name: row.get("name")?,
            title: row.get("title")?,
            race: row.get("race")?,
            profession: row.get("profession")?,
            birthday: row.get("birthday")?,
            experience: row.get("experience")?,
            level: row.get("level")?,
            until_next_level: row.get("until_next_level")?,
            banned: row.get("banned")?,
        })
    }

    fn filter_clause<'a>(
        filter: &'a PlayerFilter,
        name_pattern: &'a Option<String>,
        title_pattern: &'a Option<String>,
    ) -> (String, Vec<&'a dyn ToSql>) {
        let mut conditions: Vec<&'static str> = Vec::new();
        let mut params: Vec<&'a dyn ToSql> = Vec::new();

        let pairs: Vec<(&'static str, Option<&'a dyn ToSql>)> = vec![
            ("name LIKE ?", to_sql_option(name_pattern)),
            ("title LIKE ?", to_sql_option(title_pattern)),
            ("race = ?", to_sql_option(&filter.race)),
            ("profession = ?", to_sql_option(&filter.profession)),
            ("birthday >= ?", to_sql_option(&filter.after)),
            ("birthday <= ?", to_sql_option(&filter.before)),
            ("banned = ?", to_sql_option(&filter.banned)),
            ("experience >= ?", to_sql_option(&filter.min_experience)),
            ("experience <= ?", to_sql_option(&filter.max_experience)),
            ("level >= ?", to_sql_option(&filter.min_level)),
            ("level <= ?", to_sql_option(&filter.max_level)),
        ];

        for (condition, value) in pairs {
            if let Some(v) = value {
                conditions.push(condition);
                params.push(v);
            }
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }

    fn like_pattern(value: &Option<String>) -> Option<String> {
        value.as_ref().map(|v| format!("%{}%", v))
    }
}

impl PlayerRepository for PlayerRepositoryImpl {
    fn get_player_by_id(&self, id: PlayerId) -> DatabaseResult<Option<Player>> {
        let conn = get_connection(&self.pool)?;
        let player = conn.query_row(
            "SELECT * FROM players WHERE id = ?1",
            [id],
            Self::player_from_row,
        );
        match player {
            Ok(player) => Ok(Some(player)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryError(e)),
        }
    }

    fn create_player(&self, player: &Player) -> DatabaseResult<PlayerId> {
        let conn = get_connection(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::QueryError(e))?;
        // id is auto-incremented
        tx.execute(
            "INSERT INTO players (name, title, race, profession, birthday, experience, level, until_next_level, banned) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                player.name,
                player.title,
                player.race,
                player.profession,
                player.birthday,
                player.experience,
                player.level,
                player.until_next_level,
                player.banned,
            ],
        )
        .map_err(|e| DatabaseError::QueryError(e))?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(|e| DatabaseError::QueryError(e))?;
        Ok(id)
    }

    fn update_player(&self, player: &Player) -> DatabaseResult<()> {
        let conn = get_connection(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::QueryError(e))?;
        tx.execute(
            "UPDATE players SET name = ?1, title = ?2, race = ?3, profession = ?4, birthday = ?5, experience = ?6, level = ?7, until_next_level = ?8, banned = ?9 WHERE id = ?10",
            rusqlite::params![
                player.name,
                player.title,
                player.race,
                player.profession,
                player.birthday,
                player.experience,
                player.level,
                player.until_next_level,
                player.banned,
                player.id,
            ],
        )
        .map_err(|e| DatabaseError::QueryError(e))?;
        tx.commit().map_err(|e| DatabaseError::QueryError(e))?;
        Ok(())
    }

    fn delete_player(&self, id: PlayerId) -> DatabaseResult<()> {
        let conn = get_connection(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::QueryError(e))?;
        tx.execute("DELETE FROM players WHERE id = ?1", [id])
            .map_err(|e| DatabaseError::QueryError(e))?;
        tx.commit().map_err(|e| DatabaseError::QueryError(e))?;
        Ok(())
    }

    fn get_players(
        &self,
        filter: &PlayerFilter,
        page: &PageRequest,
        order: PlayerOrder,
    ) -> DatabaseResult<Vec<Player>> {
        let name_pattern = Self::like_pattern(&filter.name);
        let title_pattern = Self::like_pattern(&filter.title);
        let (clause, params) = Self::filter_clause(filter, &name_pattern, &title_pattern);

        let query = format!(
            "SELECT * FROM players{} ORDER BY {} ASC LIMIT {} OFFSET {}",
            clause,
            order.field_name(),
            page.size,
            page.number as u64 * page.size as u64,
        );

        let conn = get_connection(&self.pool)?;
        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| DatabaseError::QueryError(e))?;
        let player_iter = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter()),
                Self::player_from_row,
            )
            .map_err(|e| DatabaseError::QueryError(e))?;

        let mut players = Vec::new();
        for player in player_iter {
            players.push(player.map_err(|e| DatabaseError::QueryError(e))?);
        }
        Ok(players)
    }

    fn count_players(&self, filter: &PlayerFilter) -> DatabaseResult<usize> {
        let name_pattern = Self::like_pattern(&filter.name);
        let title_pattern = Self::like_pattern(&filter.title);
        let (clause, params) = Self::filter_clause(filter, &name_pattern, &title_pattern);

        let query = format!("SELECT COUNT(*) FROM players{}", clause);

        let conn = get_connection(&self.pool)?;
        let count: i64 = conn
            .query_row(&query, rusqlite::params_from_iter(params.iter()), |row| {
                row.get(0)
            })
            .map_err(|e| DatabaseError::QueryError(e))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_player(name: &str, race: Race, experience: i32, banned: bool) -> Player {
        let level = crate::player::compute_level(experience);
        Player {
            id: 0,
            name: name.to_string(),
            title: None,
            race,
            profession: Profession::Warrior,
            birthday: 1_100_000_000_000,
            experience,
            level,
            until_next_level: crate::player::compute_until_next_level(level, experience),
            banned,
        }
    }

    fn seeded_repo() -> PlayerRepositoryImpl {
        let repo = PlayerRepositoryImpl::new_in_memory();
        repo.create_player(&seed_player("Aragorn", Race::Human, 0, false))
            .unwrap();
        repo.create_player(&seed_player("Gimli", Race::Dwarf, 5000, false))
            .unwrap();
        repo.create_player(&seed_player("Legolas", Race::Elf, 10000, false))
            .unwrap();
        repo.create_player(&seed_player("Grima", Race::Human, 100, true))
            .unwrap();
        repo
    }

    const FULL_PAGE: PageRequest = PageRequest {
        number: 0,
        size: 100,
    };

    #[test]
    fn test_create_assigns_increasing_ids() {
        let repo = seeded_repo();
        let id = repo
            .create_player(&seed_player("Boromir", Race::Human, 0, false))
            .unwrap();
        assert_eq!(id, 5);
        let fetched = repo.get_player_by_id(id).unwrap().unwrap();
        assert_eq!(fetched.name, "Boromir");
    }

    #[test]
    fn test_get_missing_returns_none() {
        let repo = seeded_repo();
        assert!(repo.get_player_by_id(999).unwrap().is_none());
    }

    #[test]
    fn test_update_persists_all_fields() {
        let repo = seeded_repo();
        let mut player = repo.get_player_by_id(1).unwrap().unwrap();
        player.title = Some("King".to_string());
        player.experience = 5000;
        player.recompute_progress();
        repo.update_player(&player).unwrap();

        let fetched = repo.get_player_by_id(1).unwrap().unwrap();
        assert_eq!(fetched.title.as_deref(), Some("King"));
        assert_eq!(fetched.level, 9);
        assert_eq!(fetched.until_next_level, 500);
    }

    #[test]
    fn test_delete_removes_row() {
        let repo = seeded_repo();
        repo.delete_player(2).unwrap();
        assert!(repo.get_player_by_id(2).unwrap().is_none());
        assert_eq!(repo.count_players(&PlayerFilter::default()).unwrap(), 3);
    }

    #[test]
    fn test_filter_clauses_are_conjoined() {
        let repo = seeded_repo();
        let filter = PlayerFilter {
            race: Some(Race::Human),
            banned: Some(false),
            ..Default::default()
        };
        let players = repo
            .get_players(&filter, &FULL_PAGE, PlayerOrder::Id)
            .unwrap();
        let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Aragorn"]);
    }

    #[test]
    fn test_name_filter_matches_substring() {
        let repo = seeded_repo();
        let filter = PlayerFilter {
            name: Some("gol".to_string()),
            ..Default::default()
        };
        let players = repo
            .get_players(&filter, &FULL_PAGE, PlayerOrder::Id)
            .unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Legolas");
    }

    #[test]
    fn test_experience_range_is_inclusive() {
        let repo = seeded_repo();
        let filter = PlayerFilter {
            min_experience: Some(100),
            max_experience: Some(5000),
            ..Default::default()
        };
        let players = repo
            .get_players(&filter, &FULL_PAGE, PlayerOrder::Experience)
            .unwrap();
        let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Grima", "Gimli"]);
    }

    #[test]
    fn test_pagination_and_order() {
        let repo = seeded_repo();
        let page = PageRequest { number: 1, size: 2 };
        let players = repo
            .get_players(&PlayerFilter::default(), &page, PlayerOrder::Name)
            .unwrap();
        // name order: Aragorn, Gimli, Grima, Legolas -> second page
        let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Grima", "Legolas"]);
    }

    #[test]
    fn test_count_matches_filter() {
        let repo = seeded_repo();
        let filter = PlayerFilter {
            banned: Some(true),
            ..Default::default()
        };
        assert_eq!(repo.count_players(&filter).unwrap(), 1);
        assert_eq!(repo.count_players(&PlayerFilter::default()).unwrap(), 4);
    }

    #[test]
    fn test_order_field_round_trip() {
        for order in PlayerOrder::ALL {
            assert_eq!(PlayerOrder::from_field_name(order.field_name()), Some(order));
        }
        assert_eq!(PlayerOrder::from_field_name("password"), None);
    }
}
