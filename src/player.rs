use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    ArcPlayerRepository, ServiceError, ServiceResult,
    params::{parse_list_query, parse_patch, validate_param_id},
};

pub type PlayerId = i64;

pub const EXPERIENCE_MAX: i32 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Race {
    Human,
    Dwarf,
    Elf,
    Giant,
    Orc,
    Troll,
    Hobbit,
}

impl Race {
    pub const ALL: [Race; 7] = [
        Race::Human,
        Race::Dwarf,
        Race::Elf,
        Race::Giant,
        Race::Orc,
        Race::Troll,
        Race::Hobbit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Race::Human => "HUMAN",
            Race::Dwarf => "DWARF",
            Race::Elf => "ELF",
            Race::Giant => "GIANT",
            Race::Orc => "ORC",
            Race::Troll => "TROLL",
            Race::Hobbit => "HOBBIT",
        }
    }

    /// Case-sensitive, exact literal match.
    pub fn from_literal(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Profession {
    Warrior,
    Rogue,
    Sorcerer,
    Cleric,
    Paladin,
    Nazgul,
    Warlock,
    Druid,
}

impl Profession {
    pub const ALL: [Profession; 8] = [
        Profession::Warrior,
        Profession::Rogue,
        Profession::Sorcerer,
        Profession::Cleric,
        Profession::Paladin,
        Profession::Nazgul,
        Profession::Warlock,
        Profession::Druid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profession::Warrior => "WARRIOR",
            Profession::Rogue => "ROGUE",
            Profession::Sorcerer => "SORCERER",
            Profession::Cleric => "CLERIC",
            Profession::Paladin => "PALADIN",
            Profession::Nazgul => "NAZGUL",
            Profession::Warlock => "WARLOCK",
            Profession::Druid => "DRUID",
        }
    }

    /// Case-sensitive, exact literal match.
    pub fn from_literal(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }
}

/// A directory record. `birthday` is epoch millis; `level` and
/// `until_next_level` are derived from `experience` and recomputed before
/// every persist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub title: Option<String>,
    pub race: Race,
    pub profession: Profession,
    pub birthday: i64,
    pub experience: i32,
    pub level: i32,
    pub until_next_level: i32,
    pub banned: bool,
}

pub fn compute_level(experience: i32) -> i32 {
    (((2500.0 + 200.0 * experience as f64).sqrt() - 50.0) / 100.0) as i32
}

pub fn compute_until_next_level(level: i32, experience: i32) -> i32 {
    50 * (level + 1) * (level + 2) - experience
}

impl Player {
    pub fn recompute_progress(&mut self) {
        self.level = compute_level(self.experience);
        self.until_next_level = compute_until_next_level(self.level, self.experience);
    }
}

pub trait PlayerService {
    fn find_all_players(&self, params: &HashMap<String, String>) -> ServiceResult<Vec<Player>>;
    fn find_players_count(&self, params: &HashMap<String, String>) -> ServiceResult<usize>;
    fn get_player(&self, id: &str) -> ServiceResult<Player>;
    fn create_player(&self, params: &HashMap<String, String>) -> ServiceResult<Player>;
    fn update_player(&self, id: &str, params: &HashMap<String, String>) -> ServiceResult<Player>;
    fn delete_player(&self, id: &str) -> ServiceResult<()>;
}

pub struct PlayerServiceImpl {
    player_repository: ArcPlayerRepository,
}

impl PlayerServiceImpl {
    pub fn new(player_repository: ArcPlayerRepository) -> Self {
        Self { player_repository }
    }
}

impl PlayerService for PlayerServiceImpl {
    fn find_all_players(&self, params: &HashMap<String, String>) -> ServiceResult<Vec<Player>> {
        let query = parse_list_query(params)?;
        let players = self
            .player_repository
            .get_players(&query.filter, &query.page, query.order)?;
        Ok(players)
    }

    fn find_players_count(&self, params: &HashMap<String, String>) -> ServiceResult<usize> {
        let query = parse_list_query(params)?;
        Ok(self.player_repository.count_players(&query.filter)?)
    }

    fn get_player(&self, id: &str) -> ServiceResult<Player> {
        let id = validate_param_id(id)?;
        match self.player_repository.get_player_by_id(id)? {
            Some(player) => Ok(player),
            None => ServiceError::not_found(format!("No player with id {}", id)),
        }
    }

    fn create_player(&self, params: &HashMap<String, String>) -> ServiceResult<Player> {
        if params.is_empty() {
            return ServiceError::invalid_param("Empty create payload");
        }
        let patch = parse_patch(params)?;
        let (Some(name), Some(race), Some(profession), Some(birthday)) =
            (patch.name, patch.race, patch.profession, patch.birthday)
        else {
            return ServiceError::invalid_param(
                "name, race, profession and birthday are required to create a player",
            );
        };
        let mut player = Player {
            id: 0, // assigned by storage
            name,
            title: patch.title,
            race,
            profession,
            birthday,
            experience: patch.experience.unwrap_or(0),
            level: 0,
            until_next_level: 0,
            banned: patch.banned.unwrap_or(false),
        };
        player.recompute_progress();
        player.id = self.player_repository.create_player(&player)?;
        info!("Created player {} with id {}", player.name, player.id);
        Ok(player)
    }

    fn update_player(&self, id: &str, params: &HashMap<String, String>) -> ServiceResult<Player> {
        let mut player = self.get_player(id)?;
        let patch = parse_patch(params)?;
        patch.apply(&mut player);
        // experience may or may not have changed; the formula is cheap
        player.recompute_progress();
        self.player_repository.update_player(&player)?;
        info!("Updated player {}", player.id);
        Ok(player)
    }

    fn delete_player(&self, id: &str) -> ServiceResult<()> {
        let player = self.get_player(id)?;
        self.player_repository.delete_player(player.id)?;
        info!("Deleted player {}", player.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::persistence::players::PlayerRepositoryImpl;

    use super::*;

    fn test_service() -> PlayerServiceImpl {
        let repo: ArcPlayerRepository = Arc::new(Box::new(PlayerRepositoryImpl::new_in_memory()));
        PlayerServiceImpl::new(repo)
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn create_params(name: &str, experience: i32) -> HashMap<String, String> {
        params(&[
            ("name", name),
            ("race", "HOBBIT"),
            ("profession", "ROGUE"),
            ("birthday", "1100000000000"),
            ("experience", &experience.to_string()),
        ])
    }

    #[test]
    fn test_level_formula() {
        assert_eq!(compute_level(0), 0);
        assert_eq!(compute_until_next_level(0, 0), 100);

        assert_eq!(compute_level(5000), 9);
        assert_eq!(compute_until_next_level(9, 5000), 500);

        // boundary: level 1 starts exactly at 100 experience
        assert_eq!(compute_level(99), 0);
        assert_eq!(compute_level(100), 1);
    }

    #[test]
    fn test_level_non_negative_and_monotonic() {
        let mut prev = 0;
        let mut e = 0;
        while e <= EXPERIENCE_MAX {
            let level = compute_level(e);
            assert!(level >= 0, "negative level for experience {}", e);
            assert!(level >= prev, "level decreased at experience {}", e);
            prev = level;
            e += 997;
        }
        assert!(compute_level(EXPERIENCE_MAX) >= prev);
    }

    #[test]
    fn test_create_computes_derived_fields() {
        let service = test_service();
        let player = service.create_player(&create_params("Frodo", 5000)).unwrap();
        assert!(player.id > 0);
        assert_eq!(player.level, 9);
        assert_eq!(player.until_next_level, 500);
        assert_eq!(player.race, Race::Hobbit);
        assert!(!player.banned);
    }

    #[test]
    fn test_create_with_zero_experience() {
        let service = test_service();
        let mut p = create_params("Sam", 0);
        p.remove("experience");
        let player = service.create_player(&p).unwrap();
        assert_eq!(player.experience, 0);
        assert_eq!(player.level, 0);
        assert_eq!(player.until_next_level, 100);
    }

    #[test]
    fn test_create_empty_params_fails() {
        let service = test_service();
        let err = service.create_player(&HashMap::new()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParam(_)));
    }

    #[test]
    fn test_create_name_length_bounds() {
        let service = test_service();
        let err = service
            .create_player(&create_params("Thirteenchars", 0))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParam(_)));

        let player = service.create_player(&create_params("Twelve_chars", 0)).unwrap();
        assert_eq!(player.name, "Twelve_chars");
    }

    #[test]
    fn test_create_missing_race_fails() {
        let service = test_service();
        let mut p = create_params("Frodo", 0);
        p.remove("race");
        let err = service.create_player(&p).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParam(_)));
    }

    #[test]
    fn test_get_rejects_malformed_ids() {
        let service = test_service();
        for bad in ["-1", "0", "abc", ""] {
            let err = service.get_player(bad).unwrap_err();
            assert!(matches!(err, ServiceError::InvalidParam(_)), "id {:?}", bad);
        }
        let err = service.get_player("999999").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_update_is_partial_patch() {
        let service = test_service();
        let created = service.create_player(&create_params("Frodo", 5000)).unwrap();

        let updated = service
            .update_player(&created.id.to_string(), &params(&[("experience", "100")]))
            .unwrap();

        assert_eq!(updated.name, "Frodo");
        assert_eq!(updated.race, Race::Hobbit);
        assert_eq!(updated.profession, Profession::Rogue);
        assert_eq!(updated.birthday, created.birthday);
        assert_eq!(updated.experience, 100);
        assert_eq!(updated.level, 1);
        assert_eq!(updated.until_next_level, 200);

        let fetched = service.get_player(&created.id.to_string()).unwrap();
        assert_eq!(fetched.experience, 100);
        assert_eq!(fetched.level, 1);
    }

    #[test]
    fn test_update_rejects_malformed_banned() {
        let service = test_service();
        let created = service.create_player(&create_params("Frodo", 0)).unwrap();
        let err = service
            .update_player(&created.id.to_string(), &params(&[("banned", "yes")]))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParam(_)));

        let updated = service
            .update_player(&created.id.to_string(), &params(&[("banned", "true")]))
            .unwrap();
        assert!(updated.banned);
    }

    #[test]
    fn test_update_missing_player_fails() {
        let service = test_service();
        let err = service
            .update_player("42", &params(&[("experience", "100")]))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_delete_then_get_fails() {
        let service = test_service();
        let created = service.create_player(&create_params("Frodo", 0)).unwrap();
        let id = created.id.to_string();
        service.delete_player(&id).unwrap();
        let err = service.get_player(&id).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = service.delete_player(&id).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_list_defaults_to_three_by_id() {
        let service = test_service();
        for name in ["Frodo", "Sam", "Merry", "Pippin", "Bilbo"] {
            service.create_player(&create_params(name, 0)).unwrap();
        }
        let players = service.find_all_players(&HashMap::new()).unwrap();
        assert_eq!(players.len(), 3);
        assert!(players.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(players[0].name, "Frodo");
    }

    #[test]
    fn test_list_filters_by_level_range() {
        let service = test_service();
        // experiences 0, 100, 5000, 10000 give levels 0, 1, 9, 13
        for (name, exp) in [("Frodo", 0), ("Sam", 100), ("Merry", 5000), ("Pippin", 10000)] {
            service.create_player(&create_params(name, exp)).unwrap();
        }
        let players = service
            .find_all_players(&params(&[("minLevel", "1"), ("maxLevel", "9")]))
            .unwrap();
        let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Sam", "Merry"]);
    }

    #[test]
    fn test_count_ignores_pagination() {
        let service = test_service();
        for name in ["Frodo", "Sam", "Merry", "Pippin", "Bilbo"] {
            service.create_player(&create_params(name, 0)).unwrap();
        }
        let count = service
            .find_players_count(&params(&[("pageSize", "1")]))
            .unwrap();
        assert_eq!(count, 5);
    }
}
