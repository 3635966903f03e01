use std::collections::HashMap;
use std::str::FromStr;

use chrono::{TimeZone, Utc};

use crate::{
    ServiceError, ServiceResult,
    persistence::players::{PageRequest, PlayerFilter, PlayerOrder},
    player::{EXPERIENCE_MAX, Player, PlayerId, Profession, Race},
};

pub const NAME_MAX_LEN: usize = 12;

pub const TITLE_MAX_LEN: usize = 30;

fn birthday_min_millis() -> i64 {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp")
        .timestamp_millis()
}

fn birthday_max_millis() -> i64 {
    Utc.with_ymd_and_hms(3001, 1, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp")
        .timestamp_millis()
}

/// The typed, partially-filled result of validating a create/update body.
/// Absent keys stay `None`; no raw string survives past this point.
#[derive(Debug, Default, Clone)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub race: Option<Race>,
    pub profession: Option<Profession>,
    pub birthday: Option<i64>,
    pub experience: Option<i32>,
    pub banned: Option<bool>,
}

impl PlayerPatch {
    pub fn apply(&self, player: &mut Player) {
        if let Some(name) = &self.name {
            player.name = name.clone();
        }
        if let Some(title) = &self.title {
            player.title = Some(title.clone());
        }
        if let Some(race) = self.race {
            player.race = race;
        }
        if let Some(profession) = self.profession {
            player.profession = profession;
        }
        if let Some(birthday) = self.birthday {
            player.birthday = birthday;
        }
        if let Some(experience) = self.experience {
            player.experience = experience;
        }
        if let Some(banned) = self.banned {
            player.banned = banned;
        }
    }
}

#[derive(Debug)]
pub struct PlayerListQuery {
    pub filter: PlayerFilter,
    pub page: PageRequest,
    pub order: PlayerOrder,
}

pub fn validate_param_id(raw: &str) -> ServiceResult<PlayerId> {
    match raw.parse::<PlayerId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => ServiceError::invalid_param(format!("Invalid player id: {}", raw)),
    }
}

pub fn parse_patch(params: &HashMap<String, String>) -> ServiceResult<PlayerPatch> {
    let mut patch = PlayerPatch::default();

    if let Some(name) = params.get("name") {
        if name.is_empty() || name.chars().count() > NAME_MAX_LEN {
            return ServiceError::invalid_param(format!("Invalid name: {:?}", name));
        }
        patch.name = Some(name.clone());
    }

    // an empty title means "no change", not an error
    if let Some(title) = params.get("title")
        && !title.is_empty()
    {
        if title.chars().count() > TITLE_MAX_LEN {
            return ServiceError::invalid_param(format!("Invalid title: {:?}", title));
        }
        patch.title = Some(title.clone());
    }

    if let Some(race) = params.get("race") {
        patch.race = Some(
            Race::from_literal(race)
                .ok_or_else(|| ServiceError::InvalidParam(format!("Unknown race: {}", race)))?,
        );
    }

    if let Some(profession) = params.get("profession") {
        patch.profession = Some(Profession::from_literal(profession).ok_or_else(|| {
            ServiceError::InvalidParam(format!("Unknown profession: {}", profession))
        })?);
    }

    if let Some(birthday) = params.get("birthday") {
        let millis: i64 = birthday.parse().map_err(|_| {
            ServiceError::InvalidParam(format!("Invalid birthday: {}", birthday))
        })?;
        if millis < birthday_min_millis() || millis > birthday_max_millis() {
            return ServiceError::invalid_param(format!("Birthday out of range: {}", millis));
        }
        patch.birthday = Some(millis);
    }

    if let Some(experience) = params.get("experience") {
        let experience: i32 = experience.parse().map_err(|_| {
            ServiceError::InvalidParam(format!("Invalid experience: {}", experience))
        })?;
        if !(0..=EXPERIENCE_MAX).contains(&experience) {
            return ServiceError::invalid_param(format!(
                "Experience out of range: {}",
                experience
            ));
        }
        patch.experience = Some(experience);
    }

    patch.banned = parse_param_banned(params)?;

    Ok(patch)
}

/// Strict boolean: only the literals "true" and "false" are accepted.
pub fn parse_param_banned(params: &HashMap<String, String>) -> ServiceResult<Option<bool>> {
    match params.get("banned").map(|s| s.as_str()) {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => ServiceError::invalid_param(format!("Invalid banned flag: {}", other)),
    }
}

pub fn parse_list_query(params: &HashMap<String, String>) -> ServiceResult<PlayerListQuery> {
    let page_number = parse_opt_int::<u32>(params, "pageNumber")?.unwrap_or(0);
    let page_size = parse_opt_int::<u32>(params, "pageSize")?.unwrap_or(3);

    let order = match params.get("order") {
        None => PlayerOrder::Id,
        Some(raw) => PlayerOrder::from_field_name(raw)
            .ok_or_else(|| ServiceError::InvalidParam(format!("Unknown order field: {}", raw)))?,
    };

    let race = match params.get("race") {
        None => None,
        Some(raw) => Some(
            Race::from_literal(raw)
                .ok_or_else(|| ServiceError::InvalidParam(format!("Unknown race: {}", raw)))?,
        ),
    };
    let profession = match params.get("profession") {
        None => None,
        Some(raw) => Some(Profession::from_literal(raw).ok_or_else(|| {
            ServiceError::InvalidParam(format!("Unknown profession: {}", raw))
        })?),
    };

    let filter = PlayerFilter {
        name: params.get("name").cloned().filter(|s| !s.is_empty()),
        title: params.get("title").cloned().filter(|s| !s.is_empty()),
        race,
        profession,
        after: parse_opt_int::<i64>(params, "after")?,
        before: parse_opt_int::<i64>(params, "before")?,
        banned: parse_param_banned(params)?,
        min_experience: parse_opt_int::<i32>(params, "minExperience")?,
        max_experience: parse_opt_int::<i32>(params, "maxExperience")?,
        min_level: parse_opt_int::<i32>(params, "minLevel")?,
        max_level: parse_opt_int::<i32>(params, "maxLevel")?,
    };

    Ok(PlayerListQuery {
        filter,
        page: PageRequest {
            number: page_number,
            size: page_size,
        },
        order,
    })
}

fn parse_opt_int<T: FromStr>(
    params: &HashMap<String, String>,
    key: &str,
) -> ServiceResult<Option<T>> {
    match params.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ServiceError::InvalidParam(format!("Invalid {}: {}", key, raw))),
    }
}
