/*
 * Responsibility
 * - Actors の request/response DTO
 * - validation (形式チェック) は validate() に持たせる
 */
use serde::{Deserialize, Serialize};

use crate::repos::actor_repo::ActorRow;

const NAME_MAX: usize = 120;
const GENDER_MAX: usize = 40;

#[derive(Debug, Deserialize)]
pub struct CreateActorRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NewActor {
    pub name: String,
    pub age: i32,
    pub gender: String,
}

impl CreateActorRequest {
    pub fn validate(&self) -> Result<NewActor, &'static str> {
        let name = check_name(self.name.as_deref().ok_or("name is required")?)?;
        let age = check_age(self.age.ok_or("age is required")?)?;
        let gender = check_gender(self.gender.as_deref().ok_or("gender is required")?)?;

        Ok(NewActor { name, age, gender })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateActorRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ActorChanges {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

impl UpdateActorRequest {
    pub fn validate(&self) -> Result<ActorChanges, &'static str> {
        if self.name.is_none() && self.age.is_none() && self.gender.is_none() {
            return Err("nothing to update");
        }

        Ok(ActorChanges {
            name: self.name.as_deref().map(check_name).transpose()?,
            age: self.age.map(check_age).transpose()?,
            gender: self.gender.as_deref().map(check_gender).transpose()?,
        })
    }
}

fn check_name(name: &str) -> Result<String, &'static str> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name cannot be empty");
    }
    if name.chars().count() > NAME_MAX {
        return Err("name must be <= 120 chars");
    }
    Ok(name.to_string())
}

fn check_age(age: i32) -> Result<i32, &'static str> {
    if age <= 0 {
        return Err("age must be positive");
    }
    Ok(age)
}

fn check_gender(gender: &str) -> Result<String, &'static str> {
    let gender = gender.trim();
    if gender.is_empty() {
        return Err("gender cannot be empty");
    }
    if gender.chars().count() > GENDER_MAX {
        return Err("gender must be <= 40 chars");
    }
    Ok(gender.to_string())
}

#[derive(Debug, Serialize)]
pub struct ActorResponse {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub gender: String,
}

impl From<ActorRow> for ActorResponse {
    fn from(row: ActorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            age: row.age,
            gender: row.gender,
        }
    }
}
