use std::collections::HashMap;

use serde_json::Value;

use super::error::{Error, TypeError};

pub type FormData = HashMap<String, Value>;

/// Loosely typed request body. Values may arrive as JSON numbers or as
/// strings from html forms, so the numeric getters accept both.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, Error>
    where
        T: TryFrom<Value>,
    {
        match self.inner.get(key) {
            Some(value) => value
                .to_owned()
                .try_into()
                .map_err(|_e| TypeError::new("Invalid type conversion").into()),
            None => Err(TypeError::new(&format!("Missing field: {key}")).into()),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64, Error> {
        match self.inner.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.).map(|f| f as i64))
                .ok_or_else(|| TypeError::new(&format!("{key} must be an integer")).into()),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_e| TypeError::new(&format!("{key} must be an integer")).into()),
            Some(_) => Err(TypeError::new(&format!("{key} must be an integer")).into()),
            None => Err(TypeError::new(&format!("Missing field: {key}")).into()),
        }
    }

    pub fn get_optional_int(&self, key: &str) -> Result<Option<i64>, Error> {
        match self.contains(key) {
            true => self.get_int(key).map(Some),
            false => Ok(None),
        }
    }

    pub fn get_number(&self, key: &str) -> Result<f64, Error> {
        match self.inner.get(key) {
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| TypeError::new(&format!("{key} must be a number")).into()),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_e| TypeError::new(&format!("{key} must be a number")).into()),
            Some(_) => Err(TypeError::new(&format!("{key} must be a number")).into()),
            None => Err(TypeError::new(&format!("Missing field: {key}")).into()),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, Error> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new(&format!("{key} must be a string")).into()),
            },
            None => Err(TypeError::new(&format!("Missing field: {key}")).into()),
        }
    }

    pub fn get_optional_str(&self, key: &str) -> Result<Option<String>, Error> {
        match self.contains(key) {
            true => self.get_str(key).map(Some),
            false => Ok(None),
        }
    }

    /// Either a JSON array of strings or a single newline separated string.
    pub fn get_str_list(&self, key: &str) -> Result<Vec<String>, Error> {
        match self.inner.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(|s| s.to_string())
                        .ok_or_else(|| Error::from(TypeError::new(&format!("{key} must hold strings"))))
                })
                .collect(),
            Some(Value::String(s)) => Ok(s
                .lines()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(|l| l.to_string())
                .collect()),
            Some(Value::Null) | None => Ok(vec![]),
            Some(_) => Err(TypeError::new(&format!("{key} must be a list")).into()),
        }
    }

    pub fn get_id_list(&self, key: &str) -> Result<Vec<i32>, Error> {
        match self.inner.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| match v {
                    Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .map(|id| id.ok_or_else(|| Error::from(TypeError::new("Invalid recipe IDs"))))
                .collect(),
            Some(Value::Null) | None => Ok(vec![]),
            Some(_) => Err(TypeError::new("Invalid recipe IDs").into()),
        }
    }

    /// Sub-object access, e.g. `nutritionalInfo`.
    pub fn get_form(&self, key: &str) -> Option<Form> {
        match self.inner.get(key) {
            Some(Value::Object(map)) => Some(Form {
                inner: map.clone().into_iter().collect(),
            }),
            _ => None,
        }
    }
}
