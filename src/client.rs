//! Public facade (spec §6): `Client.getProfile(id).getUseCase(name).perform(input, options)`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::{Driver, PerformOptions};
use crate::error::{MapRuntimeError, Result, UnexpectedError};
use crate::value::Variable;

/// The runtime, holding one [`Driver`] per configured profile (spec §6
/// "Public entry point").
pub struct Client {
    drivers: HashMap<String, Arc<Driver>>,
}

impl Client {
    pub fn new(drivers: HashMap<String, Arc<Driver>>) -> Self {
        Self { drivers }
    }

    pub fn get_profile(&self, id: &str) -> Result<Profile> {
        let driver = self
            .drivers
            .get(id)
            .ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::Config(format!("unknown profile {id}"))))?
            .clone();
        Ok(Profile { driver })
    }
}

/// A bound profile, ready to address one of its use-cases.
pub struct Profile {
    driver: Arc<Driver>,
}

impl Profile {
    pub fn get_usecase(&self, name: &str) -> UseCase {
        UseCase {
            driver: self.driver.clone(),
            name: name.to_string(),
        }
    }
}

/// A single use-case, callable with fresh input each time.
pub struct UseCase {
    driver: Arc<Driver>,
    name: String,
}

impl UseCase {
    pub async fn perform(&self, input: Variable, options: PerformOptions) -> Result<Variable> {
        self.driver.perform(&self.name, input, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_profile_id_is_a_config_error() {
        let client = Client::new(HashMap::new());
        let result = client.get_profile("weather");
        assert!(matches!(
            result,
            Err(MapRuntimeError::Unexpected(UnexpectedError::Config(_)))
        ));
    }
}
