//! # Configuración de un Bot
//! src/scenario/config.rs
//!
//! Parámetros de una corrida tal como llegan en el body JSON de `/start`,
//! y el validador que los deja listos para construir un Job.
//!
//! ## Política de validación
//!
//! - Campos obligatorios ausentes (endpoints, tokens, org, origin levels):
//!   se rechaza la petición.
//! - Campos numéricos fuera de rango: se reemplazan por su valor por
//!   defecto y se registra un warning.

use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const MINIMUM_TIME_TO_LIVE: i64 = 1;
pub const MAXIMUM_TIME_TO_LIVE: i64 = 1000;
pub const DEFAULT_TIME_TO_LIVE: i64 = 2;

pub const MINIMUM_WORDS_PER_QUERY: i64 = 1;
pub const MAXIMUM_WORDS_PER_QUERY: i64 = 20;
pub const DEFAULT_WORDS_PER_QUERY: i64 = 2;

pub const MINIMUM_EXPLORATION_PERCENT: f64 = 0.001;
pub const MAXIMUM_EXPLORATION_PERCENT: f64 = 1.0;
pub const DEFAULT_EXPLORATION_PERCENT: f64 = 0.01;

pub const MINIMUM_QUERIES_PER_LANGUAGE: i64 = 1;
pub const MAXIMUM_QUERIES_PER_LANGUAGE: i64 = 500;
pub const DEFAULT_QUERIES_PER_LANGUAGE: i64 = 100;

pub const MINIMUM_FETCH_RESULTS: i64 = 1;
pub const MAXIMUM_FETCH_RESULTS: i64 = 1000;
pub const DEFAULT_FETCH_RESULTS: i64 = 100;

pub const DEFAULT_FIELD_TO_EXPLORE: &str = "@syssource";

/// Parámetros de una corrida de bot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotConfig {
    /// Origin level 1 → lista de origin level 2
    pub origin_levels: Option<BTreeMap<String, Vec<String>>>,
    pub search_endpoint: String,
    pub search_token: String,
    pub analytics_endpoint: String,
    pub analytics_token: String,
    pub org: String,
    /// Minutos antes de que el Expiry Timer cancele la corrida
    pub time_to_live: i64,
    pub average_number_of_words_per_query: i64,
    pub documents_exploration_percentage: f64,
    pub number_of_query_by_language: i64,
    pub fetch_number_of_results: i64,
    pub fields_to_explore_equally: Vec<String>,
    pub output_file_path: String,
}

impl BotConfig {
    /// Parsea un body JSON
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| DispatchError::InvalidConfig(format!("Malformed JSON body: {}", e)))
    }

    /// Valida la configuración y completa los valores por defecto
    ///
    /// `id` es el identificador asignado al job; se usa para el nombre
    /// por defecto del archivo de salida.
    pub fn validate(&mut self, id: Uuid) -> Result<()> {
        match &self.origin_levels {
            None => return Err(invalid("Origin Level 1 Missing")),
            Some(levels) => {
                if levels.is_empty() {
                    return Err(invalid("Origin Level 1 Missing"));
                }
                if let Some((level1, _)) = levels.iter().find(|(_, level2)| level2.is_empty()) {
                    return Err(invalid(&format!(
                        "Origin Level 2 Missing for originLevel1: {}",
                        level1
                    )));
                }
            }
        }

        require(&self.search_endpoint, "searchEndpoint Missing")?;
        require(&self.search_token, "searchToken Missing")?;
        require(&self.analytics_endpoint, "analyticsEndpoint Missing")?;
        require(&self.analytics_token, "analyticsToken Missing")?;

        self.time_to_live = clamp_or_default(
            "timeToLive",
            self.time_to_live,
            MINIMUM_TIME_TO_LIVE,
            MAXIMUM_TIME_TO_LIVE,
            DEFAULT_TIME_TO_LIVE,
        );
        self.average_number_of_words_per_query = clamp_or_default(
            "averageNumberOfWordsPerQuery",
            self.average_number_of_words_per_query,
            MINIMUM_WORDS_PER_QUERY,
            MAXIMUM_WORDS_PER_QUERY,
            DEFAULT_WORDS_PER_QUERY,
        );

        let pct = self.documents_exploration_percentage;
        if !(MINIMUM_EXPLORATION_PERCENT..=MAXIMUM_EXPLORATION_PERCENT).contains(&pct) {
            tracing::warn!(
                value = pct,
                default = DEFAULT_EXPLORATION_PERCENT,
                "documentsExplorationPercentage is out of bounds, using default"
            );
            self.documents_exploration_percentage = DEFAULT_EXPLORATION_PERCENT;
        }

        self.number_of_query_by_language = clamp_or_default(
            "numberOfQueryByLanguage",
            self.number_of_query_by_language,
            MINIMUM_QUERIES_PER_LANGUAGE,
            MAXIMUM_QUERIES_PER_LANGUAGE,
            DEFAULT_QUERIES_PER_LANGUAGE,
        );
        self.fetch_number_of_results = clamp_or_default(
            "fetchNumberOfResults",
            self.fetch_number_of_results,
            MINIMUM_FETCH_RESULTS,
            MAXIMUM_FETCH_RESULTS,
            DEFAULT_FETCH_RESULTS,
        );

        if self.fields_to_explore_equally.is_empty() {
            tracing::warn!(
                default = DEFAULT_FIELD_TO_EXPLORE,
                "fieldsToExploreEqually is empty, using default"
            );
            self.fields_to_explore_equally = vec![DEFAULT_FIELD_TO_EXPLORE.to_string()];
        }

        if self.output_file_path.is_empty() {
            self.output_file_path = format!("{}.json", id);
            tracing::warn!(path = %self.output_file_path, "outputFilePath undefined, using default");
        }

        require(&self.org, "Org Missing")?;

        Ok(())
    }

    /// Minutos de vida ya validados
    pub fn ttl_minutes(&self) -> u32 {
        u32::try_from(self.time_to_live)
            .ok()
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_TIME_TO_LIVE as u32)
    }

    /// Origin levels como lista plana de pares (level1, level2)
    pub fn origin_pairs(&self) -> Vec<(&str, &str)> {
        self.origin_levels
            .iter()
            .flatten()
            .flat_map(|(level1, level2s)| {
                level2s.iter().map(move |level2| (level1.as_str(), level2.as_str()))
            })
            .collect()
    }
}

fn invalid(message: &str) -> DispatchError {
    DispatchError::InvalidConfig(message.to_string())
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(message));
    }
    Ok(())
}

fn clamp_or_default(field: &str, value: i64, min: i64, max: i64, default: i64) -> i64 {
    if (min..=max).contains(&value) {
        return value;
    }
    tracing::warn!(field, value, min, max, default, "Parameter is out of bounds, using default");
    default
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;

    /// Configuración mínima que pasa la validación
    pub(crate) fn valid_config() -> BotConfig {
        let mut levels = BTreeMap::new();
        levels.insert("BotSearch".to_string(), vec!["default".to_string()]);

        BotConfig {
            origin_levels: Some(levels),
            search_endpoint: "https://search.example.com/rest/search".to_string(),
            search_token: "search-token".to_string(),
            analytics_endpoint: "https://analytics.example.com/rest/v15".to_string(),
            analytics_token: "analytics-token".to_string(),
            org: "example-org".to_string(),
            time_to_live: 5,
            average_number_of_words_per_query: 3,
            documents_exploration_percentage: 0.5,
            number_of_query_by_language: 10,
            fetch_number_of_results: 20,
            fields_to_explore_equally: vec!["@source".to_string()],
            output_file_path: "out.json".to_string(),
        }
    }

    #[test]
    fn test_valid_config_passes_unchanged() {
        let mut config = valid_config();
        let expected = config.clone();

        assert!(config.validate(Uuid::new_v4()).is_ok());
        assert_eq!(config, expected);
    }

    #[test]
    fn test_missing_origin_levels_rejected() {
        let mut config = valid_config();
        config.origin_levels = None;

        let err = config.validate(Uuid::new_v4()).unwrap_err();
        assert_matches!(err, DispatchError::InvalidConfig(msg) if msg.contains("Origin Level 1"));
    }

    #[test]
    fn test_empty_level2_rejected() {
        let mut config = valid_config();
        config
            .origin_levels
            .as_mut()
            .unwrap()
            .insert("Empty".to_string(), Vec::new());

        let err = config.validate(Uuid::new_v4()).unwrap_err();
        assert_matches!(err, DispatchError::InvalidConfig(msg) if msg.contains("Empty"));
    }

    #[test]
    fn test_missing_tokens_rejected() {
        let mut config = valid_config();
        config.search_token.clear();
        assert_matches!(
            config.validate(Uuid::new_v4()),
            Err(DispatchError::InvalidConfig(msg)) if msg == "searchToken Missing"
        );

        let mut config = valid_config();
        config.analytics_endpoint = "   ".to_string();
        assert_matches!(
            config.validate(Uuid::new_v4()),
            Err(DispatchError::InvalidConfig(msg)) if msg == "analyticsEndpoint Missing"
        );
    }

    #[test]
    fn test_missing_org_rejected() {
        let mut config = valid_config();
        config.org.clear();
        assert_matches!(
            config.validate(Uuid::new_v4()),
            Err(DispatchError::InvalidConfig(msg)) if msg == "Org Missing"
        );
    }

    #[test]
    fn test_out_of_range_numbers_use_defaults() {
        let mut config = valid_config();
        config.time_to_live = 0;
        config.average_number_of_words_per_query = 99;
        config.documents_exploration_percentage = 2.0;
        config.number_of_query_by_language = -4;
        config.fetch_number_of_results = 5000;

        config.validate(Uuid::new_v4()).unwrap();

        assert_eq!(config.time_to_live, DEFAULT_TIME_TO_LIVE);
        assert_eq!(config.average_number_of_words_per_query, DEFAULT_WORDS_PER_QUERY);
        assert_eq!(config.documents_exploration_percentage, DEFAULT_EXPLORATION_PERCENT);
        assert_eq!(config.number_of_query_by_language, DEFAULT_QUERIES_PER_LANGUAGE);
        assert_eq!(config.fetch_number_of_results, DEFAULT_FETCH_RESULTS);
    }

    #[test]
    fn test_defaults_for_fields_and_output_path() {
        let id = Uuid::new_v4();
        let mut config = valid_config();
        config.fields_to_explore_equally.clear();
        config.output_file_path.clear();

        config.validate(id).unwrap();

        assert_eq!(config.fields_to_explore_equally, vec!["@syssource".to_string()]);
        assert_eq!(config.output_file_path, format!("{}.json", id));
    }

    #[test]
    fn test_from_json_camel_case() {
        let body = br#"{
            "originLevels": {"BotSearch": ["default", "other"]},
            "searchEndpoint": "s",
            "searchToken": "t",
            "analyticsEndpoint": "a",
            "analyticsToken": "u",
            "org": "o",
            "timeToLive": 3
        }"#;

        let config = BotConfig::from_json(body).unwrap();
        assert_eq!(config.time_to_live, 3);
        assert_eq!(config.origin_pairs(), vec![("BotSearch", "default"), ("BotSearch", "other")]);
    }

    #[test]
    fn test_from_json_malformed() {
        assert_matches!(
            BotConfig::from_json(b"{not json"),
            Err(DispatchError::InvalidConfig(msg)) if msg.contains("Malformed")
        );
    }

    #[test]
    fn test_ttl_minutes_fallback() {
        let mut config = valid_config();
        assert_eq!(config.ttl_minutes(), 5);
        config.time_to_live = -1;
        assert_eq!(config.ttl_minutes(), DEFAULT_TIME_TO_LIVE as u32);
    }
}
