//! # Runner de Visitas Simuladas
//! src/scenario/simulated.rs
//!
//! Runner por defecto del binario. No habla con ningún backend: en cada
//! tick arma una query con el vocabulario de la configuración, decide si
//! la visita termina en click y la cuenta. Se detiene en el primer punto
//! de chequeo después de que la señal de cancelación se dispare.

use super::{BotConfig, RunStats, ScenarioError, ScenarioRunner};
use crate::jobs::{CancelSignal, SharedRng};
use std::time::Duration;

/// Runner que simula visitas a intervalos regulares
#[derive(Debug, Clone)]
pub struct SimulatedVisitRunner {
    tick: Duration,
}

impl SimulatedVisitRunner {
    pub fn new(tick: Duration) -> Self {
        Self { tick }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }
}

impl Default for SimulatedVisitRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl ScenarioRunner for SimulatedVisitRunner {
    fn run(
        &self,
        config: &BotConfig,
        cancel: &CancelSignal,
        rng: &SharedRng,
    ) -> Result<RunStats, ScenarioError> {
        let vocabulary = vocabulary(config);
        if vocabulary.is_empty() {
            return Err(ScenarioError::EmptyVocabulary);
        }

        let origins = config.origin_pairs();
        let queries = build_query_pool(config, &vocabulary, rng);
        let mut stats = RunStats::default();

        tracing::debug!(
            org = %config.org,
            queries = queries.len(),
            tick_ms = self.tick.as_millis() as u64,
            "Starting simulated visits"
        );

        while !cancel.is_cancelled() {
            let query = rng.pick(&queries).map(String::as_str).unwrap_or_default();
            let (level1, level2) = rng.pick(&origins).copied().unwrap_or(("", ""));
            let clicked = rng.gen_bool(config.documents_exploration_percentage);
            let fetch = usize::try_from(config.fetch_number_of_results).unwrap_or(1).max(1);

            stats.visits += 1;
            if clicked {
                stats.clicks += 1;
            }

            tracing::debug!(
                query,
                origin_level1 = level1,
                origin_level2 = level2,
                clicked,
                rank = if clicked { rng.gen_range(0..fetch) as i64 } else { -1 },
                "Visit"
            );

            if cancel.wait_timeout(self.tick) {
                break;
            }
        }

        Ok(stats)
    }
}

/// Palabras disponibles para armar queries
fn vocabulary(config: &BotConfig) -> Vec<String> {
    let mut words: Vec<String> = config
        .origin_pairs()
        .into_iter()
        .flat_map(|(level1, level2)| [level1, level2])
        .chain(config.fields_to_explore_equally.iter().map(String::as_str))
        .map(|word| word.trim_start_matches('@').to_lowercase())
        .filter(|word| !word.is_empty())
        .collect();
    words.sort();
    words.dedup();
    words
}

/// Arma `numberOfQueryByLanguage` queries por cada origin level 1
fn build_query_pool(config: &BotConfig, vocabulary: &[String], rng: &SharedRng) -> Vec<String> {
    let languages = config.origin_levels.as_ref().map_or(1, |levels| levels.len().max(1));
    let per_language = usize::try_from(config.number_of_query_by_language).unwrap_or(1).max(1);
    let average = usize::try_from(config.average_number_of_words_per_query)
        .unwrap_or(1)
        .max(1);

    (0..languages * per_language)
        .map(|_| {
            // Largo en [1, 2*average - 1], con media `average`
            let len = rng.gen_range(1..2 * average);
            (0..len)
                .filter_map(|_| rng.pick(vocabulary).cloned())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
