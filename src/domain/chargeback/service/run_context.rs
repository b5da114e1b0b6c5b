use std::collections::HashMap;
use std::sync::Arc;

use crate::core::persistence::info::classification::classification_entity::ClassificationEntity;
use crate::core::persistence::info::rates::chargeback_rate_entity::ChargebackRateEntity;
use crate::core::persistence::metrics::rollup::metric_rollup_entity::TopologyRef;
use crate::domain::chargeback::model::RateCacheKey;

/// State scoped to a single chargeback run.
///
/// Created at the start of a run and dropped with it, so nothing resolved
/// here leaks into the next run.
#[derive(Debug, Default)]
pub struct ChargebackRunContext {
    pub enterprise: Option<TopologyRef>,
    /// Tag value -> classification, for the grouping category only.
    pub classifications: HashMap<String, ClassificationEntity>,
    rates: HashMap<RateCacheKey, Arc<[ChargebackRateEntity]>>,
    rate_queries: usize,
    rate_cache_hits: usize,
}

impl ChargebackRunContext {
    pub fn new(
        enterprise: Option<TopologyRef>,
        classifications: HashMap<String, ClassificationEntity>,
    ) -> Self {
        Self {
            enterprise,
            classifications,
            ..Default::default()
        }
    }

    pub(crate) fn cached_rates(&mut self, key: &RateCacheKey) -> Option<Arc<[ChargebackRateEntity]>> {
        let hit = self.rates.get(key).cloned();
        if hit.is_some() {
            self.rate_cache_hits += 1;
        }
        hit
    }

    pub(crate) fn store_rates(
        &mut self,
        key: RateCacheKey,
        rates: Vec<ChargebackRateEntity>,
    ) -> Arc<[ChargebackRateEntity]> {
        self.rate_queries += 1;
        let rates: Arc<[ChargebackRateEntity]> = rates.into();
        self.rates.insert(key, Arc::clone(&rates));
        rates
    }

    /// Rate store queries issued so far.
    pub fn rate_queries(&self) -> usize {
        self.rate_queries
    }

    pub fn rate_cache_hits(&self) -> usize {
        self.rate_cache_hits
    }
}
