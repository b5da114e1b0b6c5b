use std::sync::Arc;

use tracing::debug;

use crate::core::persistence::info::rates::chargeback_rate_api_repository_trait::ChargebackRateApiRepository;
use crate::core::persistence::info::rates::chargeback_rate_entity::{
    ChargebackRateEntity, ParentKind, RateParent,
};
use crate::core::persistence::metrics::rollup::metric_rollup_entity::{
    MetricRollupEntity, ResourceEntity, Tag,
};
use crate::domain::chargeback::model::RateCacheKey;
use crate::errors::ChargebackResult;

use super::run_context::ChargebackRunContext;

pub fn rate_cache_key(sample: &MetricRollupEntity) -> RateCacheKey {
    let mut tags: Vec<Tag> = sample
        .tags
        .iter()
        .filter(|t| !t.is_folder_path())
        .cloned()
        .collect();
    tags.sort();

    RateCacheKey {
        tags,
        host: sample.parent_host.as_ref().map(|p| p.id),
        cluster: sample.parent_cluster.as_ref().map(|p| p.id),
        storage: sample.parent_storage.as_ref().map(|p| p.id),
        provider: sample.parent_provider.as_ref().map(|p| p.id),
        tenant: sample.tenant().map(|t| t.id),
    }
}

/// Rates applicable to the sample's resource, memoized for the run.
///
/// The sample must carry a resource; the driver skips those that do not.
pub fn get_rates(
    ctx: &mut ChargebackRunContext,
    repo: &dyn ChargebackRateApiRepository,
    sample: &MetricRollupEntity,
    resource: &ResourceEntity,
) -> ChargebackResult<Arc<[ChargebackRateEntity]>> {
    let key = rate_cache_key(sample);
    if let Some(rates) = ctx.cached_rates(&key) {
        debug!(resource_id = sample.resource_id, "Rate cache hit");
        return Ok(rates);
    }

    // Sorted so the first matching tag assignment does not depend on sample tag order.
    let mut tags: Vec<&Tag> = sample.tags.iter().collect();
    tags.sort();
    let tag_list: Vec<String> = tags.into_iter().map(Tag::managed_reference).collect();
    let parents = rate_parents(ctx, sample);

    debug!(
        resource_id = sample.resource_id,
        tags = tag_list.len(),
        parents = parents.len(),
        "Rate cache miss, querying rate store"
    );
    let rates = repo.assigned_rates(resource, &tag_list, &parents)?;
    Ok(ctx.store_rates(key, rates))
}

/// Ancestors in assignment precedence: host, cluster, storage, provider,
/// enterprise, then tenant.
fn rate_parents(ctx: &ChargebackRunContext, sample: &MetricRollupEntity) -> Vec<RateParent> {
    let topology = [
        (ParentKind::Host, &sample.parent_host),
        (ParentKind::Cluster, &sample.parent_cluster),
        (ParentKind::Storage, &sample.parent_storage),
        (ParentKind::Provider, &sample.parent_provider),
        (ParentKind::Enterprise, &ctx.enterprise),
    ];

    let mut parents: Vec<RateParent> = topology
        .into_iter()
        .filter_map(|(kind, target)| target.clone().map(|t| RateParent::new(kind, t)))
        .collect();

    if let Some(tenant) = sample.tenant() {
        parents.push(RateParent::new(ParentKind::Tenant, tenant.clone()));
    }
    parents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::info::rates::chargeback_rate_entity::{
        AssignmentTarget, ChargebackRateCatalogEntity, RateAssignmentEntity,
    };
    use crate::core::persistence::info::rates::chargeback_rate_repository::ChargebackRateRepository;
    use crate::core::persistence::metrics::rollup::metric_rollup_entity::TopologyRef;
    use crate::domain::chargeback::service::test_support::{
        compute_rate, rate, sample, MockRateRepository,
    };
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn ctx() -> ChargebackRunContext {
        ChargebackRunContext::new(Some(TopologyRef::new(1, "Enterprise")), HashMap::new())
    }

    #[test]
    fn one_query_per_cache_key() {
        let repo = MockRateRepository::new(vec![compute_rate()]);
        let mut ctx = ctx();
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        // Same tags (in another order, plus a folder path) and topology.
        let a = sample(1, ts, 2.0);
        let mut b = sample(2, ts, 4.0);
        b.tags = vec![
            Tag::new("folder_path_blue", "dc/vms"),
            Tag::new("department", "finance"),
        ];
        let mut c = sample(3, ts, 1.0);
        c.parent_host = Some(TopologyRef::new(11, "esx-11"));

        for s in [&a, &b, &a, &c, &b] {
            let resource = s.resource.clone().unwrap();
            let rates = get_rates(&mut ctx, &repo, s, &resource).unwrap();
            assert_eq!(rates.len(), 1);
        }

        assert_eq!(repo.call_count(), 2);
        assert_eq!(ctx.rate_queries(), 2);
        assert_eq!(ctx.rate_cache_hits(), 3);
    }

    #[test]
    fn empty_results_are_cached_too() {
        let repo = MockRateRepository::default();
        let mut ctx = ctx();
        let s = sample(1, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), 2.0);
        let resource = s.resource.clone().unwrap();

        assert!(get_rates(&mut ctx, &repo, &s, &resource).unwrap().is_empty());
        assert!(get_rates(&mut ctx, &repo, &s, &resource).unwrap().is_empty());
        assert_eq!(repo.call_count(), 1);
    }

    #[test]
    fn queries_with_managed_tags_and_ordered_parents() {
        let repo = MockRateRepository::default();
        let mut ctx = ctx();
        let mut s = sample(1, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), 2.0);
        s.tags.push(Tag::new("folder_path_blue", "dc/vms"));
        if let Some(resource) = s.resource.as_mut() {
            resource.tenant = Some(TopologyRef::new(5, "ops"));
        }
        let resource = s.resource.clone().unwrap();

        get_rates(&mut ctx, &repo, &s, &resource).unwrap();

        let calls = repo.calls.lock().unwrap();
        let (tag_list, parents) = &calls[0];
        assert_eq!(
            tag_list,
            &vec![
                "vm/tag/managed/department/finance".to_string(),
                "vm/tag/managed/folder_path_blue/dc/vms".to_string(),
            ]
        );
        let kinds: Vec<ParentKind> = parents.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParentKind::Host,
                ParentKind::Cluster,
                ParentKind::Provider,
                ParentKind::Enterprise,
                ParentKind::Tenant,
            ]
        );
    }

    #[test]
    fn tenant_is_part_of_the_cache_key() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let a = sample(1, ts, 2.0);
        let mut b = sample(1, ts, 2.0);
        if let Some(resource) = b.resource.as_mut() {
            resource.tenant = Some(TopologyRef::new(5, "ops"));
        }
        assert_ne!(rate_cache_key(&a), rate_cache_key(&b));
    }

    #[test]
    fn tag_assignment_does_not_depend_on_tag_order() {
        let tag_rate = |id: &str, tag: &str| {
            (
                rate(id, id, vec![]),
                RateAssignmentEntity {
                    rate_id: id.into(),
                    target: AssignmentTarget::Tag { tag: tag.into() },
                },
            )
        };
        let (rate_a, assign_a) = tag_rate("rate-a", "cc/a");
        let (rate_b, assign_b) = tag_rate("rate-b", "dept/b");
        let repo = ChargebackRateRepository::from_catalog(ChargebackRateCatalogEntity {
            rates: vec![rate_a, rate_b],
            assignments: vec![assign_b, assign_a],
        });

        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut x = sample(1, ts, 2.0);
        x.tags = vec![Tag::new("cc", "a"), Tag::new("dept", "b")];
        let mut y = sample(2, ts, 2.0);
        y.tags = vec![Tag::new("dept", "b"), Tag::new("cc", "a")];
        assert_eq!(rate_cache_key(&x), rate_cache_key(&y));

        let resolve = |order: [&MetricRollupEntity; 2]| -> Vec<String> {
            let mut ctx = ctx();
            order
                .into_iter()
                .map(|s| {
                    let resource = s.resource.clone().unwrap();
                    let rates = get_rates(&mut ctx, &repo, s, &resource).unwrap();
                    rates[0].id.clone()
                })
                .collect()
        };

        assert_eq!(resolve([&x, &y]), vec!["rate-a", "rate-a"]);
        assert_eq!(resolve([&y, &x]), vec!["rate-a", "rate-a"]);
    }
}
