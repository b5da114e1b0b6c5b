use chrono::{TimeZone, Utc};

use crate::core::persistence::metrics::rollup::metric_rollup_entity::{MetricRollupEntity, TopologyRef};
use crate::domain::chargeback::model::{
    AggregateRow, GroupDimension, GroupKey, Grouping, Interval, TopologyKey, TopologyLevel,
    EMPTY_TAG_NAME, NO_PARENT_NAME,
};
use crate::errors::ChargebackResult;

use super::run_context::ChargebackRunContext;
use super::time_range::{period_end, period_label, period_start};

/// Key of the row a sample contributes to, and the seed of that row should
/// the key be new.
pub fn key_and_fields<Tz: TimeZone>(
    sample: &MetricRollupEntity,
    interval: Interval,
    tz: &Tz,
    grouping: &Grouping,
    ctx: &ChargebackRunContext,
) -> ChargebackResult<(GroupKey, AggregateRow)> {
    let local = sample.timestamp.with_timezone(tz);
    let start = period_start(&local, interval)?;
    let end = period_end(&local, interval)?;

    let mut row = AggregateRow::new(
        start.fixed_offset(),
        end.fixed_offset(),
        period_label(&start, interval),
        interval,
    );

    let dimension = match grouping {
        Grouping::ByTagCategory(category) => {
            let classification = sample
                .tags
                .iter()
                .find(|t| &t.category == category)
                .and_then(|t| ctx.classifications.get(&t.value));

            row.tag_name = Some(
                classification
                    .map(|c| c.description.clone())
                    .unwrap_or_else(|| EMPTY_TAG_NAME.to_string()),
            );
            GroupDimension::Classification(classification.map(|c| c.id))
        }
        Grouping::ByTopology(level) => {
            let target = topology_at(sample, *level);

            row.group_level = Some(*level);
            row.group_id = target.as_ref().map(|t| t.id);
            row.group_name = Some(
                target
                    .map(|t| t.name)
                    .unwrap_or_else(|| NO_PARENT_NAME.to_string()),
            );
            GroupDimension::Topology(TopologyKey {
                level: *level,
                id: row.group_id,
            })
        }
    };

    let key = GroupKey {
        bucket: start.with_timezone(&Utc),
        dimension,
    };
    Ok((key, row))
}

fn topology_at(sample: &MetricRollupEntity, level: TopologyLevel) -> Option<TopologyRef> {
    match level {
        TopologyLevel::Resource => sample
            .resource
            .as_ref()
            .map(|r| TopologyRef::new(r.id, r.name.clone())),
        TopologyLevel::Host => sample.parent_host.clone(),
        TopologyLevel::Cluster => sample.parent_cluster.clone(),
        TopologyLevel::Storage => sample.parent_storage.clone(),
        TopologyLevel::Provider => sample.parent_provider.clone(),
        TopologyLevel::Tenant => sample.tenant().cloned(),
    }
}
