//! The relationship resolution engine.
//!
//! Given a batch of native records and one relationship name, the
//! resolver performs a single batched foreign fetch and stitches the
//! results into each record's related bag. Query count is bounded to
//! one per relationship per eager-load request regardless of batch
//! size; resolving row-by-row (the classic N+1) never happens here.

use crate::gateway::TableGateway;
use crate::locator::{EntityConfig, MapperLocator};
use crate::record::{Record, RelatedSlot};
use crate::relation::eager::{Eager, TuneFn};
use crate::relation::{Relation, RelationKind};
use relmap_core::error::{Error, RelationErrorKind, Result};
use relmap_core::identity::CanonValue;
use relmap_core::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Stitch one named relationship into a batch of native records.
#[tracing::instrument(level = "debug", skip(locator, natives, tune), fields(relation = name))]
pub fn resolve(
    locator: &Arc<MapperLocator>,
    natives: &[Record],
    name: &str,
    tune: Option<&Arc<TuneFn>>,
) -> Result<()> {
    let Some(first) = natives.first() else {
        return Ok(());
    };
    let entity = Arc::clone(first.entity());
    let relation = entity.find_relation(name)?;
    resolve_relation(locator, natives, &entity, relation, name, tune)
}

/// Stitch every relationship named in an eager specification, in order.
pub fn resolve_eager(locator: &Arc<MapperLocator>, natives: &[Record], eager: &Eager) -> Result<()> {
    for spec in eager.iter() {
        resolve(locator, natives, spec.name(), spec.tune())?;
    }
    Ok(())
}

fn resolve_relation(
    locator: &Arc<MapperLocator>,
    natives: &[Record],
    entity: &Arc<EntityConfig>,
    relation: &Relation,
    store_as: &str,
    tune: Option<&Arc<TuneFn>>,
) -> Result<()> {
    match relation.kind() {
        RelationKind::OneToOne | RelationKind::ManyToOne => {
            resolve_simple(locator, natives, entity, relation, store_as, tune, true)
        }
        RelationKind::OneToMany => {
            resolve_simple(locator, natives, entity, relation, store_as, tune, false)
        }
        RelationKind::ManyToMany => {
            resolve_through(locator, natives, entity, relation, store_as, tune)
        }
        RelationKind::Variant => {
            resolve_variant(locator, natives, entity, relation, store_as, tune)
        }
    }
}

/// One-to-one, many-to-one, one-to-many: group foreign rows by the
/// foreign-column value and hand each native its group.
#[allow(clippy::too_many_arguments)]
fn resolve_simple(
    locator: &Arc<MapperLocator>,
    natives: &[Record],
    entity: &Arc<EntityConfig>,
    relation: &Relation,
    store_as: &str,
    tune: Option<&Arc<TuneFn>>,
    to_one: bool,
) -> Result<()> {
    let foreign_cfg = locator.config(relation.foreign_entity())?;
    let pairing = relation.resolve_columns(entity.table(), foreign_cfg.table())?;

    let native_keys: Vec<Option<Vec<CanonValue>>> = natives
        .iter()
        .map(|record| group_key(record, &pairing.native))
        .collect::<Result<_>>()?;

    let foreign_records = fetch_matching(
        locator,
        natives,
        &foreign_cfg,
        &pairing.native,
        &pairing.foreign,
        tune,
    )?;

    let mut groups: HashMap<Vec<CanonValue>, Vec<Record>> = HashMap::new();
    for record in foreign_records {
        if let Some(key) = group_key(&record, &pairing.foreign)? {
            groups.entry(key).or_default().push(record);
        }
    }

    for (native, key) in natives.iter().zip(&native_keys) {
        let group = key.as_ref().and_then(|k| groups.get(k));
        let slot = if to_one {
            match group.and_then(|g| g.first()) {
                Some(record) => RelatedSlot::One(record.clone()),
                None => RelatedSlot::NoMatch,
            }
        } else {
            RelatedSlot::Many(group.cloned().unwrap_or_default())
        };
        native.set_related(store_as, slot)?;
    }
    Ok(())
}

/// Many-to-many: the join relationship must already be stitched; final
/// targets are fetched once and filtered per native through its own
/// join rows.
fn resolve_through(
    locator: &Arc<MapperLocator>,
    natives: &[Record],
    entity: &Arc<EntityConfig>,
    relation: &Relation,
    store_as: &str,
    tune: Option<&Arc<TuneFn>>,
) -> Result<()> {
    let through = relation.through().ok_or_else(|| {
        Error::Custom(format!(
            "many-to-many relationship '{}' has no through relationship configured",
            relation.name()
        ))
    })?;
    let foreign_cfg = locator.config(relation.foreign_entity())?;
    let pairing = relation.resolve_columns(entity.table(), foreign_cfg.table())?;

    let mut join_rows_per_native = Vec::with_capacity(natives.len());
    for native in natives {
        if !native.related_is_set(through) {
            return Err(Error::relation(
                RelationErrorKind::ThroughRelationNotFetched,
                format!(
                    "relationship '{}' requires '{}' to be fetched first",
                    relation.name(),
                    through
                ),
            ));
        }
        join_rows_per_native.push(native.related(through)?.records().to_vec());
    }

    let all_joins: Vec<Record> = join_rows_per_native.iter().flatten().cloned().collect();
    let targets = fetch_matching(
        locator,
        &all_joins,
        &foreign_cfg,
        &pairing.native,
        &pairing.foreign,
        tune,
    )?;

    for (native, joins) in natives.iter().zip(&join_rows_per_native) {
        let mut wanted = HashSet::new();
        for join in joins {
            if let Some(key) = group_key(join, &pairing.native)? {
                wanted.insert(key);
            }
        }
        // Iterate targets in fetch order so each native's subset keeps
        // the foreign-table return order.
        let mut matches = Vec::new();
        for target in &targets {
            if let Some(key) = group_key(target, &pairing.foreign)? {
                if wanted.contains(&key) {
                    matches.push(target.clone());
                }
            }
        }
        native.set_related(store_as, RelatedSlot::Many(matches))?;
    }
    Ok(())
}

/// Discriminator dispatch: partition natives by the discriminator value
/// and resolve each partition with its arm's definition.
fn resolve_variant(
    locator: &Arc<MapperLocator>,
    natives: &[Record],
    entity: &Arc<EntityConfig>,
    relation: &Relation,
    store_as: &str,
    tune: Option<&Arc<TuneFn>>,
) -> Result<()> {
    let discriminator = relation.discriminator().ok_or_else(|| {
        Error::Custom(format!(
            "variant relationship '{}' has no discriminator column configured",
            relation.name()
        ))
    })?;

    let mut partitions: Vec<(CanonValue, Value, Vec<Record>)> = Vec::new();
    for native in natives {
        let value = native.get_value(discriminator)?;
        let canon = CanonValue::from_value(&value);
        match partitions.iter().position(|(c, _, _)| *c == canon) {
            Some(index) => partitions[index].2.push(native.clone()),
            None => partitions.push((canon, value, vec![native.clone()])),
        }
    }

    for (canon, value, group) in &partitions {
        let arm = relation
            .arms()
            .iter()
            .find(|(v, _)| CanonValue::from_value(v) == *canon)
            .map(|(_, r)| r)
            .ok_or_else(|| {
                Error::relation(
                    RelationErrorKind::NoSuchDiscriminantValue,
                    format!(
                        "relationship '{}' has no definition for discriminator value {:?}",
                        relation.name(),
                        value
                    ),
                )
            })?;
        resolve_relation(locator, group, entity, arm, store_as, tune)?;
    }
    Ok(())
}

/// One batched fetch of foreign records matching the distinct native
/// column values. Returns an empty vec (and issues no query) when no
/// native carries a complete value set.
fn fetch_matching(
    locator: &Arc<MapperLocator>,
    natives: &[Record],
    foreign_cfg: &Arc<EntityConfig>,
    native_cols: &[String],
    foreign_cols: &[String],
    tune: Option<&Arc<TuneFn>>,
) -> Result<Vec<Record>> {
    let mut distinct_per_col: Vec<(HashSet<CanonValue>, Vec<Value>)> =
        foreign_cols.iter().map(|_| (HashSet::new(), Vec::new())).collect();
    let mut any = false;
    for native in natives {
        let mut values = Vec::with_capacity(native_cols.len());
        for col in native_cols {
            let value = native.get_value(col)?;
            if value.is_null() {
                values.clear();
                break;
            }
            values.push(value);
        }
        if values.is_empty() {
            continue;
        }
        any = true;
        for (value, (seen, list)) in values.into_iter().zip(&mut distinct_per_col) {
            if seen.insert(CanonValue::from_value(&value)) {
                list.push(value);
            }
        }
    }
    if !any {
        return Ok(Vec::new());
    }

    let mut select = relmap_query::SelectBuilder::new(foreign_cfg.table().table());
    for (foreign_col, (_, values)) in foreign_cols.iter().zip(distinct_per_col) {
        select = select.where_in(foreign_col.clone(), values);
    }
    if let Some(tune) = tune {
        select = tune(select);
    }

    let gateway = TableGateway::new(Arc::clone(foreign_cfg), Arc::clone(locator));
    let rows = gateway.select(select)?;
    tracing::trace!(fetched = rows.len(), "batched foreign fetch complete");
    Ok(rows
        .into_iter()
        .map(|row| Record::new(Arc::clone(foreign_cfg), row))
        .collect())
}

/// The canonical grouping key of a record over the given columns, or
/// `None` when any column is NULL.
fn group_key(record: &Record, columns: &[String]) -> Result<Option<Vec<CanonValue>>> {
    let mut key = Vec::with_capacity(columns.len());
    for column in columns {
        let value = record.get_value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        key.push(CanonValue::from_value(&value));
    }
    Ok(Some(key))
}
