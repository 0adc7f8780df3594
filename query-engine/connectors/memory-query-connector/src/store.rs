use crate::{filter::Matches, orderby::sort_records, MemoryError};
use itertools::Itertools;
use query_connector::RelatedRecordIds;
use query_structure::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub(crate) rows: Vec<Record>,
    sequence: i64,
}

impl Table {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn bump_sequence(&mut self, value: &ResourceValue) {
        if let Some(id) = value.as_int() {
            self.sequence = self.sequence.max(id);
        }
    }
}

/// All tables of the backend. Cloned wholesale to give a transaction its working copy.
#[derive(Debug, Clone, Default)]
pub(crate) struct Store {
    tables: HashMap<String, Table>,
}

impl Store {
    pub(crate) fn rows(&self, table: &str) -> &[Record] {
        self.tables.get(table).map(|t| t.rows.as_slice()).unwrap_or_default()
    }

    fn table_mut(&mut self, table: &str) -> &mut Table {
        self.tables.entry(table.to_owned()).or_default()
    }

    pub(crate) fn get_many_records(&self, args: &QueryArguments) -> crate::Result<Vec<Record>> {
        let mut records = Vec::new();

        for row in self.rows(args.collection.db_name()) {
            if args.filter.matches(row)? {
                records.push(row.clone());
            }
        }

        sort_records(&mut records, &args.order_by);

        if args.distinct {
            records = records.into_iter().unique_by(|r| format!("{r:?}")).collect();
        }

        let skip = args.skip.unwrap_or(0);
        let take = args.take.unwrap_or(usize::MAX);

        Ok(records.into_iter().skip(skip).take(take).collect())
    }

    pub(crate) fn get_related_record_ids(
        &self,
        relationship: &Relationship,
        parents: &[Record],
    ) -> crate::Result<Vec<RelatedRecordIds>> {
        let parent_index = relationship.collection().primary_index().clone();
        let child_index = relationship.related().primary_index().clone();

        let parent_keys: Vec<Vec<ResourceValue>> =
            parents.iter().filter_map(|p| parent_index.values_of(p)).collect();
        let wanted = |values: &[ResourceValue]| parent_keys.iter().any(|key| keys_equal(key, values));

        let mut pairs = Vec::new();

        match relationship.kind() {
            RelationKind::OneToMany { foreign_key, .. } => {
                for row in self.rows(relationship.related().db_name()) {
                    let Some(fk) = foreign_key.values_of(row) else { continue };
                    let Some(child) = row.select(child_index.columns()) else { continue };

                    if wanted(&fk) {
                        pairs.push((zip_record(&parent_index, fk), child));
                    }
                }
            }
            RelationKind::ManyToMany { link } => {
                for row in self.rows(&link.table) {
                    let Some(parent) = values_of(row, &link.parent_columns) else { continue };
                    let Some(child) = values_of(row, &link.child_columns) else { continue };

                    if wanted(&parent) {
                        pairs.push((zip_record(&parent_index, parent), zip_record(&child_index, child)));
                    }
                }
            }
            RelationKind::ManyToOne { foreign_key, .. } => {
                for row in self.rows(relationship.collection().db_name()) {
                    let Some(pk) = parent_index.values_of(row) else { continue };
                    let Some(fk) = foreign_key.values_of(row) else { continue };

                    if wanted(&pk) {
                        pairs.push((zip_record(&parent_index, pk), zip_record(&child_index, fk)));
                    }
                }
            }
        }

        Ok(pairs)
    }

    pub(crate) fn get_link_records(
        &self,
        link: &LinkTable,
        filter: &Filter,
        take: Option<usize>,
    ) -> crate::Result<Vec<Record>> {
        let mut records = Vec::new();

        for row in self.rows(&link.table) {
            if records.len() >= take.unwrap_or(usize::MAX) {
                break;
            }

            if filter.matches(row)? {
                records.push(row.clone());
            }
        }

        Ok(records)
    }

    pub(crate) fn upsert_records(
        &mut self,
        collection: &Collection,
        records: Vec<Record>,
    ) -> crate::Result<Vec<Record>> {
        let index = collection.primary_index().clone();
        let table = self.table_mut(collection.db_name());
        let mut stored = Vec::with_capacity(records.len());

        for record in records {
            let existing = index.values_of(&record).and_then(|key| {
                table
                    .rows
                    .iter()
                    .position(|row| index.values_of(row).is_some_and(|k| keys_equal(&k, &key)))
            });

            match existing {
                Some(pos) => {
                    let mut row = table.rows[pos].clone();
                    row.merge(record);
                    check_nullability(collection, &row)?;

                    table.rows[pos] = row.clone();
                    stored.push(row);
                }
                None => {
                    let mut row = record;

                    for property in index.properties() {
                        let present = row.get(&property.column).filter(|v| !v.is_null()).cloned();

                        match present {
                            Some(value) => table.bump_sequence(&value),
                            None => {
                                let value = generate_key(table, property)?;
                                row.insert(property.column.clone(), value);
                            }
                        }
                    }

                    for property in collection.properties() {
                        if !row.contains_column(&property.column) {
                            row.insert(property.column.clone(), ResourceValue::Null);
                        }
                    }

                    check_nullability(collection, &row)?;

                    table.rows.push(row.clone());
                    stored.push(row);
                }
            }
        }

        Ok(stored)
    }

    pub(crate) fn update_records(
        &mut self,
        collection: &Collection,
        filter: &Filter,
        values: &Record,
    ) -> crate::Result<usize> {
        let table = self.table_mut(collection.db_name());
        let mut updated = Vec::new();

        for (pos, row) in table.rows.iter().enumerate() {
            if filter.matches(row)? {
                let mut row = row.clone();
                row.merge(values.clone());
                check_nullability(collection, &row)?;
                updated.push((pos, row));
            }
        }

        let count = updated.len();

        for (pos, row) in updated {
            table.rows[pos] = row;
        }

        Ok(count)
    }

    pub(crate) fn delete_records(&mut self, table: &str, filter: &Filter) -> crate::Result<usize> {
        let table = self.table_mut(table);
        let mut keep = Vec::with_capacity(table.rows.len());

        for row in table.rows.iter() {
            keep.push(!filter.matches(row)?);
        }

        let before = table.rows.len();
        let mut flags = keep.into_iter();
        table.rows.retain(|_| flags.next().unwrap_or(true));

        Ok(before - table.rows.len())
    }

    pub(crate) fn create_link_records(
        &mut self,
        link: &LinkTable,
        records: Vec<Record>,
        skip_duplicates: bool,
    ) -> crate::Result<usize> {
        let columns: Vec<String> = link.parent_columns.iter().chain(link.child_columns.iter()).cloned().collect();
        let table = self.table_mut(&link.table);
        let mut inserted = 0;

        for record in records {
            let key = values_of(&record, &columns).ok_or_else(|| MemoryError::NullConstraintViolation {
                column: columns.join(","),
            })?;

            let exists = table
                .rows
                .iter()
                .any(|row| values_of(row, &columns).is_some_and(|k| keys_equal(&k, &key)));

            match (exists, skip_duplicates) {
                (true, true) => continue,
                (true, false) => {
                    return Err(MemoryError::UniqueConstraintViolation {
                        constraint: format!("{}({})", link.table, columns.join(",")),
                    })
                }
                (false, _) => {
                    table.rows.push(record);
                    inserted += 1;
                }
            }
        }

        Ok(inserted)
    }
}

fn values_of(record: &Record, columns: &[String]) -> Option<Vec<ResourceValue>> {
    columns
        .iter()
        .map(|column| record.get(column).filter(|v| !v.is_null()).cloned())
        .collect()
}

fn zip_record(index: &Index, values: Vec<ResourceValue>) -> Record {
    index.columns().map(ToOwned::to_owned).zip(values).collect()
}

fn keys_equal(a: &[ResourceValue], b: &[ResourceValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
}

fn generate_key(table: &mut Table, property: &Property) -> crate::Result<ResourceValue> {
    match property.type_identifier {
        TypeIdentifier::Number => Ok(ResourceValue::Int(table.next_id())),
        TypeIdentifier::String => Ok(ResourceValue::String(uuid::Uuid::new_v4().to_string())),
        _ => Err(MemoryError::KeyGeneration {
            column: property.column.clone(),
        }),
    }
}

fn check_nullability(collection: &Collection, row: &Record) -> crate::Result<()> {
    for property in collection.properties().iter().filter(|p| !p.nullable) {
        if row.get(&property.column).map_or(true, ResourceValue::is_null) {
            return Err(MemoryError::NullConstraintViolation {
                column: property.column.clone(),
            });
        }
    }

    Ok(())
}
