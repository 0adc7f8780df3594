use memory_query_connector::MemoryConnector;
use pretty_assertions::assert_eq;
use query_connector::{Connection, RecordFilter, ReadOperations, Transaction, WriteOperations};
use query_structure::*;
use serde_json::json;

fn schema() -> InternalSchemaRef {
    let definition = json!({
        "collections": [
            {
                "name": "owners",
                "properties": [
                    { "name": "id", "type": "number", "nullable": false },
                    { "name": "name", "type": "string" }
                ],
                "primary_index": ["id"],
                "relationships": [
                    { "name": "pets", "kind": "one_to_many", "related": "pets", "foreign_key": "pets_owner", "inverse": "owner" }
                ]
            },
            {
                "name": "pets",
                "properties": [
                    { "name": "id", "type": "number", "nullable": false },
                    { "name": "name", "type": "string" },
                    { "name": "ownerId", "column": "owner_id", "type": "number" }
                ],
                "primary_index": ["id"],
                "indexes": [{ "name": "pets_owner", "properties": ["ownerId"] }],
                "relationships": [
                    { "name": "owner", "kind": "many_to_one", "related": "owners", "foreign_key": "pets_owner", "inverse": "pets" },
                    {
                        "name": "tags", "kind": "many_to_many", "related": "tags",
                        "link": { "table": "pet_tags", "parent_columns": ["pet_id"], "child_columns": ["tag_id"] }
                    }
                ]
            },
            {
                "name": "tags",
                "properties": [{ "name": "label", "type": "string", "nullable": false }],
                "primary_index": ["label"]
            }
        ]
    });

    InternalSchema::build(serde_json::from_value(definition).unwrap()).unwrap()
}

fn record(pairs: &[(&str, ResourceValue)]) -> Record {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[tokio::test]
async fn upsert_generates_keys_and_updates_existing_rows() {
    let schema = schema();
    let owners = schema.find_collection("owners").unwrap();
    let connector = MemoryConnector::new();
    let conn = connector.connection();

    let created = conn
        .upsert_records(
            &owners,
            vec![
                record(&[("name", "Ann".into())]),
                record(&[("name", "Bob".into())]),
            ],
        )
        .await
        .unwrap();

    assert_eq!(created[0].get("id"), Some(&ResourceValue::Int(1)));
    assert_eq!(created[1].get("id"), Some(&ResourceValue::Int(2)));

    conn.upsert_records(&owners, vec![record(&[("id", 2.into()), ("name", "Bo".into())])])
        .await
        .unwrap();

    let rows = conn
        .get_many_records(QueryArguments::new(owners.clone()).with_order_by(vec![OrderBy::descending("id")]))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some(&ResourceValue::from("Bo")));
    assert_eq!(connector.calls().upsert_records, 2);
}

#[tokio::test]
async fn related_ids_for_one_to_many_and_many_to_many() {
    let schema = schema();
    let owners = schema.find_collection("owners").unwrap();
    let pets = schema.find_collection("pets").unwrap();
    let connector = MemoryConnector::new();

    connector
        .insert_records(&owners, vec![record(&[("id", 1.into())]), record(&[("id", 2.into())])])
        .unwrap();
    connector
        .insert_records(
            &pets,
            vec![
                record(&[("id", 10.into()), ("owner_id", 1.into())]),
                record(&[("id", 11.into()), ("owner_id", 1.into())]),
                record(&[("id", 12.into()), ("owner_id", 2.into())]),
            ],
        )
        .unwrap();

    let tags = pets.find_relationship("tags").unwrap();
    let RelationKind::ManyToMany { link } = tags.kind() else { unreachable!() };
    connector
        .insert_link_records(
            link,
            vec![
                record(&[("pet_id", 10.into()), ("tag_id", "cute".into())]),
                record(&[("pet_id", 12.into()), ("tag_id", "loud".into())]),
            ],
        )
        .unwrap();

    let conn = connector.connection();
    let owner_pets = owners.find_relationship("pets").unwrap();
    let pairs = conn
        .get_related_record_ids(&owner_pets, &[record(&[("id", 1.into())])])
        .await
        .unwrap();

    assert_eq!(
        pairs,
        vec![
            (record(&[("id", 1.into())]), record(&[("id", 10.into())])),
            (record(&[("id", 1.into())]), record(&[("id", 11.into())])),
        ]
    );

    let pairs = conn
        .get_related_record_ids(&tags, &[record(&[("id", 10.into())]), record(&[("id", 12.into())])])
        .await
        .unwrap();

    assert_eq!(
        pairs,
        vec![
            (record(&[("id", 10.into())]), record(&[("label", "cute".into())])),
            (record(&[("id", 12.into())]), record(&[("label", "loud".into())])),
        ]
    );
}

#[tokio::test]
async fn rolled_back_transactions_leave_no_trace() {
    let schema = schema();
    let owners = schema.find_collection("owners").unwrap();
    let connector = MemoryConnector::new();
    let conn = connector.connection();

    {
        let tx = conn.start_transaction().await.unwrap();
        tx.upsert_records(&owners, vec![record(&[("name", "Ann".into())])])
            .await
            .unwrap();
        tx.rollback().await.unwrap();
    }

    assert!(connector.records("owners").is_empty());

    {
        let tx = conn.start_transaction().await.unwrap();
        tx.upsert_records(&owners, vec![record(&[("name", "Ann".into())])])
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(tx.commit().await.is_err());
    }

    assert_eq!(connector.records("owners").len(), 1);
}

#[tokio::test]
async fn null_constraints_are_enforced_on_update() {
    let schema = schema();
    let tags = schema.find_collection("tags").unwrap();
    let connector = MemoryConnector::new();
    connector.insert_records(&tags, vec![record(&[("label", "a".into())])]).unwrap();

    let conn = connector.connection();
    let result = conn
        .update_records(
            &tags,
            RecordFilter::from(Filter::empty()),
            record(&[("label", ResourceValue::Null)]),
        )
        .await;

    assert!(result.is_err());
}
