use async_trait::async_trait;
use memory_query_connector::{MemoryConnection, MemoryConnector};
use pretty_assertions::assert_eq;
use query_core::{
    expansion, read, term, translate, write, CoreError, DeleteTarget, DirectFrontDoor, Document, EngineConfig, FrontDoor,
    NestedWrite, NestedWriteResult, RequestContext,
};
use query_structure::{Collection, EntityKey, InternalSchema, InternalSchemaRef, RelationKind, Record, ResourceValue};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

struct Kennel {
    schema: InternalSchemaRef,
    connector: MemoryConnector,
    conn: MemoryConnection,
    config: EngineConfig,
}

fn record(pairs: &[(&str, ResourceValue)]) -> Record {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(document) => document,
        other => panic!("not an object: {other}"),
    }
}

impl Kennel {
    fn new() -> Self {
        let schema = InternalSchema::from_json(include_str!("fixtures/kennel.json")).unwrap();
        let connector = MemoryConnector::new();
        let conn = connector.connection();

        let kennel = Self {
            schema,
            connector,
            conn,
            config: EngineConfig::default(),
        };

        kennel.seed();
        kennel
    }

    fn collection(&self, name: &str) -> Collection {
        self.schema.find_collection(name).unwrap()
    }

    fn seed(&self) {
        let owners = self.collection("owners");
        let pets = self.collection("pets");
        let tags = self.collection("tags");
        let visits = self.collection("visits");

        self.connector
            .insert_records(
                &owners,
                vec![
                    record(&[("id", 1.into()), ("name", "Ann".into()), ("age", 30.into())]),
                    record(&[("id", 2.into()), ("name", "Bob".into()), ("age", 40.into())]),
                ],
            )
            .unwrap();

        self.connector
            .insert_records(
                &pets,
                vec![
                    record(&[("id", 10.into()), ("name", "Rex".into()), ("owner_id", 1.into())]),
                    record(&[("id", 11.into()), ("name", "Tom".into()), ("owner_id", 1.into())]),
                    record(&[("id", 12.into()), ("name", "Kit".into()), ("owner_id", 2.into())]),
                ],
            )
            .unwrap();

        self.connector
            .insert_records(
                &tags,
                vec![
                    record(&[("id", 1.into()), ("label", "cute".into())]),
                    record(&[("id", 2.into()), ("label", "loud".into())]),
                ],
            )
            .unwrap();

        let RelationKind::ManyToMany { link } = pets.find_relationship("tags").unwrap().kind().clone() else {
            unreachable!()
        };

        self.connector
            .insert_link_records(
                &link,
                vec![
                    record(&[("pet_id", 10.into()), ("tag_id", 1.into())]),
                    record(&[("pet_id", 11.into()), ("tag_id", 1.into())]),
                    record(&[("pet_id", 12.into()), ("tag_id", 2.into())]),
                ],
            )
            .unwrap();

        self.connector
            .insert_records(
                &visits,
                vec![
                    record(&[("clinic", "North".into()), ("day", "2024-01-01".into()), ("pet_id", 10.into())]),
                    record(&[("clinic", "South".into()), ("day", "2024-01-02".into()), ("pet_id", 10.into())]),
                ],
            )
            .unwrap();

        self.connector.reset_calls();
    }

    fn ctx<'a>(&'a self, front_door: &'a dyn FrontDoor) -> RequestContext<'a> {
        RequestContext::new(&self.config, &self.conn, front_door)
    }

    async fn list(&self, collection: &str, params: &[(&str, &str)]) -> read::Page {
        let collection = self.collection(collection);
        let terms = term::parse_query(params.iter().copied(), &self.config).unwrap();
        let query = translate(&terms, &collection, &self.config).unwrap();

        read::find_page(&self.ctx(&DirectFrontDoor), &collection, &query).await.unwrap()
    }

    fn rows(&self, table: &str) -> Vec<Record> {
        self.connector.records(table)
    }

    fn row(&self, table: &str, id: i64) -> Option<Record> {
        self.rows(table)
            .into_iter()
            .find(|row| row.get("id") == Some(&ResourceValue::Int(id)))
    }
}

#[tokio::test]
async fn expansion_shapes_nested_documents_within_the_fetch_bound() {
    let kennel = Kennel::new();
    let page = kennel.list("owners", &[("expands", "pets.tags"), ("eq(id,1)", "")]).await;

    let calls = kennel.connector.calls();
    // One page read, then a membership lookup and an entity fetch per level.
    assert_eq!(calls.get_many_records, 3);
    assert_eq!(calls.get_related_record_ids, 2);

    let cute = json!({
        "href": "http://localhost/tags/1",
        "id": 1,
        "label": "cute",
        "pets": { "href": "http://localhost/tags/1/pets" }
    });

    assert_eq!(
        Value::Object(page.documents[0].clone()),
        json!({
            "href": "http://localhost/owners/1",
            "id": 1,
            "name": "Ann",
            "age": 30,
            "joined": null,
            "pets": [
                {
                    "href": "http://localhost/pets/10",
                    "owner": { "href": "http://localhost/owners/1" },
                    "id": 10,
                    "name": "Rex",
                    "ownerId": 1,
                    "tags": [cute.clone()],
                    "visits": { "href": "http://localhost/pets/10/visits" }
                },
                {
                    "href": "http://localhost/pets/11",
                    "owner": { "href": "http://localhost/owners/1" },
                    "id": 11,
                    "name": "Tom",
                    "ownerId": 1,
                    "tags": [cute],
                    "visits": { "href": "http://localhost/pets/11/visits" }
                }
            ]
        })
    );
}

#[tokio::test]
async fn expansion_fetch_count_does_not_grow_with_parents() {
    let kennel = Kennel::new();
    let page = kennel.list("owners", &[("expands", "pets.tags")]).await;

    assert_eq!(page.documents.len(), 2);
    assert_eq!(kennel.connector.calls().reads(), 5);

    let empty_to_many = kennel.list("tags", &[("expands", "pets.visits"), ("eq(id,2)", "")]).await;
    assert_eq!(empty_to_many.documents[0]["pets"][0]["visits"], json!([]));
}

#[tokio::test]
async fn repeated_entities_are_fetched_once_and_render_identically() {
    let kennel = Kennel::new();
    let page = kennel
        .list("pets", &[("in(id,10,11)", ""), ("expands", "owner,tags.pets.owner")])
        .await;

    let calls = kennel.connector.calls();
    assert_eq!(calls.get_many_records, 3);
    assert_eq!(calls.get_related_record_ids, 2);

    let rex = &page.documents[0];
    assert_eq!(rex["owner"]["name"], json!("Ann"));
    assert_eq!(rex["owner"], rex["tags"][0]["pets"][0]["owner"]);
    assert_eq!(rex["owner"], page.documents[1]["owner"]);
    assert_eq!(rex["tags"][0]["pets"][1]["href"], json!("http://localhost/pets/11"));
}

#[tokio::test]
async fn dangling_many_to_one_expands_to_null() {
    let kennel = Kennel::new();
    let pets = kennel.collection("pets");
    kennel
        .connector
        .insert_records(&pets, vec![record(&[("id", 20.into()), ("owner_id", 99.into())])])
        .unwrap();

    let page = kennel.list("pets", &[("eq(id,20)", ""), ("expands", "owner")]).await;
    assert_eq!(page.documents[0]["owner"], Value::Null);
}

#[tokio::test]
async fn expansion_depth_is_bounded() {
    let mut kennel = Kennel::new();
    kennel.config.max_expand_depth = 2;

    let owners = kennel.collection("owners");
    let terms = term::parse_query([("expands", "pets.owner.pets")], &kennel.config).unwrap();
    let query = translate(&terms, &owners, &kennel.config).unwrap();

    let err = read::find_page(&kennel.ctx(&DirectFrontDoor), &owners, &query)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ClientRequest(_)), "{err}");
}

#[tokio::test]
async fn an_entity_resolved_twice_fails_the_expansion() {
    let kennel = Kennel::new();
    let owners = kennel.collection("owners");
    let ann = doc(json!({ "href": "http://localhost/owners/1", "id": 1, "name": "Ann" }));

    let err = expansion::expand(&kennel.ctx(&DirectFrontDoor), &owners, vec![ann.clone(), ann], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::AlgorithmInvariant(_)), "{err}");
}

#[tokio::test]
async fn repeated_keys_are_read_once() {
    let kennel = Kennel::new();
    let owners = kennel.collection("owners");
    let terms = term::parse_query(std::iter::empty::<(&str, &str)>(), &kennel.config).unwrap();
    let query = translate(&terms, &owners, &kennel.config).unwrap();
    let keys = vec![EntityKey::new("2"), EntityKey::new("1"), EntityKey::new("2")];

    let documents = read::find_by_keys(&kennel.ctx(&DirectFrontDoor), &owners, &keys, &query)
        .await
        .unwrap();

    let names: Vec<&Value> = documents.iter().map(|document| &document["name"]).collect();
    assert_eq!(names, vec![&json!("Bob"), &json!("Ann")]);
}

#[tokio::test]
async fn one_to_many_reconciliation_detaches_missing_children() {
    let kennel = Kennel::new();
    let owners = kennel.collection("owners");

    let mut documents = vec![doc(json!({
        "href": "http://localhost/owners/1",
        "pets": [{ "href": "http://localhost/pets/10" }, { "name": "Dot" }]
    }))];

    let keys = write::upsert(&kennel.ctx(&DirectFrontDoor), &owners, &mut documents)
        .await
        .unwrap();

    assert_eq!(keys, vec![EntityKey::new("1")]);
    assert_eq!(documents[0]["pets"][1]["href"], json!("http://localhost/pets/13"));
    assert_eq!(documents[0]["pets"][1]["ownerId"], json!(1));

    let owned: Vec<i64> = kennel
        .rows("pets")
        .iter()
        .filter(|row| row.get("owner_id") == Some(&ResourceValue::Int(1)))
        .filter_map(|row| row.get("id").and_then(ResourceValue::as_int))
        .collect();

    assert_eq!(owned, vec![10, 13]);
    assert_eq!(kennel.rows("pets").len(), 4);
    assert_eq!(kennel.row("pets", 11).unwrap().get("owner_id"), Some(&ResourceValue::Null));
    assert_eq!(kennel.row("owners", 1).unwrap().get("name"), Some(&ResourceValue::from("Ann")));
}

#[tokio::test]
async fn non_nullable_children_are_deleted_when_dropped() {
    let kennel = Kennel::new();
    let pets = kennel.collection("pets");

    let mut documents = vec![doc(json!({
        "href": "http://localhost/pets/10",
        "visits": ["http://localhost/vet-visits/North~2024-01-01"]
    }))];

    write::upsert(&kennel.ctx(&DirectFrontDoor), &pets, &mut documents)
        .await
        .unwrap();

    let visits = kennel.rows("visits");
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].get("clinic"), Some(&ResourceValue::from("North")));
    assert_eq!(
        documents[0]["visits"],
        json!([{ "href": "http://localhost/vet-visits/North~2024-01-01" }])
    );
}

#[tokio::test]
async fn empty_array_clears_a_relationship() {
    let kennel = Kennel::new();
    let pets = kennel.collection("pets");

    let mut documents = vec![doc(json!({ "href": "http://localhost/pets/10", "tags": [] }))];
    write::upsert(&kennel.ctx(&DirectFrontDoor), &pets, &mut documents)
        .await
        .unwrap();

    let links = kennel.rows("pet_tags");
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|row| row.get("pet_id") != Some(&ResourceValue::Int(10))));
}

#[tokio::test]
async fn many_to_many_reconciliation_links_new_and_unlinks_stale() {
    let kennel = Kennel::new();
    let pets = kennel.collection("pets");

    let mut documents = vec![doc(json!({
        "href": "http://localhost/pets/12",
        "tags": [{ "href": "http://localhost/tags/1" }, { "label": "fluffy" }]
    }))];

    write::upsert(&kennel.ctx(&DirectFrontDoor), &pets, &mut documents)
        .await
        .unwrap();

    let mut tags_of_kit: Vec<i64> = kennel
        .rows("pet_tags")
        .iter()
        .filter(|row| row.get("pet_id") == Some(&ResourceValue::Int(12)))
        .filter_map(|row| row.get("tag_id").and_then(ResourceValue::as_int))
        .collect();
    tags_of_kit.sort();

    assert_eq!(tags_of_kit, vec![1, 3]);
    assert_eq!(kennel.rows("pet_tags").len(), 4);
    assert_eq!(documents[0]["tags"][1]["label"], json!("fluffy"));
}

#[tokio::test]
async fn new_many_to_one_parents_are_created_and_backfilled() {
    let kennel = Kennel::new();
    let pets = kennel.collection("pets");

    let mut documents = vec![doc(json!({ "name": "Rex II", "owner": { "name": "Zed" } }))];
    let keys = write::upsert(&kennel.ctx(&DirectFrontDoor), &pets, &mut documents)
        .await
        .unwrap();

    assert_eq!(keys, vec![EntityKey::new("13")]);
    assert_eq!(documents[0]["owner"]["href"], json!("http://localhost/owners/3"));
    assert_eq!(kennel.row("pets", 13).unwrap().get("owner_id"), Some(&ResourceValue::Int(3)));
    assert_eq!(kennel.row("owners", 3).unwrap().get("name"), Some(&ResourceValue::from("Zed")));
}

#[tokio::test]
async fn batch_upsert_assigns_one_key_per_document() {
    let kennel = Kennel::new();
    let owners = kennel.collection("owners");

    let mut documents = vec![
        doc(json!({ "name": "Cid" })),
        doc(json!({ "name": "Dee", "age": "52" })),
        doc(json!({ "name": "Eve", "joined": "2024-05-01T10:00:00Z" })),
    ];

    let keys = write::upsert(&kennel.ctx(&DirectFrontDoor), &owners, &mut documents)
        .await
        .unwrap();

    assert_eq!(keys.len(), 3);
    assert_eq!(kennel.connector.calls().upsert_records, 1);

    let query = translate(&[], &owners, &kennel.config).unwrap();
    let found = read::find_by_keys(&kennel.ctx(&DirectFrontDoor), &owners, &keys, &query)
        .await
        .unwrap();

    let names: Vec<&Value> = found.iter().map(|d| &d["name"]).collect();
    assert_eq!(names, vec![&json!("Cid"), &json!("Dee"), &json!("Eve")]);
    assert_eq!(found[1]["age"], json!(52));
    assert_eq!(found[2]["joined"], json!("2024-05-01T10:00:00.000Z"));
    assert_eq!(found[0]["href"], documents[0]["href"]);
}

#[tokio::test]
async fn invalid_documents_are_client_errors() {
    let kennel = Kennel::new();
    let owners = kennel.collection("owners");
    let ctx = kennel.ctx(&DirectFrontDoor);

    for document in [
        json!({ "age": "old" }),
        json!({ "pets": { "name": "x" } }),
        json!({ "pets": [42] }),
        json!({ "href": "http://localhost/pets/10" }),
        json!({ "href": "http://localhost/owners/1", "id": 2 }),
    ] {
        let err = write::upsert(&ctx, &owners, &mut [doc(document.clone())])
            .await
            .unwrap_err();

        assert!(err.is_client_error(), "{document}: {err}");
    }
}

#[tokio::test]
async fn pagination_splits_five_rows_into_three_pages() {
    let kennel = Kennel::new();
    let owners = kennel.collection("owners");
    kennel
        .connector
        .insert_records(
            &owners,
            (3..=5).map(|id| record(&[("id", id.into())])).collect(),
        )
        .unwrap();

    let mut sizes = Vec::new();

    for page in ["1", "2", "3"] {
        let result = kennel.list("owners", &[("pageSize", "2"), ("page", page)]).await;
        sizes.push((result.page_num, result.documents.len(), result.has_next));
    }

    assert_eq!(sizes, vec![(1, 2, true), (2, 2, true), (3, 1, false)]);
}

#[tokio::test]
async fn related_route_lists_members() {
    let kennel = Kennel::new();
    let owners = kennel.collection("owners");
    let pets = kennel.collection("pets");
    let relationship = owners.find_relationship("pets").unwrap();
    let terms = term::parse_query([("sort", "-name")], &kennel.config).unwrap();
    let query = translate(&terms, &pets, &kennel.config).unwrap();
    let ctx = kennel.ctx(&DirectFrontDoor);

    let page = read::find_related(&ctx, &relationship, &EntityKey::new("1"), &query)
        .await
        .unwrap();

    let names: Vec<&Value> = page.documents.iter().map(|d| &d["name"]).collect();
    assert_eq!(names, vec![&json!("Tom"), &json!("Rex")]);

    let err = read::find_related(&ctx, &relationship, &EntityKey::new("9"), &query)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn patch_updates_only_present_attributes() {
    let kennel = Kennel::new();
    let owners = kennel.collection("owners");
    let ctx = kennel.ctx(&DirectFrontDoor);

    let keys = write::patch(&ctx, &owners, &[doc(json!({ "href": "http://localhost/owners/1", "age": 31 }))])
        .await
        .unwrap();

    assert_eq!(keys, vec![EntityKey::new("1")]);
    let ann = kennel.row("owners", 1).unwrap();
    assert_eq!(ann.get("age"), Some(&ResourceValue::Int(31)));
    assert_eq!(ann.get("name"), Some(&ResourceValue::from("Ann")));

    let err = write::patch(&ctx, &owners, &[doc(json!({ "href": "http://localhost/owners/1", "pets": [] }))])
        .await
        .unwrap_err();
    assert!(err.is_client_error());

    let err = write::patch(&ctx, &owners, &[doc(json!({ "href": "http://localhost/owners/7", "age": 1 }))])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let pets = kennel.collection("pets");
    write::patch(&ctx, &pets, &[doc(json!({ "href": "http://localhost/pets/12", "owner": null }))])
        .await
        .unwrap();
    assert_eq!(kennel.row("pets", 12).unwrap().get("owner_id"), Some(&ResourceValue::Null));
}

#[test]
fn delete_targets_are_mutually_exclusive() {
    let keys = Some(vec![EntityKey::new("1")]);
    let query = Some(vec![term::parse("name", "Tom").unwrap()]);
    let hrefs = Some(vec!["http://localhost/pets/10".to_owned()]);

    assert!(DeleteTarget::exactly_one(None, query.clone(), hrefs.clone())
        .unwrap_err()
        .is_client_error());
    assert!(DeleteTarget::exactly_one(None, None, None).unwrap_err().is_client_error());
    assert!(DeleteTarget::exactly_one(keys.clone(), query, None).is_err());
    assert_eq!(
        DeleteTarget::exactly_one(keys, None, None).unwrap(),
        DeleteTarget::Keys(vec![EntityKey::new("1")])
    );
}

#[tokio::test]
async fn delete_by_query_removes_rows_and_links_in_pages() {
    let mut kennel = Kennel::new();
    kennel.config.delete_page_size = 1;

    let pets = kennel.collection("pets");
    let ctx = kennel.ctx(&DirectFrontDoor);
    let query = term::parse_query([("ownerId", "1")], &kennel.config).unwrap();

    let deleted = write::delete(&ctx, &pets, DeleteTarget::Query(query)).await.unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(kennel.rows("pets").len(), 1);
    assert_eq!(kennel.rows("pet_tags").len(), 1);
    assert_eq!(kennel.connector.calls().delete_records, 2);
}

#[tokio::test]
async fn delete_reports_missing_targets() {
    let kennel = Kennel::new();
    let pets = kennel.collection("pets");
    let ctx = kennel.ctx(&DirectFrontDoor);

    let err = write::delete(&ctx, &pets, DeleteTarget::Keys(vec![EntityKey::new("404")]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let err = write::delete(&ctx, &pets, DeleteTarget::Query(vec![])).await.unwrap_err();
    assert!(err.is_client_error());

    let err = write::delete(&ctx, &pets, DeleteTarget::Hrefs(vec!["http://localhost/owners/1".into()]))
        .await
        .unwrap_err();
    assert!(err.is_client_error());

    let deleted = write::delete(&ctx, &pets, DeleteTarget::Hrefs(vec!["http://localhost/pets/12".into()]))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[derive(Default)]
struct DenyOwners {
    calls: AtomicUsize,
}

#[async_trait]
impl FrontDoor for DenyOwners {
    async fn nested_write(&self, ctx: &RequestContext<'_>, command: NestedWrite) -> query_core::Result<NestedWriteResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(ctx.is_nested());

        if command.collection.name() == "owners" {
            return Err(CoreError::forbidden("owners are read-only here"));
        }

        DirectFrontDoor.nested_write(ctx, command).await
    }
}

#[tokio::test]
async fn nested_writes_go_through_the_front_door() {
    let kennel = Kennel::new();
    let pets = kennel.collection("pets");
    let front_door = DenyOwners::default();
    let ctx = kennel.ctx(&front_door);

    let err = write::upsert(&ctx, &pets, &mut [doc(json!({ "name": "Rex II", "owner": { "name": "Zed" } }))])
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Forbidden(_)));

    let mut documents = vec![doc(json!({ "name": "Rex III", "tags": [{ "label": "new" }] }))];
    write::upsert(&ctx, &pets, &mut documents).await.unwrap();

    assert_eq!(front_door.calls.load(Ordering::SeqCst), 2);
    assert_eq!(documents[0]["tags"][0]["href"], json!("http://localhost/tags/3"));
}
