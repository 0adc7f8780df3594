use expect_test::expect;
use query_structure::*;
use serde_json::json;
use sql_query_builder::{Context, SqlFamily, SqlQueryBuilder};

fn pets() -> Collection {
    let definition = json!({
        "collections": [{
            "name": "pets",
            "table": "pet",
            "properties": [
                { "name": "id", "type": "number" },
                { "name": "name", "type": "string" },
                { "name": "region", "type": "string" }
            ],
            "primary_index": ["region", "id"]
        }]
    });

    InternalSchema::build(serde_json::from_value(definition).unwrap())
        .unwrap()
        .find_collection("pets")
        .unwrap()
}

fn builder(family: SqlFamily) -> SqlQueryBuilder {
    SqlQueryBuilder::new(Context::new(family))
}

#[test]
fn select_with_filter_order_and_window() {
    let args = QueryArguments::new(pets())
        .with_filter(Filter::and(vec![
            Filter::scalar("name", ScalarCondition::Like("R%".into())),
            Filter::or(vec![
                Filter::equals("id", 1),
                Filter::scalar("id", ScalarCondition::GreaterThan(10.into())),
            ]),
        ]))
        .with_order_by(vec![OrderBy::descending("name")])
        .with_take(Some(20))
        .with_skip(Some(40));

    let query = builder(SqlFamily::Postgres).build_get_records(&args).unwrap();

    expect![[r#"
        SELECT * FROM "pet" WHERE ("name" LIKE $1 AND ("id" = $2 OR "id" > $3)) ORDER BY "name" DESC LIMIT $4 OFFSET $5
        -- params: [String("R%"), Int(1), Int(10), Int(20), Int(40)]"#]]
    .assert_eq(&query.to_string());
}

#[test]
fn composite_key_lookup_and_null_tests() {
    let args = QueryArguments::new(pets()).with_filter(Filter::and(vec![
        Filter::key_in(
            vec!["region".into(), "id".into()],
            vec![vec!["eu".into(), 1.into()], vec!["us".into(), 2.into()]],
        ),
        Filter::scalar("name", ScalarCondition::IsNotNull),
    ]));

    let query = builder(SqlFamily::Mysql).build_get_records(&args).unwrap();

    expect![[r#"
        SELECT * FROM `pet` WHERE ((`region`, `id`) IN ((?, ?), (?, ?)) AND `name` IS NOT NULL)
        -- params: [String("eu"), Int(1), String("us"), Int(2)]"#]]
    .assert_eq(&query.to_string());
}

#[test]
fn values_never_reach_the_sql_text() {
    let args = QueryArguments::new(pets()).with_filter(Filter::equals("name", "x'; drop table pet; --"));
    let query = builder(SqlFamily::Sqlite).build_get_records(&args).unwrap();

    expect![[r#"SELECT * FROM "pet" WHERE "name" = ?"#]].assert_eq(&query.sql);
}

#[test]
fn offset_without_limit() {
    let args = QueryArguments::new(pets()).with_skip(Some(5));

    expect![[r#"SELECT * FROM "pet" LIMIT -1 OFFSET ?"#]]
        .assert_eq(&builder(SqlFamily::Sqlite).build_get_records(&args).unwrap().sql);
}

#[test]
fn update_and_delete() {
    let collection = pets();
    let filter = Filter::not(vec![Filter::scalar(
        "id",
        ScalarCondition::In(vec![1.into(), 2.into()]),
    )]);
    let values: Record = [("name".to_owned(), ResourceValue::Null)].into_iter().collect();

    let update = builder(SqlFamily::Postgres)
        .build_update(&collection, &filter, &values)
        .unwrap();
    let delete = builder(SqlFamily::Postgres).build_delete("pet", &filter).unwrap();

    expect![[r#"
        UPDATE "pet" SET "name" = $1 WHERE NOT ("id" IN ($2, $3))
        -- params: [Null, Int(1), Int(2)]"#]]
    .assert_eq(&update.to_string());

    expect![[r#"
        DELETE FROM "pet" WHERE NOT ("id" IN ($1, $2))
        -- params: [Int(1), Int(2)]"#]]
    .assert_eq(&delete.to_string());
}

#[test]
fn insert_link_rows() {
    let rows: Vec<Record> = vec![
        [("pet_id".to_owned(), 1.into()), ("tag_id".to_owned(), "cute".into())]
            .into_iter()
            .collect(),
        [("pet_id".to_owned(), 2.into()), ("tag_id".to_owned(), "loud".into())]
            .into_iter()
            .collect(),
    ];

    let insert = builder(SqlFamily::Postgres).build_insert("pet_tags", &rows).unwrap();

    expect![[r#"
        INSERT INTO "pet_tags" ("pet_id", "tag_id") VALUES ($1, $2), ($3, $4)
        -- params: [Int(1), String("cute"), Int(2), String("loud")]"#]]
    .assert_eq(&insert.to_string());
}
