use proptest::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::{
    expr::{function, CaseBuilder, Expression},
    memory::MemoryStore,
    query::{Entity, Projection, ProjectionError, Query},
    schema::{SchemaProvider, Source, TableMetadata},
    session::{ExecutionError, QueryError, Session, SessionConfig},
    storage::{Row, Storage, StorageError},
    translator::{SqlDialect, Statement},
};

fn store() -> MemoryStore {
    let store = MemoryStore::new();
    store.create_table("team").unwrap();
    store.create_table("member").unwrap();
    store.insert_batch("team", json!([{ "name": "teamA" }, { "name": "teamB" }])).unwrap();
    store.insert_batch("member", json!([
        { "username": "member1", "age": 10, "team_id": 1 },
        { "username": "member2", "age": 20, "team_id": 1 },
        { "username": "member3", "age": 30, "team_id": 2 },
        { "username": "member4", "age": 40, "team_id": 2 },
    ])).unwrap();
    store.relate("member", "team", "team_id", "team", "id").unwrap();
    store
}

fn session() -> Session<MemoryStore> {
    Session::new(store())
}

fn member() -> Source { Source::new("member", "m") }
fn team() -> Source { Source::new("team", "t") }
fn username(m: &Source) -> Expression<String> { m.column("username") }
fn age(m: &Source) -> Expression<i64> { m.column("age") }

fn names(entities: &[Entity]) -> Vec<String> {
    entities.iter().map(|e| e.get_as::<String>("username").unwrap()).collect()
}

#[test]
fn fetch_one_by_username() {
    let mut s = session();
    let m = member();
    let q = Query::select_from(&m).filter(username(&m).eq("member1")).build().unwrap();
    let found = s.fetch_one(&q).unwrap().unwrap();
    assert_eq!(found.get_as::<i64>("age").unwrap(), 10);
}

#[test]
fn fetch_one_distinguishes_empty_from_non_unique() {
    let mut s = session();
    let m = member();
    let none = Query::select_from(&m).filter(username(&m).eq("nobody")).build().unwrap();
    assert!(s.fetch_one(&none).unwrap().is_none());
    assert!(s.fetch_list(&none).unwrap().is_empty());

    let all = Query::select_from(&m).build().unwrap();
    assert!(matches!(s.fetch_one(&all), Err(QueryError::NonUniqueResult { rows: 4 })));
}

fn search(s: &mut Session<MemoryStore>, wanted_name: Option<&str>, wanted_age: Option<i64>) -> Vec<String> {
    let m = member();
    let q = Query::select_from(&m)
        .filter_all([
            wanted_name.map(|n| username(&m).eq(n)),
            wanted_age.map(|a| age(&m).eq(a)),
        ])
        .build()
        .unwrap();
    names(&s.fetch_list(&q).unwrap())
}

#[test]
fn absent_search_conditions_are_skipped() {
    let mut s = session();
    assert_eq!(search(&mut s, Some("member1"), Some(10)), vec!["member1"]);
    assert_eq!(search(&mut s, Some("member1"), None), vec!["member1"]);
    assert_eq!(search(&mut s, None, Some(20)), vec!["member2"]);
    assert!(search(&mut s, Some("member1"), Some(20)).is_empty());
    assert_eq!(search(&mut s, None, None).len(), 4);
}

#[test]
fn sort_with_nulls_last() {
    let mut s = session();
    s.storage().insert_batch("member", json!([
        { "username": null, "age": 100 },
        { "username": "member5", "age": 100 },
        { "username": "member6", "age": 100 },
    ])).unwrap();
    let m = member();
    let q = Query::select(username(&m).nullable())
        .from(&m)
        .filter(age(&m).eq(100))
        .order_by(age(&m).desc())
        .order_by(username(&m).asc().nulls_last())
        .build()
        .unwrap();
    assert_eq!(
        s.fetch_list(&q).unwrap(),
        vec![Some("member5".to_string()), Some("member6".to_string()), None]
    );
}

#[test]
fn paging_reports_total_independent_of_window() {
    let mut s = session();
    let m = member();
    let q = Query::select(&username(&m)).from(&m).order_by(username(&m).desc()).build().unwrap();
    let page = s.fetch_page(&q, 1, 2).unwrap();
    assert_eq!(page.items, vec!["member3", "member2"]);
    assert_eq!(page.total, 4);
    assert!(page.has_next());
    assert_eq!(s.fetch_count(&q).unwrap(), 4);
}

#[test]
fn fetch_first_follows_ordering() {
    let mut s = session();
    let m = member();
    let q = Query::select(&username(&m)).from(&m).order_by(age(&m).desc()).build().unwrap();
    assert_eq!(s.fetch_first(&q).unwrap().as_deref(), Some("member4"));
}

#[test]
fn fetch_first_keeps_a_zero_limit() {
    let mut s = session();
    let m = member();
    let q = Query::select(&username(&m)).from(&m).order_by(age(&m).desc()).limit(0).build().unwrap();
    assert_eq!(s.fetch_first(&q).unwrap(), None);
    assert!(s.fetch_list(&q).unwrap().is_empty());
}

#[test]
fn default_ordering_puts_nulls_first() {
    let mut s = session();
    s.storage().insert("member", json!({ "username": "member5", "team_id": 2 })).unwrap();
    let m = member();
    let asc = Query::select(age(&m).nullable()).from(&m).order_by(age(&m).asc()).build().unwrap();
    assert_eq!(s.fetch_first(&asc).unwrap(), Some(None));
    let desc = Query::select(age(&m).nullable()).from(&m).order_by(age(&m).desc()).build().unwrap();
    assert_eq!(s.fetch_list(&desc).unwrap(), vec![None, Some(40), Some(30), Some(20), Some(10)]);
}

/// Answers every statement with the same rows, over the fixture's metadata.
struct CannedStore {
    inner: MemoryStore,
    rows: Vec<Row>,
}

impl SchemaProvider for CannedStore {
    fn table_metadata(&self, table: &str) -> Result<Option<TableMetadata>, StorageError> {
        self.inner.table_metadata(table)
    }
}

impl Storage for CannedStore {
    fn execute(&self, _: &Statement) -> Result<Vec<Row>, StorageError> { Ok(self.rows.clone()) }
    fn execute_mutation(&self, _: &Statement) -> Result<u64, StorageError> { Ok(0) }
    fn begin_unit_of_work(&self) -> Result<(), StorageError> { Ok(()) }
    fn commit(&self) -> Result<(), StorageError> { Ok(()) }
    fn rollback(&self) -> Result<(), StorageError> { Ok(()) }
}

#[test]
fn malformed_count_row_is_a_projection_error() {
    let m = member();
    let q = Query::select_from(&m).build().unwrap();

    let bad = Row::from_iter([("count".to_string(), json!("four"))]);
    let mut s = Session::new(CannedStore { inner: store(), rows: vec![bad] });
    assert!(matches!(
        s.fetch_count(&q),
        Err(QueryError::Execution(ExecutionError::Projection { source: ProjectionError::TypeMismatch { .. }, .. }))
    ));

    let mut s = Session::new(CannedStore { inner: store(), rows: Vec::new() });
    assert!(matches!(
        s.fetch_count(&q),
        Err(QueryError::Execution(ExecutionError::Projection { source: ProjectionError::MissingColumn { .. }, .. }))
    ));
}

#[test]
fn aggregates_over_all_members() {
    let mut s = session();
    let m = member();
    let a = age(&m);
    let (count, sum, avg, max, min) = (m.count(), a.sum(), a.avg(), a.max(), a.min());
    let q = Query::select(Projection::tuple((&count, &sum, &avg, &max, &min))).from(&m).build().unwrap();
    let row = s.fetch_one(&q).unwrap().unwrap();
    assert_eq!(row.get(&count).unwrap(), 4);
    assert_eq!(row.get(&sum).unwrap(), 100);
    assert_eq!(row.get(&avg).unwrap(), 25.0);
    assert_eq!(row.get(&max).unwrap(), 40);
    assert_eq!(row.get(&min).unwrap(), 10);
}

#[test]
fn average_age_per_team() {
    let mut s = session();
    let (m, t) = (member(), team());
    let team_name = t.column::<String>("name");
    let avg = age(&m).avg();
    let q = Query::select(Projection::tuple((&team_name, &avg)))
        .from(&m)
        .join(m.relation("team"), &t)
        .group_by(&team_name)
        .order_by(team_name.asc())
        .build()
        .unwrap();
    let rows = s.fetch_list(&q).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get(&team_name).unwrap(), "teamA");
    assert_eq!(rows[0].get(&avg).unwrap(), 15.0);
    assert_eq!(rows[1].get(&team_name).unwrap(), "teamB");
    assert_eq!(rows[1].get(&avg).unwrap(), 35.0);
}

#[test]
fn having_filters_groups() {
    let mut s = session();
    let (m, t) = (member(), team());
    let team_name = t.column::<String>("name");
    let q = Query::select(&team_name)
        .from(&m)
        .join(m.relation("team"), &t)
        .group_by(&team_name)
        .having(age(&m).avg().gt(20.0))
        .build()
        .unwrap();
    assert_eq!(s.fetch_list(&q).unwrap(), vec!["teamB"]);
}

#[test]
fn join_filters_on_related_table() {
    let mut s = session();
    let (m, t) = (member(), team());
    let q = Query::select_from(&m)
        .join(m.relation("team"), &t)
        .filter(t.column::<String>("name").eq("teamA"))
        .build()
        .unwrap();
    assert_eq!(names(&s.fetch_list(&q).unwrap()), vec!["member1", "member2"]);
}

#[test]
fn theta_join_matches_unrelated_columns() {
    let mut s = session();
    s.storage().insert_batch("member", json!([
        { "username": "teamA", "age": 0 },
        { "username": "teamB", "age": 0 },
        { "username": "teamC", "age": 0 },
    ])).unwrap();
    let (m, t) = (member(), team());
    let q = Query::select_from(&m)
        .from(&t)
        .filter(username(&m).eq(&t.column::<String>("name")))
        .build()
        .unwrap();
    assert_eq!(names(&s.fetch_list(&q).unwrap()), vec!["teamA", "teamB"]);
}

#[test]
fn left_join_with_on_keeps_unmatched_members() {
    let mut s = session();
    let (m, t) = (member(), team());
    let q = Query::select(Projection::tuple((&m, &t)))
        .from(&m)
        .left_join(m.relation("team"), &t)
        .on(t.column::<String>("name").eq("teamA"))
        .build()
        .unwrap();
    let rows = s.fetch_list(&q).unwrap();
    assert_eq!(rows.len(), 4);
    let teams: Vec<Option<String>> = rows.iter()
        .map(|r| r.entity(&t).map(|e| e.get_as::<String>("name").unwrap()))
        .collect();
    assert_eq!(teams, vec![Some("teamA".into()), Some("teamA".into()), None, None]);
}

#[test]
fn unrelated_left_join_on_name() {
    let mut s = session();
    s.storage().insert("member", json!({ "username": "teamA", "age": 0 })).unwrap();
    let (m, t) = (member(), team());
    let q = Query::select(Projection::tuple((&m, &t)))
        .from(&m)
        .left_join_unrelated(&t)
        .on(username(&m).eq(&t.column::<String>("name")))
        .build()
        .unwrap();
    let rows = s.fetch_list(&q).unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows.iter().filter(|r| r.entity(&t).is_some()).count(), 1);
}

#[test]
fn fetch_join_loads_related_entity() {
    let mut s = session();
    let (m, t) = (member(), team());
    let rel = m.relation("team");
    let fetched = Query::select_from(&m)
        .join(rel.clone(), &t)
        .fetch_join()
        .filter(username(&m).eq("member1"))
        .build()
        .unwrap();
    let found = s.fetch_one(&fetched).unwrap().unwrap();
    assert!(found.is_loaded(&rel));
    assert_eq!(found.related(&rel).unwrap().get_as::<String>("name").unwrap(), "teamA");

    let plain = Query::select_from(&m)
        .join(rel.clone(), &t)
        .filter(username(&m).eq("member1"))
        .build()
        .unwrap();
    let found = s.fetch_one(&plain).unwrap().unwrap();
    assert!(!found.is_loaded(&rel));
}

#[test]
fn scalar_subqueries_in_filter_and_projection() {
    let mut s = session();
    let (m, sub) = (member(), Source::new("member", "ms"));

    let oldest = Query::select(age(&sub).max()).from(&sub).subquery();
    let q = Query::select_from(&m).filter(age(&m).eq(oldest)).build().unwrap();
    assert_eq!(names(&s.fetch_list(&q).unwrap()), vec!["member4"]);

    let average = Query::select(age(&sub).avg()).from(&sub).subquery();
    let q = Query::select_from(&m).filter(age(&m).goe(&average)).build().unwrap();
    assert_eq!(names(&s.fetch_list(&q).unwrap()), vec!["member3", "member4"]);

    let avg_col = average.alias("avg_age");
    let q = Query::select(Projection::tuple((&username(&m), avg_col))).from(&m).build().unwrap();
    let rows = s.fetch_list(&q).unwrap();
    assert!(rows.iter().all(|r| r.get_by_label::<f64>("avg_age").unwrap() == 25.0));
}

#[test]
fn in_subquery_and_correlation() {
    let mut s = session();
    let (m, sub) = (member(), Source::new("member", "ms"));

    let over_ten = Query::select(&age(&sub)).from(&sub).filter(age(&sub).gt(10)).subquery();
    let q = Query::select_from(&m).filter(age(&m).in_subquery(&over_ten)).build().unwrap();
    assert_eq!(s.fetch_list(&q).unwrap().len(), 3);

    let team_avg = Query::select(age(&sub).avg())
        .from(&sub)
        .filter(sub.column::<i64>("team_id").eq(&m.column::<i64>("team_id")))
        .subquery();
    let q = Query::select_from(&m).filter(age(&m).gt(team_avg)).build().unwrap();
    assert_eq!(names(&s.fetch_list(&q).unwrap()), vec!["member2", "member4"]);
}

#[test]
fn scalar_subquery_with_many_rows_fails() {
    let mut s = session();
    let (m, sub) = (member(), Source::new("member", "ms"));
    let ages = Query::select(&age(&sub)).from(&sub).subquery();
    let q = Query::select_from(&m).filter(age(&m).eq(ages)).build().unwrap();
    let err = s.fetch_list(&q).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Execution(ExecutionError::Storage { source: StorageError::SubqueryCardinality { rows: 4 }, .. })
    ));
}

#[test]
fn case_expressions() {
    let mut s = session();
    let m = member();
    let simple = age(&m).when(10).then("ten").when(20).then("twenty").otherwise("other");
    let q = Query::select(&simple).from(&m).order_by(age(&m).asc()).build().unwrap();
    assert_eq!(s.fetch_list(&q).unwrap(), vec!["ten", "twenty", "other", "other"]);

    let rank = CaseBuilder::when(age(&m).between(0, 20)).then(2)
        .when(age(&m).between(21, 30)).then(1)
        .otherwise(3);
    let q = Query::select(Projection::tuple((&username(&m), &rank)))
        .from(&m)
        .order_by(rank.desc())
        .build()
        .unwrap();
    let ordered: Vec<String> = s.fetch_list(&q).unwrap().iter().map(|r| r.get(&username(&m)).unwrap()).collect();
    assert_eq!(ordered, vec!["member4", "member1", "member2", "member3"]);
}

#[test]
fn string_functions_and_concat() {
    let mut s = session();
    let m = member();
    let label = username(&m).concat("_").concat(age(&m).string_value());
    let q = Query::select(&label).from(&m).filter(username(&m).eq("member1")).build().unwrap();
    assert_eq!(s.fetch_one(&q).unwrap().as_deref(), Some("member1_10"));

    let replaced = function::<String>("replace", vec![
        username(&m).into_node(),
        crate::expr::ScalarExpr::literal("member"),
        crate::expr::ScalarExpr::literal("M"),
    ]);
    let q = Query::select(&replaced).from(&m).order_by(age(&m).asc()).limit(1).build().unwrap();
    assert_eq!(s.fetch_list(&q).unwrap(), vec!["M1"]);

    let q = Query::select(&username(&m))
        .from(&m)
        .filter(username(&m).eq(&username(&m).lower()))
        .build()
        .unwrap();
    assert_eq!(s.fetch_list(&q).unwrap().len(), 4);
}

#[test]
fn distinct_usernames() {
    let mut s = session();
    s.storage().insert("member", json!({ "username": "member1", "age": 99 })).unwrap();
    let m = member();
    let q = Query::select(&username(&m)).from(&m).distinct().build().unwrap();
    assert_eq!(s.fetch_list(&q).unwrap().len(), 4);
    assert_eq!(s.fetch_count(&q).unwrap(), 4);
}

#[derive(Debug, Default, Deserialize, PartialEq)]
struct MemberDto {
    username: String,
    age: i64,
}

#[test]
fn dto_projections() {
    let mut s = session();
    let m = member();
    let only_first = username(&m).eq("member1");

    let by_constructor = Query::select(Projection::constructor(
        (username(&m), age(&m)),
        |(username, age)| MemberDto { username, age },
    ))
    .from(&m)
    .filter(only_first.clone())
    .build()
    .unwrap();

    let by_fields = Query::select(Projection::<MemberDto>::fields((username(&m), age(&m))))
        .from(&m)
        .filter(only_first.clone())
        .build()
        .unwrap();

    let by_setters = Query::select(
        Projection::bean(MemberDto::default)
            .set(username(&m), |d: &mut MemberDto, v| d.username = v)
            .set(age(&m), |d: &mut MemberDto, v| d.age = v),
    )
    .from(&m)
    .filter(only_first)
    .build()
    .unwrap();

    let expected = MemberDto { username: "member1".into(), age: 10 };
    assert_eq!(s.fetch_one(&by_constructor).unwrap().unwrap(), expected);
    assert_eq!(s.fetch_one(&by_fields).unwrap().unwrap(), expected);
    assert_eq!(s.fetch_one(&by_setters).unwrap().unwrap(), expected);
}

#[test]
fn entity_deserializes_into_model() {
    let mut s = session();
    let m = member();
    let q = Query::select(Projection::<MemberDto>::entity_as(&m))
        .from(&m)
        .order_by(age(&m).desc())
        .build()
        .unwrap();
    assert_eq!(s.fetch_first(&q).unwrap().unwrap(), MemberDto { username: "member4".into(), age: 40 });
}

#[test]
fn bulk_mutations_report_affected_rows() {
    let mut s = session();
    let m = member();

    let rename = Query::update(&m).set(&username(&m), "guest").filter(age(&m).lt(28)).build().unwrap();
    assert_eq!(s.execute_mutation(&rename).unwrap(), 2);

    let bump = Query::update(&m).set(&age(&m), age(&m).add(1)).build().unwrap();
    assert_eq!(s.execute_mutation(&bump).unwrap(), 4);

    let q = Query::select(&age(&m)).from(&m).order_by(age(&m).asc()).build().unwrap();
    assert_eq!(s.fetch_list(&q).unwrap(), vec![11, 21, 31, 41]);

    let guests = Query::select(&username(&m)).from(&m).filter(username(&m).eq("guest")).build().unwrap();
    assert_eq!(s.fetch_count(&guests).unwrap(), 2);

    let purge = Query::delete(&m).filter(age(&m).gt(18)).build().unwrap();
    assert_eq!(s.execute_mutation(&purge).unwrap(), 3);
    assert_eq!(s.storage().count("member").unwrap(), 1);
}

#[test]
fn unit_of_work_rolls_back_on_error_and_drop() {
    let mut s = session();
    let m = member();
    let purge = Query::delete(&m).build().unwrap();

    let outcome: Result<(), QueryError> = s.unit_of_work(|tx| {
        tx.execute_mutation(&purge)?;
        Err(QueryError::NonUniqueResult { rows: 0 })
    });
    assert!(outcome.is_err());
    assert_eq!(s.storage().count("member").unwrap(), 4);

    {
        let mut uow = s.begin().unwrap();
        uow.execute_mutation(&purge).unwrap();
    }
    assert_eq!(s.storage().count("member").unwrap(), 4);

    let uow = s.begin().unwrap();
    uow.rollback().unwrap();

    let committed: Result<u64, QueryError> = s.unit_of_work(|tx| tx.execute_mutation(&purge));
    assert_eq!(committed.unwrap(), 4);
    assert_eq!(s.storage().count("member").unwrap(), 0);
}

#[test]
fn mysql_session_renders_null_ordering_key() {
    let s = Session::with_config(store(), SessionConfig::new(SqlDialect::MySql));
    let m = member();
    let q = Query::select(&age(&m)).from(&m).order_by(age(&m).desc().nulls_last()).build().unwrap();
    let statement = s.select_statement(&q).unwrap();
    assert!(statement.sql.ends_with("ORDER BY CASE WHEN `m`.`age` IS NULL THEN 1 ELSE 0 END, `m`.`age` DESC"));
}

#[test]
fn unknown_table_fails_before_storage() {
    let mut s = session();
    let ghost = Source::new("ghost", "g");
    let q = Query::select_from(&ghost).build().unwrap();
    assert!(matches!(s.fetch_list(&q), Err(QueryError::Translation(_))));
}

proptest! {
    #[test]
    fn page_window_and_total(offset in 0u64..8, limit in 0u64..8) {
        let mut s = session();
        let m = member();
        let q = Query::select(&age(&m)).from(&m).order_by(age(&m).asc()).build().unwrap();
        let page = s.fetch_page(&q, offset, limit).unwrap();
        let expected = limit.min(4u64.saturating_sub(offset)) as usize;
        prop_assert_eq!(page.items.len(), expected);
        prop_assert_eq!(page.total, 4);
        let all = s.fetch_list(&q).unwrap();
        let window: Vec<i64> = all.into_iter().skip(offset as usize).take(limit as usize).collect();
        prop_assert_eq!(page.items, window);
    }

    #[test]
    fn repeated_fetches_are_identical(min_age in 0i64..50) {
        let mut s = session();
        let m = member();
        let q = Query::select(&username(&m)).from(&m).filter(age(&m).goe(min_age)).build().unwrap();
        let first = s.fetch_list(&q).unwrap();
        prop_assert_eq!(s.fetch_list(&q).unwrap(), first.clone());
        prop_assert_eq!(s.fetch_count(&q).unwrap(), first.len() as u64);
    }
}
