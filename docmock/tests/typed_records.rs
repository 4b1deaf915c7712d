use bson::oid::ObjectId;
use chrono::{TimeZone, Utc};
use docmock::{doc, memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    #[serde(rename = "emailAddress")]
    email: String,
    age: i64,
    tags: Vec<String>,
    joined: bson::DateTime,
}

impl Record for User {
    fn collection_name() -> &'static str {
        "users"
    }
}

fn user(name: &str, age: i64, tags: &[&str]) -> User {
    User {
        id: ObjectId::new(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        age,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        joined: bson::DateTime::from_chrono(Utc.with_ymd_and_hms(2023, 6, 1, 9, 0, 0).unwrap()),
    }
}

fn store_with(users: &[User]) -> DocumentStore<InMemoryStore> {
    let store = DocumentStore::new(InMemoryStore::new());
    store.typed_collection::<User>().insert(users.to_vec()).unwrap();
    store
}

#[test]
fn insert_then_find_by_id_round_trips() {
    let alice = user("Alice", 30, &["admin"]);
    let store = store_with(&[alice.clone(), user("Bob", 17, &[])]);
    let users = store.typed_collection::<User>();

    let found = users.find(Filter::id(alice.id)).unwrap();
    assert_eq!(found, vec![alice.clone()]);
    assert_eq!(users.find_by_id(alice.id).unwrap(), Some(alice));
    assert_eq!(users.find_by_id(ObjectId::new()).unwrap(), None);
}

#[test]
fn renamed_fields_are_queried_by_their_stored_names() {
    let store = store_with(&[user("Alice", 30, &["admin", "ops"])]);
    let users = store.typed_collection::<User>();

    assert_eq!(users.count(doc! { "emailAddress": "alice@example.com" }).unwrap(), 1);
    assert_eq!(users.count(doc! { "email": "alice@example.com" }).unwrap(), 0);
    assert_eq!(users.count(doc! { "tags": "ops" }).unwrap(), 1);
    assert_eq!(users.count(Filter::all("tags", ["ops", "admin"])).unwrap(), 1);
}

#[test]
fn timestamps_are_stored_and_compared_chronologically() {
    let store = store_with(&[user("Alice", 30, &[])]);
    let users = store.typed_collection::<User>();

    let cutoff = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(users.count(Filter::gt("joined", cutoff)).unwrap(), 1);
    assert_eq!(users.count(Filter::lt("joined", cutoff)).unwrap(), 0);
    assert_eq!(users.count(Filter::type_of("joined", "date")).unwrap(), 1);
}

#[test]
fn update_and_replace_by_identifier() {
    let alice = user("Alice", 30, &[]);
    let bob = user("Bob", 17, &[]);
    let store = store_with(&[alice.clone(), bob.clone()]);
    let users = store.typed_collection::<User>();

    users
        .update_first(Filter::id(alice.id), Update::new().set("age", 31).set("tags.0", "admin"))
        .unwrap();
    let updated = users.find_by_id(alice.id).unwrap().unwrap();
    assert_eq!(updated.age, 31);
    assert_eq!(updated.tags, vec!["admin"]);

    let renamed = User { name: "Robert".into(), ..bob.clone() };
    users.replace_by_id(bob.id, &renamed).unwrap();
    assert_eq!(users.find_by_id(bob.id).unwrap(), Some(renamed));
}

#[test]
fn update_without_match_reports_not_found() {
    let store = store_with(&[user("Alice", 30, &[])]);
    let users = store.typed_collection::<User>();

    let err = users
        .update_first(doc! { "name": "Nobody" }, Update::new().set("age", 1))
        .unwrap_err();
    assert!(err.is_not_found());

    let err = users.replace_first(doc! { "name": "Nobody" }, &user("X", 1, &[])).unwrap_err();
    assert!(matches!(err, DocumentStoreError::DocumentNotFound(collection) if collection == "users"));
}

#[test]
fn update_all_counts_every_match() {
    let store = store_with(&[user("Alice", 30, &[]), user("Bob", 17, &[]), user("Carol", 45, &[])]);
    let users = store.typed_collection::<User>();

    let count = users
        .update_all(Filter::gte("age", 18), Update::new().set("tags", vec!["adult"]))
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(users.count(doc! { "tags": "adult" }).unwrap(), 2);
}

#[test]
fn typed_cursor_yields_records_once() {
    let store = store_with(&[user("Alice", 30, &[]), user("Bob", 17, &[]), user("Carol", 45, &[])]);
    let users = store.typed_collection::<User>();

    let mut cursor = users.cursor(Filter::gt("age", 18)).unwrap();
    let names = cursor
        .by_ref()
        .map(|record| record.map(|user| user.name))
        .collect::<DocumentStoreResult<Vec<_>>>()
        .unwrap();

    assert_eq!(names, vec!["Alice", "Carol"]);
    assert!(cursor.next().is_none());
}

#[test]
fn mismatched_documents_fail_to_convert() {
    let store = store_with(&[]);
    store.collection("users").insert(vec![doc! { "name": 5 }]).unwrap();

    let err = store.typed_collection::<User>().find(Query::new()).unwrap_err();
    assert!(matches!(err, DocumentStoreError::Conversion(_)));
}
