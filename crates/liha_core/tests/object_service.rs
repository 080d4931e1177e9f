use chrono::{TimeZone, Utc};
use liha_core::db::open_db_in_memory;
use liha_core::{
    BaseObjectType, CoercionError, EntityKind, EventStatus, NoopObserver, Object, ObjectService,
    ObjectType, ObjectTypeService, PropertyKind, PropertyType, RepoError, SqliteObjectRepository,
    SqliteSchemaRepository, StoreEvent, StoreObserver,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

type SqliteObjectService<'conn> =
    ObjectService<SqliteSchemaRepository<'conn>, SqliteObjectRepository<'conn>>;

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<StoreEvent>>,
}

impl StoreObserver for RecordingObserver {
    fn record(&self, event: &StoreEvent) {
        self.events.lock().expect("observer lock should not be poisoned").push(event.clone());
    }
}

fn services(
    conn: &Connection,
) -> (
    ObjectTypeService<SqliteSchemaRepository<'_>>,
    SqliteObjectService<'_>,
) {
    let types = ObjectTypeService::with_observer(
        SqliteSchemaRepository::try_new(conn).expect("schema repo should open"),
        Arc::new(NoopObserver),
    );
    let objects = ObjectService::with_observer(
        SqliteSchemaRepository::try_new(conn).expect("schema repo should open"),
        SqliteObjectRepository::try_new(conn).expect("object repo should open"),
        Arc::new(NoopObserver),
    );
    (types, objects)
}

struct TaskSchema {
    task: Uuid,
    due: Uuid,
    done: Uuid,
}

fn register_task_schema(types: &ObjectTypeService<SqliteSchemaRepository<'_>>) -> TaskSchema {
    let task = types
        .create_object_type(&ObjectType::new("task", BaseObjectType::Task))
        .expect("object type create");
    let due = types
        .add_property_type(
            task,
            &PropertyType::new(task, PropertyKind::Date, "due", "2024-01-01T00:00:00Z"),
        )
        .expect("property type add should succeed");
    let done = types
        .add_property_type(
            task,
            &PropertyType::new(task, PropertyKind::Boolean, "done", "false"),
        )
        .expect("property type add should succeed");
    TaskSchema { task, due, done }
}

#[test]
fn task_scenario_defaults_then_mark_done() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);

    let id = objects
        .create_object(&Object::new(schema.task, "file taxes"))
        .expect("object create");
    let created = objects.get_object(id).expect("object should load");
    let due_default = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(created.properties[&schema.due].value_date, Some(due_default));
    assert_eq!(created.properties[&schema.done].value_boolean, Some(false));

    let version = objects.set_property_value(id, schema.done, "true").expect("property value set");
    assert_eq!(version, 1);

    let updated = objects.get_object(id).expect("object should load");
    assert_eq!(updated.properties[&schema.done].value_boolean, Some(true));
    assert_eq!(updated.properties[&schema.due].value_date, Some(due_default));
    assert_eq!(updated.version, 1);
}

#[test]
fn set_property_value_rejects_unparsable_input() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);
    let id = objects
        .create_object(&Object::new(schema.task, "file taxes"))
        .expect("object create");

    let err = objects
        .set_property_value(id, schema.due, "next tuesday")
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidValue {
            source: CoercionError::InvalidDefault { .. },
            ..
        }
    ));
    assert_eq!(objects.get_object(id).expect("object should load").version, 0);
}

#[test]
fn set_property_value_requires_a_property_of_the_objects_type() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);
    let note = types
        .create_object_type(&ObjectType::new("note", BaseObjectType::Note))
        .expect("object type create");
    let body = types
        .add_property_type(note, &PropertyType::new(note, PropertyKind::Text, "body", ""))
        .expect("property type add should succeed");
    let id = objects
        .create_object(&Object::new(schema.task, "file taxes"))
        .expect("object create");

    let err = objects.set_property_value(id, body, "text").unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::PropertyType,
            ..
        }
    ));

    let missing = Uuid::new_v4();
    let err = objects
        .set_property_value(missing, schema.done, "true")
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::Object,
            id,
        } if id == missing
    ));
}

#[test]
fn set_property_value_on_object_created_before_the_property_is_not_found() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);
    let id = objects
        .create_object(&Object::new(schema.task, "early"))
        .expect("object create");
    let points = types
        .add_property_type(
            schema.task,
            &PropertyType::new(schema.task, PropertyKind::Number, "points", "0"),
        )
        .expect("property type add should succeed");

    assert!(objects
        .set_property_value(id, points, "5")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn set_property_value_links_references() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);
    let blocker = types
        .add_property_type(
            schema.task,
            &PropertyType::new(
                schema.task,
                PropertyKind::Reference(schema.task),
                "blocked by",
                "",
            ),
        )
        .expect("property type add should succeed");

    let first = objects
        .create_object(&Object::new(schema.task, "first"))
        .expect("object create");
    let second = objects
        .create_object(&Object::new(schema.task, "second"))
        .expect("object create");
    objects
        .set_property_value(second, blocker, &first.to_string())
        .expect("property value set");
    assert_eq!(
        objects
            .get_object(second)
            .expect("object should load")
            .properties[&blocker]
            .referenced_object_id,
        Some(first)
    );

    objects.set_property_value(second, blocker, "").expect("property value set");
    assert_eq!(
        objects
            .get_object(second)
            .expect("object should load")
            .properties[&blocker]
            .referenced_object_id,
        None
    );
}

#[test]
fn set_property_value_rejects_references_to_other_types() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);
    let note = types
        .create_object_type(&ObjectType::new("note", BaseObjectType::Note))
        .expect("object type create");
    let blocker = types
        .add_property_type(
            schema.task,
            &PropertyType::new(
                schema.task,
                PropertyKind::Reference(schema.task),
                "blocked by",
                "",
            ),
        )
        .expect("property type add should succeed");

    let task = objects
        .create_object(&Object::new(schema.task, "ship it"))
        .expect("object create");
    let memo = objects
        .create_object(&Object::new(note, "memo"))
        .expect("object create");

    let err = objects
        .set_property_value(task, blocker, &memo.to_string())
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ReferenceTypeMismatch {
            property_type_id,
            object_id,
            expected,
            actual,
        } if property_type_id == blocker
            && object_id == memo
            && expected == schema.task
            && actual == note
    ));

    let missing = Uuid::new_v4();
    let err = objects
        .set_property_value(task, blocker, &missing.to_string())
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::Object,
            id,
        } if id == missing
    ));

    let stored = objects.get_object(task).expect("object should load");
    assert_eq!(stored.version, 0);
    assert_eq!(stored.properties[&blocker].referenced_object_id, None);
}

#[test]
fn create_with_unsupported_stored_kind_leaves_no_rows() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);
    conn.execute(
        "INSERT INTO property_type (id, type, name, object_type_id) VALUES (?1, 'money', 'cost', ?2);",
        [Uuid::new_v4().to_string(), schema.task.to_string()],
    )
    .expect("statement should execute");

    let object = Object::new(schema.task, "doomed");
    let err = objects.create_object(&object).unwrap_err();
    assert!(matches!(
        err,
        RepoError::UnsupportedPropertyType { ref kind, .. } if kind == "money"
    ));

    let object_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM object;", [], |row| row.get(0))
        .expect("query should return a row");
    let property_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM property;", [], |row| row.get(0))
        .expect("query should return a row");
    assert_eq!((object_rows, property_rows), (0, 0));
}

#[test]
fn missing_object_reads_and_writes_are_not_found() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);
    let missing = Uuid::new_v4();

    assert!(objects.get_object(missing).unwrap_err().is_not_found());
    assert!(objects.delete_object(missing).unwrap_err().is_not_found());
    assert!(objects
        .add_new_content_to_object(missing, "hello")
        .unwrap_err()
        .is_not_found());
    assert!(objects
        .update_object(&Object::with_id(missing, schema.task, "ghost"))
        .unwrap_err()
        .is_not_found());
}

#[test]
fn listing_recency_and_content_go_through_the_facade() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, objects) = services(&conn);
    let schema = register_task_schema(&types);

    let a = objects.create_object(&Object::new(schema.task, "a")).expect("object create");
    let b = objects.create_object(&Object::new(schema.task, "b")).expect("object create");
    assert_eq!(objects.get_all_object_ids().expect("object listing should succeed"), vec![a, b]);
    assert_eq!(
        objects.get_recent_objects_of_type(schema.task).expect("recency lookup"),
        vec![b, a]
    );

    let block = objects.add_new_content_to_object(a, "from the assistant").expect("content append");
    assert_eq!(
        objects.get_recent_objects_of_type(schema.task).expect("recency lookup"),
        vec![a, b]
    );
    assert_eq!(
        objects.get_object(a).expect("object should load").contents[&block].content,
        "from the assistant"
    );

    objects.delete_object(b).expect("object delete should succeed");
    assert_eq!(objects.get_all_object_ids().expect("object listing should succeed"), vec![a]);
}

#[test]
fn observer_receives_ok_and_error_events() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let (types, _) = services(&conn);
    let schema = register_task_schema(&types);
    let observer = Arc::new(RecordingObserver::default());
    let objects = ObjectService::with_observer(
        SqliteSchemaRepository::try_new(&conn).expect("schema repo should open"),
        SqliteObjectRepository::try_new(&conn).expect("object repo should open"),
        observer.clone(),
    );

    let id = objects
        .create_object(&Object::new(schema.task, "observed"))
        .expect("object create");
    let missing = Uuid::new_v4();
    objects.get_object(missing).unwrap_err();

    let events = observer.events.lock().expect("observer lock should not be poisoned");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name, "object_create");
    assert_eq!(events[0].status, EventStatus::Ok);
    assert_eq!(events[0].id, Some(id));
    assert_eq!(events[1].name, "object_get");
    assert_eq!(events[1].status, EventStatus::Error);
    let message = events[1]
        .error
        .as_deref()
        .expect("error events carry a message");
    assert!(message.contains("not found"));
}
