use liha_core::db::open_db_in_memory;
use liha_core::{
    BaseObjectType, EntityKind, Object, ObjectRepository, ObjectType, ObjectTypeFilter,
    ObjectTypeService, PropertyKind, PropertyType, RepoError, SchemaRepository,
    SqliteObjectRepository, SqliteSchemaRepository, ValidationError, Visibility,
};
use rusqlite::Connection;
use uuid::Uuid;

fn register_type(repo: &SqliteSchemaRepository<'_>, name: &str, base: BaseObjectType) -> Uuid {
    repo.create_object_type(&ObjectType::new(name, base)).expect("object type create")
}

#[test]
fn object_type_create_get_roundtrip() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");

    let mut object_type = ObjectType::new("Book", BaseObjectType::Page);
    object_type.description = "Things to read".to_string();
    object_type.color = "#aa3300".to_string();
    object_type.icon = "book".to_string();
    object_type.fixed = true;
    repo.create_object_type(&object_type).expect("object type create");

    let loaded = repo
        .get_object_type(object_type.id)
        .expect("object type lookup")
        .expect("object type should exist");
    assert_eq!(loaded, object_type);
    assert!(loaded.property_types.is_empty());
}

#[test]
fn object_type_missing_returns_none() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");

    assert!(repo.get_object_type(Uuid::new_v4()).expect("lookup should succeed").is_none());
}

#[test]
fn object_type_duplicate_id_is_constraint_error() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");

    let object_type = ObjectType::new("Task", BaseObjectType::Task);
    repo.create_object_type(&object_type).expect("object type create");

    let err = repo.create_object_type(&object_type).unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));
}

#[test]
fn object_type_short_name_is_rejected_before_sql() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");

    let err = repo
        .create_object_type(&ObjectType::new(" x ", BaseObjectType::Note))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::NameTooShort { min_chars: 2 })
    ));
    assert!(repo
        .list_object_type_ids(&ObjectTypeFilter::default())
        .expect("object type listing should succeed")
        .is_empty());
}

#[test]
fn list_object_type_ids_keeps_registration_order_and_filters() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");

    let tasks = register_type(&repo, "Tasks", BaseObjectType::Task);
    let notes = register_type(&repo, "Notes", BaseObjectType::Note);
    let mut chores = ObjectType::new("Chores", BaseObjectType::Task);
    chores.fixed = true;
    repo.create_object_type(&chores).expect("object type create");

    let all = repo
        .list_object_type_ids(&ObjectTypeFilter::default())
        .expect("object type listing should succeed");
    assert_eq!(all, vec![tasks, notes, chores.id]);

    let task_types = repo
        .list_object_type_ids(&ObjectTypeFilter {
            base_object_type: Some(BaseObjectType::Task),
            fixed: None,
        })
        .expect("object type listing should succeed");
    assert_eq!(task_types, vec![tasks, chores.id]);

    let fixed_tasks = repo
        .list_object_type_ids(&ObjectTypeFilter {
            base_object_type: Some(BaseObjectType::Task),
            fixed: Some(true),
        })
        .expect("object type listing should succeed");
    assert_eq!(fixed_tasks, vec![chores.id]);
}

#[test]
fn update_object_type_rewrites_row_or_reports_not_found() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");

    let mut object_type = ObjectType::new("Movie", BaseObjectType::Video);
    repo.create_object_type(&object_type).expect("object type create");

    object_type.name = "Films".to_string();
    object_type.color = "blue".to_string();
    repo.update_object_type(&object_type).expect("object type update should succeed");
    let loaded = repo
        .get_object_type(object_type.id)
        .expect("object type lookup")
        .expect("object type should exist");
    assert_eq!(loaded.name, "Films");
    assert_eq!(loaded.color, "blue");

    let ghost = ObjectType::new("Ghost", BaseObjectType::Page);
    let err = repo.update_object_type(&ghost).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::ObjectType,
            ..
        }
    ));
}

#[test]
fn property_types_list_in_registration_order() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let task = register_type(&repo, "Task", BaseObjectType::Task);
    let other = register_type(&repo, "Other", BaseObjectType::Page);

    let due = PropertyType::new(task, PropertyKind::Date, "due", "2024-01-01T00:00:00Z");
    let done = PropertyType::new(task, PropertyKind::Boolean, "done", "false");
    let unrelated = PropertyType::new(other, PropertyKind::Text, "notes", "");
    repo.create_property_type(&due).expect("property type create should succeed");
    repo.create_property_type(&unrelated).expect("property type create should succeed");
    repo.create_property_type(&done).expect("property type create should succeed");

    let listed = repo.list_property_types_of(task).expect("property type listing");
    assert_eq!(listed, vec![due.clone(), done.clone()]);
    assert_eq!(
        repo.list_property_type_ids().expect("property type listing"),
        vec![due.id, unrelated.id, done.id]
    );
    assert_eq!(repo.get_property_type(done.id).expect("property type lookup"), Some(done));
}

#[test]
fn reference_property_type_roundtrips_target_and_flag() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let project = register_type(&repo, "Project", BaseObjectType::Page);
    let task = register_type(&repo, "Task", BaseObjectType::Task);

    let mut parent = PropertyType::new(task, PropertyKind::Reference(project), "project", "");
    parent.visibility = Visibility::HiddenEmpty;
    parent.ai_automated = true;
    repo.create_property_type(&parent).expect("property type create should succeed");

    let loaded = repo
        .get_property_type(parent.id)
        .expect("property type lookup")
        .expect("property type should exist");
    assert_eq!(loaded.kind, PropertyKind::Reference(project));
    assert!(loaded.is_object_reference);
    assert_eq!(loaded.visibility, Visibility::HiddenEmpty);
    assert!(loaded.ai_automated);
}

#[test]
fn property_type_with_unknown_owner_is_constraint_error() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");

    let orphan = PropertyType::new(Uuid::new_v4(), PropertyKind::Text, "title", "");
    let err = repo.create_property_type(&orphan).unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));
}

#[test]
fn property_type_reference_flag_must_match_kind() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let task = register_type(&repo, "Task", BaseObjectType::Task);

    let mut broken = PropertyType::new(task, PropertyKind::Number, "points", "0");
    broken.is_object_reference = true;
    let err = repo.create_property_type(&broken).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::ReferenceFlagMismatch(_))
    ));
}

#[test]
fn stored_unknown_kind_fails_listing_with_unsupported_property_type() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let task = register_type(&repo, "Task", BaseObjectType::Task);
    let bogus = insert_raw_property_type(&conn, task, "currency");

    let err = repo.list_property_types_of(task).unwrap_err();
    match err {
        RepoError::UnsupportedPropertyType {
            property_type_id,
            kind,
        } => {
            assert_eq!(property_type_id, bogus);
            assert_eq!(kind, "currency");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn update_property_type_keeps_kind_immutable() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let task = register_type(&repo, "Task", BaseObjectType::Task);

    let mut points = PropertyType::new(task, PropertyKind::Number, "points", "0");
    repo.create_property_type(&points).expect("property type create should succeed");

    points.name = "story points".to_string();
    points.default_value = "3".to_string();
    points.visibility = Visibility::Hidden;
    repo.update_property_type(&points).expect("property type update should succeed");
    assert_eq!(
        repo.get_property_type(points.id).expect("property type lookup"),
        Some(points.clone())
    );

    points.kind = PropertyKind::Text;
    let err = repo.update_property_type(&points).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Immutable {
            entity: EntityKind::PropertyType,
            field: "type",
            ..
        }
    ));

    let ghost = PropertyType::new(task, PropertyKind::Text, "ghost", "");
    assert!(repo.update_property_type(&ghost).unwrap_err().is_not_found());
}

#[test]
fn update_property_type_cannot_move_to_another_object_type() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let task = register_type(&repo, "Task", BaseObjectType::Task);
    let note = register_type(&repo, "Note", BaseObjectType::Note);

    let mut points = PropertyType::new(task, PropertyKind::Number, "points", "0");
    repo.create_property_type(&points).expect("property type create");

    points.object_type_id = Some(note);
    let err = repo.update_property_type(&points).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Immutable {
            entity: EntityKind::PropertyType,
            field: "object_type_id",
            ..
        }
    ));
    let still_owned = repo
        .list_property_types_of(task)
        .expect("property type listing");
    assert_eq!(still_owned, vec![PropertyType {
        object_type_id: Some(task),
        ..points.clone()
    }]);
    assert!(repo
        .list_property_types_of(note)
        .expect("property type listing")
        .is_empty());

    points.object_type_id = None;
    repo.update_property_type(&points).expect("detaching should be allowed");
    assert!(repo
        .list_property_types_of(task)
        .expect("property type listing")
        .is_empty());

    points.object_type_id = Some(task);
    let err = repo.update_property_type(&points).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Immutable {
            field: "object_type_id",
            ..
        }
    ));
}

#[test]
fn reference_property_type_requires_an_existing_target_type() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let task = register_type(&repo, "Task", BaseObjectType::Task);
    let missing = Uuid::new_v4();

    let dangling = PropertyType::new(task, PropertyKind::Reference(missing), "ghostref", "");
    let err = repo.create_property_type(&dangling).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::ObjectType,
            id,
        } if id == missing
    ));
    assert!(repo
        .get_property_type(dangling.id)
        .expect("property type lookup")
        .is_none());

    let service = ObjectTypeService::new(
        SqliteSchemaRepository::try_new(&conn).expect("schema repo should open"),
    );
    let err = service.add_property_type(task, &dangling).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::ObjectType,
            id,
        } if id == missing
    ));

    let project = register_type(&repo, "Project", BaseObjectType::Page);
    let linked = PropertyType::new(task, PropertyKind::Reference(project), "project", "");
    service
        .add_property_type(task, &linked)
        .expect("reference to a registered type should be accepted");
}

#[test]
fn delete_object_type_detaches_property_types() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let task = register_type(&repo, "Task", BaseObjectType::Task);
    let due = PropertyType::new(task, PropertyKind::Date, "due", "");
    repo.create_property_type(&due).expect("property type create should succeed");

    repo.delete_object_type(task).expect("object type delete should succeed");

    assert!(repo.get_object_type(task).expect("lookup should succeed").is_none());
    let detached = repo
        .get_property_type(due.id)
        .expect("property type lookup")
        .expect("property type should exist");
    assert_eq!(detached.object_type_id, None);
    assert!(repo.list_property_types_of(task).expect("property type listing").is_empty());
    assert!(repo.delete_object_type(task).unwrap_err().is_not_found());
}

#[test]
fn delete_object_type_with_objects_is_constraint_error() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let schema = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let objects = SqliteObjectRepository::try_new(&conn).expect("object repo should open");
    let task = register_type(&schema, "Task", BaseObjectType::Task);
    objects
        .create_object(&Object::new(task, "write tests"), &[])
        .expect("object create");

    let err = schema.delete_object_type(task).unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));
    assert!(schema.get_object_type(task).expect("lookup should succeed").is_some());
}

#[test]
fn delete_property_type_removes_its_cells() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let schema = SqliteSchemaRepository::try_new(&conn).expect("schema repo should open");
    let objects = SqliteObjectRepository::try_new(&conn).expect("object repo should open");
    let task = register_type(&schema, "Task", BaseObjectType::Task);
    let done = PropertyType::new(task, PropertyKind::Boolean, "done", "false");
    schema.create_property_type(&done).expect("property type create should succeed");
    let object = Object::new(task, "write tests");
    objects
        .create_object(
            &object,
            &schema
                .list_property_types_of(task)
                .expect("property type listing"),
        )
        .expect("object create");

    schema.delete_property_type(done.id).expect("property type delete should succeed");

    assert!(schema.get_property_type(done.id).expect("property type lookup").is_none());
    let loaded = objects
        .get_object(object.id)
        .expect("object lookup")
        .expect("object should exist");
    assert!(loaded.properties.is_empty());
    assert!(schema.delete_property_type(done.id).unwrap_err().is_not_found());
}

#[test]
fn service_get_object_type_populates_property_types() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = ObjectTypeService::new(
        SqliteSchemaRepository::try_new(&conn).expect("schema repo should open"),
    );

    let object_type = ObjectType::new("Task", BaseObjectType::Task);
    service.create_object_type(&object_type).expect("object type create");
    let due = PropertyType::new(Uuid::new_v4(), PropertyKind::Date, "due", "");
    service.add_property_type(object_type.id, &due).expect("property type add should succeed");

    let loaded = service.get_object_type(object_type.id).expect("object type should load");
    assert_eq!(loaded.property_types.len(), 1);
    assert_eq!(loaded.property_types[0].id, due.id);
    assert_eq!(loaded.property_types[0].object_type_id, Some(object_type.id));
}

#[test]
fn service_reports_missing_entities_as_not_found() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let service = ObjectTypeService::new(
        SqliteSchemaRepository::try_new(&conn).expect("schema repo should open"),
    );
    let missing = Uuid::new_v4();

    let err = service.get_object_type(missing).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::ObjectType,
            id,
        } if id == missing
    ));

    let orphan = PropertyType::new(missing, PropertyKind::Text, "title", "");
    assert!(service
        .add_property_type(missing, &orphan)
        .unwrap_err()
        .is_not_found());
    assert!(service.get_property_type(orphan.id).unwrap_err().is_not_found());
}

fn insert_raw_property_type(conn: &Connection, object_type_id: Uuid, kind: &str) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO property_type (id, type, name, object_type_id) VALUES (?1, ?2, ?3, ?4);",
        rusqlite::params![
            id.to_string(),
            kind,
            "raw",
            object_type_id.to_string()
        ],
    )
    .expect("statement should execute");
    id
}
