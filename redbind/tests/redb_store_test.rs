use redbind::*;

#[derive(Default)]
struct Note {
    core: ObjectCore,
    title: Persisted<String>,
    pinned: Persisted<bool>,
    words: Persisted<List<String>>,
    author: Persisted<Option<Ref<Author>>>,
}

impl Model for Note {
    const CLASS_NAME: &'static str = "Note";

    fn declare_properties(&self, builder: &mut SchemaBuilder) -> Result<(), BindError> {
        builder.property("title", &self.title)?;
        builder.property("pinned", &self.pinned)?;
        builder.property("words", &self.words)?;
        builder.property("author", &self.author)
    }
}

struct Author {
    core: ObjectCore,
    name: Persisted<String>,
    notes: Persisted<Backlinks<Note>>,
}

impl Default for Author {
    fn default() -> Self {
        Author {
            core: ObjectCore::default(),
            name: Persisted::new(),
            notes: Persisted::backlink("author"),
        }
    }
}

impl Model for Author {
    const CLASS_NAME: &'static str = "Author";

    fn declare_properties(&self, builder: &mut SchemaBuilder) -> Result<(), BindError> {
        builder.property("name", &self.name)?;
        builder.property("notes", &self.notes)
    }
}

fn attach_note(store: &RedbStore, title: &str, author: Option<RowId>) -> (Note, RowId) {
    let schema = register_schema::<Note>().expect("Failed to register schema");
    let row = store.create_row("Note").expect("Failed to create row");
    let id = row.id();
    let mut note = Note::default();
    note.title = Persisted::with_value(title.to_string());
    note.author = Persisted::with_value(author.map(Ref::new));
    note.core.bind(ObjectHandle::new(row, schema.clone()));
    note.title.promote(&note.core, schema.property_at(0), 0).expect("Failed to promote title");
    note.pinned.promote(&note.core, schema.property_at(1), 1).expect("Failed to promote pinned");
    note.words.promote(&note.core, schema.property_at(2), 2).expect("Failed to promote words");
    note.author.promote(&note.core, schema.property_at(3), 3).expect("Failed to promote author");
    (note, id)
}

#[test]
fn it_should_assign_increasing_row_ids() {
    let store = RedbStore::temp("row_ids").expect("Failed to open database");
    let first = store.create_row("Note").expect("Failed to create row");
    let second = store.create_row("Note").expect("Failed to create row");
    assert_eq!(first.id(), RowId(1));
    assert_eq!(second.id(), RowId(2));
    assert_eq!(first.class_name(), "Note");
}

#[test]
fn it_should_persist_scalar_cells() {
    let store = RedbStore::temp("scalars").expect("Failed to open database");
    let (mut note, _) = attach_note(&store, "groceries", None);

    note.pinned.set(&note.core, true).expect("Failed to set pinned");
    assert!(note.pinned.get(&note.core).unwrap());
    assert_eq!(note.title.get(&note.core).unwrap(), "groceries");

    let row = note.core.handle().expect("Note must be managed").row().clone();
    row.clear(0).expect("Failed to clear title");
    assert_eq!(row.get(0).unwrap(), None);
}

#[test]
fn it_should_persist_list_contents() {
    let store = RedbStore::temp("lists").expect("Failed to open database");
    let (mut note, _) = attach_note(&store, "draft", None);

    let words = note.words.get(&note.core).expect("Failed to read list");
    words.push("hello".to_string()).unwrap();
    words.push("world".to_string()).unwrap();
    words.insert(1, "brave".to_string()).unwrap();
    assert_eq!(words.to_vec().unwrap(), vec!["hello", "brave", "world"]);

    assert_eq!(words.remove(0).unwrap(), "hello");
    words.set(0, "hi".to_string()).unwrap();
    assert_eq!(words.to_vec().unwrap(), vec!["hi", "world"]);

    // A second handle onto the same field sees the same contents.
    let other = note.words.get(&note.core).expect("Failed to reread list");
    assert_eq!(other.len().unwrap(), 2);
}

#[test]
fn it_should_round_trip_every_value_variant_through_its_encoding() {
    let store = RedbStore::temp("variants").expect("Failed to open database");
    let row = store.create_row("Note").expect("Failed to create row");

    let values = vec![
        Value::Bool(true),
        Value::Int(-42),
        Value::Float(1.5),
        Value::Double(-0.25),
        Value::String("déjà vu".to_string()),
        Value::Blob(vec![1, 2, 3]),
        Value::Timestamp(chrono::Utc::now()),
        Value::Decimal(Decimal::new(-12345, -3)),
        Value::Uuid(Uuid::new_v4()),
        Value::Link(RowId(7)),
        Value::Null,
    ];
    for (key, value) in values.iter().enumerate() {
        row.set(key as PropertyKey, value.clone()).expect("Failed to write cell");
    }
    for (key, value) in values.iter().enumerate() {
        assert_eq!(row.get(key as PropertyKey).unwrap().as_ref(), Some(value));
    }
}

#[test]
fn it_should_resolve_backlinks_against_the_database() {
    let store = RedbStore::temp("backlinks").expect("Failed to open database");
    let author_schema = register_schema::<Author>().expect("Failed to register schema");
    register_schema::<Note>().expect("Failed to register schema");

    let author_row = store.create_row("Author").expect("Failed to create row");
    let author_id = author_row.id();
    let mut author = Author::default();
    author.name = Persisted::with_value("Ada".to_string());
    author.core.bind(ObjectHandle::new(author_row, author_schema.clone()));
    author.name.promote(&author.core, author_schema.property_at(0), 0).expect("Failed to promote name");
    author.notes.promote(&author.core, author_schema.property_at(1), 1).expect("Failed to promote notes");

    let (_, first_id) = attach_note(&store, "first", Some(author_id));
    let (_, second_id) = attach_note(&store, "second", Some(author_id));
    attach_note(&store, "unrelated", None);

    let notes = author.notes.get(&author.core).expect("Failed to read backlinks");
    let mut ids: Vec<RowId> = notes.resolve().expect("Failed to resolve backlinks").iter().map(|r| r.id()).collect();
    ids.sort();
    assert_eq!(ids, vec![first_id, second_id]);
}
