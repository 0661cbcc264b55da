use redbind::*;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Priority {
    Low,
    Medium,
    High,
}

impl RawEnum for Priority {
    type Raw = i64;

    fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Priority::Low),
            1 => Some(Priority::Medium),
            2 => Some(Priority::High),
            _ => None,
        }
    }

    fn as_raw(&self) -> i64 {
        *self as i64
    }
}

impl_enum_property!(Priority);

#[derive(Debug, Clone, PartialEq)]
enum Status {
    Open,
    Closed,
}

impl RawEnum for Status {
    type Raw = String;

    fn from_raw(raw: String) -> Option<Self> {
        match raw.as_str() {
            "open" => Some(Status::Open),
            "closed" => Some(Status::Closed),
            _ => None,
        }
    }

    fn as_raw(&self) -> String {
        match self {
            Status::Open => "open".to_string(),
            Status::Closed => "closed".to_string(),
        }
    }
}

impl_enum_property!(Status);

struct Ticket {
    core: ObjectCore,
    priority: Persisted<Priority>,
    status: Persisted<Option<Status>>,
}

impl Default for Ticket {
    fn default() -> Self {
        Ticket {
            core: ObjectCore::default(),
            priority: Persisted::with_value(Priority::Low),
            status: Persisted::new(),
        }
    }
}

impl Model for Ticket {
    const CLASS_NAME: &'static str = "Ticket";

    fn declare_properties(&self, builder: &mut SchemaBuilder) -> Result<(), BindError> {
        builder.property("priority", &self.priority)?;
        builder.property("status", &self.status)
    }
}

fn managed_ticket(store: &MemStore) -> Ticket {
    let schema = register_schema::<Ticket>().expect("Failed to register schema");
    let row = store.create_row("Ticket").expect("Failed to create row");
    let mut ticket = Ticket::default();
    ticket.core.bind(ObjectHandle::new(row, schema.clone()));
    ticket.priority.promote(&ticket.core, schema.property_at(0), 0).expect("Failed to promote priority");
    ticket.status.promote(&ticket.core, schema.property_at(1), 1).expect("Failed to promote status");
    ticket
}

#[test]
fn it_should_populate_enum_properties_with_their_raw_kind() {
    let schema = ObjectSchema::populate::<Ticket>().expect("Failed to populate schema");
    assert_eq!(schema.property_at(0).kind, StorageKind::Int);
    let status = schema.property_at(1);
    assert_eq!(status.kind, StorageKind::String);
    assert!(status.optional);
}

#[test]
fn it_should_round_trip_enums_through_their_raw_value() {
    let store = MemStore::new();
    let mut ticket = managed_ticket(&store);

    ticket.priority.set(&ticket.core, Priority::High).expect("Failed to set priority");
    ticket.status.set(&ticket.core, Some(Status::Closed)).expect("Failed to set status");

    assert_eq!(ticket.priority.get(&ticket.core).unwrap(), Priority::High);
    assert_eq!(ticket.status.get(&ticket.core).unwrap(), Some(Status::Closed));

    let row = ticket.core.handle().expect("Ticket must be managed").row().clone();
    assert_eq!(row.get(0).unwrap(), Some(Value::Int(2)));
    assert_eq!(row.get(1).unwrap(), Some(Value::String("closed".to_string())));
}

#[test]
fn it_should_read_unknown_raw_values_as_absent_through_the_optional_accessor() {
    let store = MemStore::new();
    let mut ticket = managed_ticket(&store);

    let row = ticket.core.handle().expect("Ticket must be managed").row().clone();
    row.set(1, Value::String("reopened".to_string())).unwrap();
    assert_eq!(ticket.status.get(&ticket.core).unwrap(), None);
}

#[test]
#[should_panic(expected = "no declared case")]
fn it_should_abort_on_unknown_raw_value_through_the_required_accessor() {
    let store = MemStore::new();
    let mut ticket = managed_ticket(&store);

    let row = ticket.core.handle().expect("Ticket must be managed").row().clone();
    row.set(0, Value::Int(99)).unwrap();
    let _ = ticket.priority.get(&ticket.core);
}

#[test]
fn it_should_keep_enum_values_in_memory_while_unmanaged() {
    let mut ticket = Ticket::default();
    assert_eq!(ticket.priority.get(&ticket.core).unwrap(), Priority::Low);
    ticket.priority.set(&ticket.core, Priority::Medium).expect("Failed to set unmanaged priority");
    assert_eq!(ticket.priority.get(&ticket.core).unwrap(), Priority::Medium);
}
