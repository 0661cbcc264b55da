use redbind::*;

#[derive(Default)]
struct Sample {
    core: ObjectCore,
    flag: Persisted<bool>,
    small: Persisted<i32>,
    ratio: Persisted<f64>,
    label: Persisted<String>,
    payload: Persisted<Vec<u8>>,
    seen_at: Persisted<Timestamp>,
    price: Persisted<Decimal>,
    token: Persisted<Uuid>,
    tiny: Persisted<i8>,
    short: Persisted<i16>,
}

impl Model for Sample {
    const CLASS_NAME: &'static str = "Sample";

    fn declare_properties(&self, builder: &mut SchemaBuilder) -> Result<(), BindError> {
        builder.property("flag", &self.flag)?;
        builder.property("small", &self.small)?;
        builder.property("ratio", &self.ratio)?;
        builder.property("label", &self.label)?;
        builder.property("payload", &self.payload)?;
        builder.property("seen_at", &self.seen_at)?;
        builder.property("price", &self.price)?;
        builder.property("token", &self.token)?;
        builder.property("tiny", &self.tiny)?;
        builder.property("short", &self.short)
    }
}

fn managed_sample(store: &MemStore) -> Sample {
    let schema = register_schema::<Sample>().expect("Failed to register schema");
    let row = store.create_row("Sample").expect("Failed to create row");
    let mut sample = Sample::default();
    sample.core.bind(ObjectHandle::new(row, schema.clone()));
    sample.flag.promote(&sample.core, schema.property_at(0), 0).expect("Failed to promote flag");
    sample.small.promote(&sample.core, schema.property_at(1), 1).expect("Failed to promote small");
    sample.ratio.promote(&sample.core, schema.property_at(2), 2).expect("Failed to promote ratio");
    sample.label.promote(&sample.core, schema.property_at(3), 3).expect("Failed to promote label");
    sample.payload.promote(&sample.core, schema.property_at(4), 4).expect("Failed to promote payload");
    sample.seen_at.promote(&sample.core, schema.property_at(5), 5).expect("Failed to promote seen_at");
    sample.price.promote(&sample.core, schema.property_at(6), 6).expect("Failed to promote price");
    sample.token.promote(&sample.core, schema.property_at(7), 7).expect("Failed to promote token");
    sample.tiny.promote(&sample.core, schema.property_at(8), 8).expect("Failed to promote tiny");
    sample.short.promote(&sample.core, schema.property_at(9), 9).expect("Failed to promote short");
    sample
}

#[test]
fn it_should_round_trip_every_scalar_kind_through_the_store() {
    let store = MemStore::new();
    let mut sample = managed_sample(&store);

    let when = chrono::Utc::now();
    let id = Uuid::new_v4();

    sample.flag.set(&sample.core, true).unwrap();
    sample.small.set(&sample.core, -123).unwrap();
    sample.ratio.set(&sample.core, 2.5).unwrap();
    sample.label.set(&sample.core, "crème brûlée".to_string()).unwrap();
    sample.payload.set(&sample.core, vec![0, 255, 7]).unwrap();
    sample.seen_at.set(&sample.core, when).unwrap();
    sample.price.set(&sample.core, Decimal::new(1999, -2)).unwrap();
    sample.token.set(&sample.core, id).unwrap();

    assert!(sample.flag.get(&sample.core).unwrap());
    assert_eq!(sample.small.get(&sample.core).unwrap(), -123);
    assert_eq!(sample.ratio.get(&sample.core).unwrap(), 2.5);
    assert_eq!(sample.label.get(&sample.core).unwrap(), "crème brûlée");
    assert_eq!(sample.payload.get(&sample.core).unwrap(), vec![0, 255, 7]);
    assert_eq!(sample.seen_at.get(&sample.core).unwrap(), when);
    assert_eq!(sample.price.get(&sample.core).unwrap(), Decimal::new(1999, -2));
    assert_eq!(sample.token.get(&sample.core).unwrap(), id);
}

#[test]
fn it_should_store_narrow_integers_at_full_width() {
    let store = MemStore::new();
    let mut sample = managed_sample(&store);

    sample.small.set(&sample.core, i32::MIN).unwrap();
    let row = sample.core.handle().expect("Sample must be managed").row().clone();
    assert_eq!(row.get(1).unwrap(), Some(Value::Int(i64::from(i32::MIN))));
    assert_eq!(sample.small.get(&sample.core).unwrap(), i32::MIN);
}

#[test]
fn it_should_round_trip_narrow_integer_boundary_values() {
    let store = MemStore::new();
    let mut sample = managed_sample(&store);
    let detached = Sample::default();

    for value in [i8::MIN, i8::MAX, -1, 0] {
        sample.tiny.set(&sample.core, value).expect("Failed to set boundary value");
        assert_eq!(sample.tiny.get(&sample.core).unwrap(), value);
    }
    for value in [i16::MIN, i16::MAX, -1, 0] {
        sample.short.set(&sample.core, value).expect("Failed to set boundary value");
        assert_eq!(sample.short.get(&sample.core).unwrap(), value);
    }
    for value in [i32::MIN, i32::MAX, -1, 0] {
        sample.small.set(&sample.core, value).expect("Failed to set boundary value");
        assert_eq!(sample.small.get(&sample.core).unwrap(), value);
    }

    let mut unmanaged_tiny: Persisted<i8> = Persisted::new();
    for value in [i8::MIN, i8::MAX, -1, 0] {
        unmanaged_tiny.set(&detached.core, value).expect("Failed to set unmanaged value");
        assert_eq!(unmanaged_tiny.get(&detached.core).unwrap(), value);
    }
    let mut unmanaged_short: Persisted<i16> = Persisted::new();
    for value in [i16::MIN, i16::MAX, -1, 0] {
        unmanaged_short.set(&detached.core, value).expect("Failed to set unmanaged value");
        assert_eq!(unmanaged_short.get(&detached.core).unwrap(), value);
    }
    let mut unmanaged_small: Persisted<i32> = Persisted::new();
    for value in [i32::MIN, i32::MAX, -1, 0] {
        unmanaged_small.set(&detached.core, value).expect("Failed to set unmanaged value");
        assert_eq!(unmanaged_small.get(&detached.core).unwrap(), value);
    }
}

#[test]
#[should_panic(expected = "invariant violation")]
fn it_should_abort_when_a_stored_value_exceeds_the_declared_width() {
    let store = MemStore::new();
    let mut sample = managed_sample(&store);

    let row = sample.core.handle().expect("Sample must be managed").row().clone();
    row.set(1, Value::Int(i64::MAX)).unwrap();
    let _ = sample.small.get(&sample.core);
}

#[test]
#[should_panic(expected = "invariant violation")]
fn it_should_abort_when_a_stored_value_has_the_wrong_kind() {
    let store = MemStore::new();
    let mut sample = managed_sample(&store);

    let row = sample.core.handle().expect("Sample must be managed").row().clone();
    row.set(3, Value::Int(1)).unwrap();
    let _ = sample.label.get(&sample.core);
}
