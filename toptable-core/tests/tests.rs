use toptable_core::{
    compare, tool::setup_log, CmpOperator, ConfigError, FieldRegistry, ParamType, TableConfig,
    TableError, TimestampedEvent, TopTable, Value,
};

use anyhow::Result;
use rand::Rng;

const SECOND: u64 = 1_000_000_000;

struct Event {
    ts: u64,
    comm: &'static str,
    pid: i64,
    bytes: Option<u64>,
    small: u8,
    ip: [u8; 4],
}

impl TimestampedEvent for Event {
    fn timestamp(&self) -> u64 {
        self.ts
    }
}

fn event(ts: u64, comm: &'static str, bytes: u64) -> Event {
    Event {
        ts,
        comm,
        pid: 1,
        bytes: Some(bytes),
        small: 0,
        ip: [10, 0, 0, 1],
    }
}

fn registry() -> FieldRegistry<Event> {
    let mut registry = FieldRegistry::new();
    registry
        .register_str("proc.name", |e: &Event| Some(e.comm))
        .register_pod("proc.pid", ParamType::Pid, |e: &Event| Some(e.pid))
        .register_pod("evt.bytes", ParamType::UInt64, |e: &Event| e.bytes)
        .register_pod("evt.small", ParamType::UInt8, |e: &Event| Some(e.small))
        .register_pod("fd.ip", ParamType::Ipv4Addr, |e: &Event| Some(e.ip));
    registry
}

fn sample_values(table: &TopTable<Event>, col: usize) -> Vec<String> {
    table
        .sample()
        .iter()
        .map(|row| row.value(col).unwrap().to_string())
        .collect()
}

#[test]
fn test_end_to_end_window() -> Result<()> {
    setup_log();

    let mut table = TopTable::new("*proc.name,Sevt.bytes", &registry())?;

    assert!(table.process_event(Some(&event(100, "a", 1))));
    assert!(!table.process_event(Some(&event(200, "a", 2))));
    assert!(table.process_event(Some(&event(1_500_000_000, "b", 5))));

    let sample = table.get_sample();
    assert_eq!(sample.len(), 1);

    let row = sample.row(0).unwrap();
    assert_eq!(row.key(), b"a\0");
    assert_eq!(row.key_value(), Value::Str(b"a"));
    assert_eq!(row.value(0), Some(Value::UInt(3)));

    assert_eq!(table.len(), 1);
    assert_eq!(table.live_row(b"b\0"), Some(vec![Value::UInt(5)]));
    assert_eq!(table.next_flush_time_ns(), Some(2 * SECOND));

    Ok(())
}

#[test]
fn test_key_position_in_format() -> Result<()> {
    setup_log();

    let table: TopTable<Event> = TopTable::new("Sevt.bytes proc.pid\t*proc.name", &registry())?;

    let names: Vec<_> = table.legend().iter().map(|info| info.name.as_str()).collect();
    assert_eq!(names, vec!["proc.name", "evt.bytes", "proc.pid"]);
    assert_eq!(table.legend()[2].ty, ParamType::Pid);

    Ok(())
}

#[test]
fn test_flush_boundary_determinism() -> Result<()> {
    setup_log();

    let mut rng = rand::thread_rng();
    let mut table = TopTable::with_refresh_interval("*proc.name,Sevt.bytes", &registry(), 5 * SECOND)?;

    let start = 12 * SECOND + rng.gen_range(0..SECOND);
    assert!(table.process_event(Some(&event(start, "a", 1))));
    assert_eq!(table.next_flush_time_ns(), Some(15 * SECOND));

    let mut ts = start;
    let mut count = 1;
    while ts < 15 * SECOND {
        assert!(!table.process_event(Some(&event(ts, "a", 1))));
        count += 1;
        ts += rng.gen_range(1..SECOND / 2);
    }

    assert!(table.process_event(Some(&event(15 * SECOND + 1, "a", 1))));
    assert_eq!(table.next_flush_time_ns(), Some(20 * SECOND));
    assert_eq!(sample_values(&table, 0), vec![count.to_string()]);

    // A late event never closes the window.
    assert!(!table.process_event(Some(&event(start, "b", 1))));
    assert_eq!(table.len(), 2);

    Ok(())
}

#[test]
fn test_missing_field_drops_event() -> Result<()> {
    setup_log();

    let mut table = TopTable::new("*proc.name,Sevt.bytes", &registry())?;

    table.process_event(Some(&event(100, "a", 4)));
    table.process_event(Some(&Event {
        bytes: None,
        ..event(200, "a", 0)
    }));
    table.process_event(Some(&Event {
        bytes: None,
        ..event(300, "b", 0)
    }));
    table.process_event(Some(&event(2 * SECOND, "c", 1)));

    assert_eq!(table.get_row_key(0), Some(&b"a\0"[..]));
    assert_eq!(sample_values(&table, 0), vec!["4"]);
    assert_eq!(table.get_row_from_key(b"b\0"), None);

    Ok(())
}

#[test]
fn test_sum_wraps_around() -> Result<()> {
    setup_log();

    let mut rng = rand::thread_rng();
    let mut table = TopTable::new("*proc.name,Sevt.small", &registry())?;

    let mut expected = 0u8;
    for i in 0..200 {
        let small: u8 = rng.gen();
        expected = expected.wrapping_add(small);

        table.process_event(Some(&Event {
            small,
            ..event(100 + i, "a", 0)
        }));
    }

    assert_eq!(table.live_row(b"a\0"), Some(vec![Value::UInt(expected as u64)]));

    Ok(())
}

#[test]
fn test_sort_and_toggle() -> Result<()> {
    setup_log();

    let mut table = TopTable::new("*proc.name,Sevt.bytes,proc.name", &registry())?;

    for (comm, bytes) in [("bash", 30), ("sshd", 10), ("nginx", 20), ("bash", 5)] {
        table.process_event(Some(&event(100, comm, bytes)));
    }
    table.process_event(None);

    assert_eq!(table.sorting_col(), 1);
    assert!(!table.is_sorting_ascending());

    table.get_sample();
    assert_eq!(sample_values(&table, 0), vec!["35", "20", "10"]);

    table.set_sorting_col(1)?;
    assert!(table.is_sorting_ascending());
    table.get_sample();
    assert_eq!(sample_values(&table, 0), vec!["10", "20", "35"]);

    // Strings start ascending.
    table.set_sorting_col(2)?;
    assert!(table.is_sorting_ascending());
    table.get_sample();
    assert_eq!(sample_values(&table, 1), vec!["bash", "nginx", "sshd"]);

    table.set_sorting_col(2)?;
    table.get_sample();
    assert_eq!(sample_values(&table, 1), vec!["sshd", "nginx", "bash"]);

    assert_eq!(table.get_row_from_key(b"sshd\0"), Some(0));
    assert_eq!(table.get_row_from_key(b"bash\0"), Some(2));
    assert_eq!(table.get_row_key(1), Some(&b"nginx\0"[..]));
    assert_eq!(table.get_row_key(3), None);

    // Rejected columns leave the state untouched.
    assert_eq!(table.set_sorting_col(0), Err(TableError::InvalidSortColumn(0)));
    assert_eq!(table.set_sorting_col(3), Err(TableError::InvalidSortColumn(3)));
    assert_eq!(table.sorting_col(), 2);
    assert!(!table.is_sorting_ascending());

    Ok(())
}

#[test]
fn test_sorted_sample_is_ordered() -> Result<()> {
    setup_log();

    const NAMES: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];

    let mut rng = rand::thread_rng();
    let mut table = TopTable::new("*proc.name,Sevt.bytes", &registry())?;

    for i in 0..500 {
        let comm = NAMES[rng.gen_range(0..NAMES.len())];
        table.process_event(Some(&event(i, comm, rng.gen_range(0..1000))));
    }
    table.process_event(None);

    let sample = table.get_sample();
    let values: Vec<u64> = sample
        .iter()
        .map(|row| match row.value(0) {
            Some(Value::UInt(v)) => v,
            other => panic!("unexpected value {:?}", other),
        })
        .collect();

    assert!(values.windows(2).all(|w| w[0] >= w[1]));
    assert!(sample.len() <= NAMES.len());

    let rows: Vec<_> = sample.iter().collect();
    assert!(rows.windows(2).all(|w| compare(
        CmpOperator::Ge,
        ParamType::UInt64,
        w[0].value_bytes(0).unwrap(),
        w[1].value_bytes(0).unwrap()
    )));

    Ok(())
}

#[test]
fn test_time_avg_rate() -> Result<()> {
    setup_log();

    let mut table = TopTable::with_refresh_interval("*proc.name,Tevt.bytes,Sevt.bytes", &registry(), 2 * SECOND)?;

    table.process_event(Some(&event(100, "a", 6)));
    table.process_event(Some(&event(200, "a", 4)));

    // Still a total while the window is open.
    assert_eq!(table.live_row(b"a\0"), Some(vec![Value::UInt(10), Value::UInt(10)]));

    table.process_event(Some(&event(3 * SECOND, "b", 1)));

    let row = table.sample().row(0).unwrap();
    assert_eq!(row.value(0), Some(Value::UInt(5)));
    assert_eq!(row.value(1), Some(Value::UInt(10)));

    Ok(())
}

#[test]
fn test_sample_survives_one_window() -> Result<()> {
    setup_log();

    let mut table = TopTable::new("*proc.name,Sevt.bytes", &registry())?;

    table.process_event(Some(&event(100, "a", 1)));
    table.process_event(Some(&event(SECOND + 1, "b", 2)));
    assert_eq!(table.get_row_key(0), Some(&b"a\0"[..]));

    for i in 0..100 {
        table.process_event(Some(&event(SECOND + 2 + i, "b", 2)));
    }
    assert_eq!(table.get_row_key(0), Some(&b"a\0"[..]));
    assert_eq!(sample_values(&table, 0), vec!["1"]);

    table.process_event(Some(&event(2 * SECOND + 1, "c", 3)));
    assert_eq!(table.get_row_key(0), Some(&b"b\0"[..]));
    assert_eq!(sample_values(&table, 0), vec!["202"]);

    table.process_event(Some(&event(3 * SECOND + 1, "d", 3)));
    assert_eq!(table.get_row_key(0), Some(&b"c\0"[..]));

    Ok(())
}

#[test]
fn test_print_sample() -> Result<()> {
    setup_log();

    let mut table = TopTable::new("*proc.name,Sevt.bytes,fd.ip,proc.pid", &registry())?;

    table.process_event(Some(&Event {
        pid: -3,
        ..event(100, "a", 7)
    }));
    table.process_event(Some(&event(200, "b", 9)));
    table.process_event(None);
    table.get_sample();

    let mut out = Vec::new();
    table.print_sample(&mut out)?;

    assert_eq!(
        String::from_utf8(out)?,
        "9 10.0.0.1 1 \n7 10.0.0.1 -3 \n----------------------\n"
    );

    Ok(())
}

#[test]
fn test_from_config() -> Result<()> {
    setup_log();

    let config = TableConfig::from_config_str(
        r#"
        format = "*proc.name,Sevt.bytes,proc.pid"
        refresh_interval_ns = 3000000000
        sorting_col = 2
        "#,
    )?;

    let table = TopTable::from_config(&config, &registry())?;
    assert_eq!(table.refresh_interval(), 3 * SECOND);
    assert_eq!(table.sorting_col(), 2);
    // Pids are identifiers, not quantities.
    assert!(table.is_sorting_ascending());

    // The first column starts in its default direction like any other.
    for col in [1, 2] {
        let config = TableConfig {
            sorting_col: Some(col),
            ..TableConfig::new("*proc.name,Sevt.bytes,Sevt.small")
        };

        let table = TopTable::from_config(&config, &registry())?;
        assert_eq!(table.sorting_col(), col);
        assert!(!table.is_sorting_ascending());
    }

    let config = TableConfig {
        sorting_col: Some(5),
        ..TableConfig::new("*proc.name,Sevt.bytes")
    };
    assert!(matches!(
        TopTable::from_config(&config, &registry()),
        Err(TableError::InvalidSortColumn(5))
    ));

    let config = TableConfig::new("*proc.name,Sproc.name");
    assert!(matches!(
        TopTable::from_config(&config, &registry()),
        Err(TableError::Config(ConfigError::InvalidAggregation { .. }))
    ));

    Ok(())
}
