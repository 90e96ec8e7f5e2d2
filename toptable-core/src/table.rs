//! The aggregation table.
//!
//! `TopTable` groups the events of a time window by a key field and aggregates the value
//! fields in place. When an event arrives past the end of the window, the window is closed:
//! its rows become the new sample, which can be sorted and printed, and a new window starts.
//!
//! All bytes of a window live in an `ArenaStore`. The sample of the last closed window
//! references the arena generation of that window, and the new window is accumulated in
//! the other generation, so closing a window never copies a value.
//!
//! The table is single threaded, every method must be called from the same driving loop.

use hashbrown::HashTable;
use likely_stable::unlikely;
use log::{debug, error};
use std::io::{self, Write};

use crate::aggregation::{add_fields, time_avg_to_rate};
use crate::arena::{ArenaStore, ValueHandle};
use crate::config::TableConfig;
use crate::error::{ConfigError, Result, TableError};
use crate::error_bail;
use crate::extractor::{ExtractorFactory, TimestampedEvent};
use crate::param_type::FieldInfo;
use crate::sample::{sort_rows, Sample, SampleRow};
use crate::schema::Schema;
use crate::tool::{hash_key, is_keys_equal, DEFAULT_REFRESH_INTERVAL_NS};
use crate::value::Value;

/// A row of the window being accumulated.
struct LiveRow {
    key: ValueHandle,
    values: Vec<ValueHandle>,
}

/// End of the window containing `ts`.
///
/// Windows are aligned to multiples of `refresh_interval`, whatever the timestamp of the
/// event that opens them.
#[inline]
pub fn next_flush_time(ts: u64, refresh_interval: u64) -> u64 {
    (ts - ts % refresh_interval).saturating_add(refresh_interval)
}

pub struct TopTable<E> {
    /// Compiled fields, key first.
    schema: Schema<E>,

    /// Name and type of each field, key first.
    legend: Vec<FieldInfo>,

    /// Length of a window in nanoseconds.
    refresh_interval: u64,

    /// End of the current window. `None` until the first event.
    next_flush_time_ns: Option<u64>,

    /// Timestamp of the last event, used by flush requests without an event.
    last_event_ts: u64,

    /// Bytes of the current window and of the last sample.
    arena: ArenaStore,

    /// Rows of the current window, hashed by key content.
    table: HashTable<LiveRow>,

    /// Rows of the last closed window.
    sample_data: Vec<SampleRow>,

    /// Sorting column, counted from `0` without the key.
    sorting_col: usize,

    is_sorting_ascending: bool,
}

impl<E: TimestampedEvent> TopTable<E> {
    /// Create a table with the default refresh interval of one second.
    pub fn new<F>(fmt: &str, factory: &F) -> Result<Self>
    where
        F: ExtractorFactory<E> + ?Sized,
    {
        Self::with_refresh_interval(fmt, factory, DEFAULT_REFRESH_INTERVAL_NS)
    }

    pub fn with_refresh_interval<F>(fmt: &str, factory: &F, refresh_interval: u64) -> Result<Self>
    where
        F: ExtractorFactory<E> + ?Sized,
    {
        if refresh_interval == 0 {
            error_bail!(ConfigError::InvalidRefreshInterval);
        }

        let schema = Schema::compile(fmt, factory)?;
        let legend = schema.descriptors().iter().map(|d| d.info.clone()).collect();

        Ok(Self {
            schema,
            legend,
            refresh_interval,
            next_flush_time_ns: None,
            last_event_ts: 0,
            arena: ArenaStore::new(),
            table: HashTable::new(),
            sample_data: Vec::new(),
            sorting_col: 0,
            is_sorting_ascending: false,
        })
    }

    /// Create a table from a `TableConfig`.
    ///
    /// The configured sorting column starts in the default direction of its type, even when it
    /// is column `1`.
    pub fn from_config<F>(config: &TableConfig, factory: &F) -> Result<Self>
    where
        F: ExtractorFactory<E> + ?Sized,
    {
        config.validate()?;

        let mut table = Self::with_refresh_interval(&config.format, factory, config.refresh_interval_ns)?;

        if let Some(col) = config.sorting_col {
            let col_index = table.checked_sorting_col(col)?;

            table.sorting_col = col_index - 1;
            table.is_sorting_ascending = table.schema.descriptors[col_index].ty().default_ascending();
        }

        Ok(table)
    }

    /// Process one event, or a flush request if `evt` is `None`.
    ///
    /// The window is closed before the event is aggregated when the event is past the end of
    /// the window, or when it is the very first event, which only opens the first window.
    /// A flush request closes the window at once, and the next window is aligned on the
    /// timestamp of the last event seen.
    ///
    /// An event for which any field has no value is dropped.
    ///
    /// Returns `true` if a flush happened.
    pub fn process_event(&mut self, evt: Option<&E>) -> bool {
        let evt = match evt {
            Some(evt) => evt,
            None => {
                self.flush(self.last_event_ts);
                return true;
            }
        };

        let ts = evt.timestamp();
        self.last_event_ts = ts;

        let mut res = false;

        let is_due = match self.next_flush_time_ns {
            Some(next) => unlikely(ts > next),
            None => true,
        };

        if is_due {
            self.flush(ts);
            res = true;
        }

        self.aggregate_event(evt);

        res
    }

    /// Close the current window, aligning the next one on `ts`.
    pub fn flush_at(&mut self, ts: u64) {
        self.flush(ts);
    }

    fn aggregate_event(&mut self, evt: &E) {
        let row_fixed_size = self.schema.row_fixed_size();

        let mut vals: Vec<&[u8]> = Vec::with_capacity(self.schema.extractors.len());

        for chk in self.schema.extractors.iter_mut() {
            match chk.extract(evt) {
                Some(val) => vals.push(val),
                // Samples with empty values are dropped.
                None => return,
            }
        }

        let descriptors = &self.schema.descriptors;

        let key_len = descriptors[0].ty().resolve_len(vals[0]);
        let key = &vals[0][..key_len];
        let hash = hash_key(key);

        let arena = &mut self.arena;

        match self.table.find_mut(hash, |row| is_keys_equal(arena.get(&row.key), key)) {
            Some(row) => {
                for (j, handle) in row.values.iter().enumerate() {
                    let descriptor = &descriptors[j + 1];
                    add_fields(
                        descriptor.aggregation,
                        descriptor.ty(),
                        arena.get_mut(handle),
                        vals[j + 1],
                    );
                }
            }
            None => {
                arena.reserve(key_len + row_fixed_size);

                let key_handle = arena.copy(key);

                let values = descriptors[1..]
                    .iter()
                    .zip(vals[1..].iter())
                    .map(|(descriptor, val)| {
                        let len = descriptor.ty().resolve_len(val);
                        arena.copy(&val[..len])
                    })
                    .collect();

                self.table.insert_unique(
                    hash,
                    LiveRow {
                        key: key_handle,
                        values,
                    },
                    |row| hash_key(arena.get(&row.key)),
                );
            }
        }
    }

    fn flush(&mut self, ts: u64) {
        if self.next_flush_time_ns.is_some() {
            self.create_sample();
            self.finalize_sample();

            let retired = self.arena.live_generation();

            self.arena.switch_buffers();
            self.arena.clear();
            self.table.clear();

            debug!(
                "closed table window, rows: {}, bytes: {}",
                self.sample_data.len(),
                self.arena.used(retired)
            );
        }

        self.next_flush_time_ns = Some(next_flush_time(ts, self.refresh_interval));
    }

    /// Replace the sample with the rows of the current window.
    ///
    /// The rows are in no particular order until `get_sample` sorts them.
    ///
    /// A flush calls this before converting the `TimeAvg` columns to rates. Called between
    /// flushes, the sample holds the running totals of the open window, and its values keep
    /// changing as events of that window are aggregated.
    pub fn create_sample(&mut self) {
        self.sample_data.clear();

        for row in self.table.iter() {
            self.sample_data
                .push(SampleRow::new(row.key, row.values.clone()));
        }
    }

    /// Convert the `TimeAvg` columns of a freshly closed window to per second rates.
    fn finalize_sample(&mut self) {
        let descriptors = &self.schema.descriptors;

        for (j, descriptor) in descriptors[1..].iter().enumerate() {
            if !descriptor.aggregation.is_time_avg() {
                continue;
            }

            for row in self.sample_data.iter() {
                time_avg_to_rate(
                    descriptor.ty(),
                    self.arena.get_mut(&row.values[j]),
                    self.refresh_interval,
                );
            }
        }
    }

    /// The last sample, sorted by the current sorting column.
    pub fn get_sample(&mut self) -> Sample<'_> {
        let ty = self.schema.descriptors[self.sorting_col + 1].ty();

        sort_rows(
            &mut self.sample_data,
            &self.arena,
            ty,
            self.sorting_col,
            self.is_sorting_ascending,
        );

        self.sample()
    }

    /// The last sample in its current order.
    pub fn sample(&self) -> Sample<'_> {
        Sample::new(&self.sample_data, &self.arena, &self.schema.descriptors)
    }

    /// Index in the schema of sorting column `col`, which is counted from `1` without the key.
    fn checked_sorting_col(&self, col: u32) -> Result<usize> {
        if col == 0 || col as usize >= self.schema.len() {
            error_bail!(TableError::InvalidSortColumn(col));
        }

        Ok(col as usize)
    }

    /// Select the sorting column, counted from `1` without the key.
    ///
    /// Selecting the current column again reverses the direction. A new column starts
    /// descending for numbers and times, ascending for everything else.
    pub fn set_sorting_col(&mut self, col: u32) -> Result<()> {
        let col_index = self.checked_sorting_col(col)?;

        if col_index == self.sorting_col + 1 {
            self.is_sorting_ascending = !self.is_sorting_ascending;
        } else {
            self.is_sorting_ascending = self.schema.descriptors[col_index].ty().default_ascending();
        }

        self.sorting_col = col_index - 1;

        Ok(())
    }

    /// Current sorting column, counted from `1` without the key.
    #[inline]
    pub fn sorting_col(&self) -> u32 {
        (self.sorting_col + 1) as u32
    }

    #[inline]
    pub fn is_sorting_ascending(&self) -> bool {
        self.is_sorting_ascending
    }

    /// Key of row `rownum` of the last sample.
    pub fn get_row_key(&self, rownum: usize) -> Option<&[u8]> {
        self.sample_data
            .get(rownum)
            .map(|row| self.arena.get(&row.key))
    }

    /// Index of the row with `key` in the last sample.
    ///
    /// This is a linear scan. It lets a display keep its cursor on the same key across
    /// refreshes.
    pub fn get_row_from_key(&self, key: &[u8]) -> Option<usize> {
        self.sample_data
            .iter()
            .position(|row| is_keys_equal(self.arena.get(&row.key), key))
    }

    /// Print the last sample in its current order.
    pub fn print_sample<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.sample().print(out)
    }

    pub fn stdout_print(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();

        self.print_sample(&mut out)
    }

    /// Name and type of each field, key first.
    #[inline]
    pub fn legend(&self) -> &[FieldInfo] {
        &self.legend
    }

    #[inline]
    pub fn schema(&self) -> &Schema<E> {
        &self.schema
    }

    #[inline]
    pub fn refresh_interval(&self) -> u64 {
        self.refresh_interval
    }

    /// End of the current window, `None` before the first event.
    #[inline]
    pub fn next_flush_time_ns(&self) -> Option<u64> {
        self.next_flush_time_ns
    }

    /// Number of rows in the current window.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Decoded values of the row with `key` in the current window.
    ///
    /// Values of `TimeAvg` columns are still window totals here.
    pub fn live_row(&self, key: &[u8]) -> Option<Vec<Value<'_>>> {
        let row = self
            .table
            .find(hash_key(key), |row| is_keys_equal(self.arena.get(&row.key), key))?;

        Some(
            row.values
                .iter()
                .zip(self.schema.descriptors[1..].iter())
                .map(|(h, d)| Value::decode(d.ty(), self.arena.get(h)))
                .collect(),
        )
    }
}
