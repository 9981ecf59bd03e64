use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Target-currency sentinel meaning "converted into every tracked currency".
pub const ALL_CURRENCIES: &str = "ALL";

/// Default cap on stored conversion records.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// The outcome of a conversion before it is stamped and logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionDraft {
    pub from_currency: String,
    pub to_currency: String,
    pub from_amount: f64,
    pub to_amount: f64,
    pub exchange_rate: f64,
    pub source: String,
}

/// An immutable, logged conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    /// Unique, increasing in creation order
    pub id: u64,
    pub from_currency: String,
    /// A currency code or [`ALL_CURRENCIES`]
    pub to_currency: String,
    pub from_amount: f64,
    /// 0 when `to_currency` is [`ALL_CURRENCIES`]
    pub to_amount: f64,
    pub exchange_rate: f64,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    pub source: String,
}

impl ConversionRecord {
    pub fn is_all_currencies(&self) -> bool {
        self.to_currency == ALL_CURRENCIES
    }

    /// Whether this record involves `code`. ALL-sentinel records involve
    /// every currency.
    pub fn involves(&self, code: &str) -> bool {
        self.from_currency.eq_ignore_ascii_case(code)
            || self.to_currency.eq_ignore_ascii_case(code)
            || self.is_all_currencies()
    }
}

/// Bounded, newest-first list of conversion records.
///
/// The only mutations are [`HistoryLog::append`] and [`HistoryLog::clear`].
#[derive(Debug, Clone)]
pub struct HistoryLog {
    records: VecDeque<ConversionRecord>,
    limit: usize,
    next_id: u64,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLog {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::new(),
            limit: limit.max(1),
            next_id: 1,
        }
    }

    /// Rebuild a log from persisted records (expected newest-first).
    /// Records beyond `limit` are dropped from the tail; ids continue after
    /// the largest one seen.
    pub fn from_records(records: Vec<ConversionRecord>, limit: usize) -> Self {
        let mut log = Self::new(limit);
        log.next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        log.records = records.into_iter().take(log.limit).collect();
        log
    }

    /// Stamp a draft with the next id and `timestamp`, insert it at the
    /// front, and evict from the tail past the limit.
    pub fn append(&mut self, draft: ConversionDraft, timestamp: i64) -> &ConversionRecord {
        let record = ConversionRecord {
            id: self.next_id,
            from_currency: draft.from_currency,
            to_currency: draft.to_currency,
            from_amount: draft.from_amount,
            to_amount: draft.to_amount,
            exchange_rate: draft.exchange_rate,
            timestamp,
            source: draft.source,
        };
        self.next_id += 1;
        self.records.push_front(record);
        self.records.truncate(self.limit);
        &self.records[0]
    }

    /// Drop every record. Ids keep counting from where they were.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// The id the next appended record will get.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Never hand out an id below `next_id`, e.g. one persisted before the
    /// records carrying it were cleared.
    pub fn resume_from(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn latest(&self) -> Option<&ConversionRecord> {
        self.records.front()
    }

    /// Newest-first iterator.
    pub fn iter(&self) -> impl Iterator<Item = &ConversionRecord> {
        self.records.iter()
    }

    /// Newest-first copy, the persisted form.
    pub fn to_vec(&self) -> Vec<ConversionRecord> {
        self.records.iter().cloned().collect()
    }
}
