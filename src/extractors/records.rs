// src/extractors/records.rs
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A payroll field as printed on the ledger: how many times, and for how much.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountAmount {
    pub count: u64,
    pub amount: u64,
}

impl CountAmount {
    pub const ZERO: CountAmount = CountAmount { count: 0, amount: 0 };

    pub fn new(count: u64, amount: u64) -> Self {
        Self { count, amount }
    }

    pub fn is_zero(&self) -> bool {
        self.count == 0 && self.amount == 0
    }
}

/// One employee from the attendance ledger. Field order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub employee_id: String,
    pub name: String,
    pub shukkin: CountAmount,
    pub kokyu: CountAmount,
    pub kado_jikan: String,
    pub kihon_kyu: CountAmount,
    pub hosho_zangyo: CountAmount,
    pub josha_teate: CountAmount,
    pub sagawa_warimashi_teate: CountAmount,
    pub double_teate: CountAmount,
    pub rinji_teate: CountAmount,
    pub yakin_teate: CountAmount,
    pub kyujitsu_teate: CountAmount,
    pub chokyori_teate: CountAmount,
    pub sonota: CountAmount,
    pub kei: u64,
}

/// One employee from the allowance schedule.
///
/// Sparse and ordered: only fields that carried a value are present, in the
/// order they were first seen. `shain_id` always comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowanceRecord {
    entries: Vec<(String, String)>,
}

impl AllowanceRecord {
    pub const ID_KEY: &'static str = "shain_id";
    pub const NAME_KEY: &'static str = "shimei";

    pub fn new(shain_id: &str) -> Self {
        Self {
            entries: vec![(Self::ID_KEY.to_string(), shain_id.to_string())],
        }
    }

    pub fn shain_id(&self) -> &str {
        self.get(Self::ID_KEY).unwrap_or_default()
    }

    pub fn shimei(&self) -> Option<&str> {
        self.get(Self::NAME_KEY)
    }

    /// Names are the one field later rows may overwrite; the key keeps its position.
    pub fn set_shimei(&mut self, name: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == Self::NAME_KEY) {
            Some((_, value)) => *value = name.to_string(),
            None => self.entries.push((Self::NAME_KEY.to_string(), name.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// First write wins: returns false and leaves the record untouched when
    /// `key` is already present.
    pub fn insert_if_absent(&mut self, key: &str, value: String) -> bool {
        if self.contains(key) {
            return false;
        }
        self.entries.push((key.to_string(), value));
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for AllowanceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
