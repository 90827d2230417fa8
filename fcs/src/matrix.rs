//! Column-major event storage
//!
//! One contiguous buffer per parameter, single- or double-precision
//! uniformly across all columns. The matrix is created by the data codec
//! and owned by the caller afterward; the scaling engine mutates it in
//! place.

use fcs_core::EventStore;

/// A per-column value range
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

/// Column storage with uniform precision
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    Single(Vec<Vec<f32>>),
    Double(Vec<Vec<f64>>),
}

/// Decoded event matrix: one numeric column per parameter
#[derive(Debug, Clone, PartialEq)]
pub struct EventMatrix {
    names: Vec<String>,
    data: EventData,
    event_count: usize,
    original_event_count: usize,
    /// Declared ranges, from `$PnR` or the scaling transform
    specified: Vec<ColumnRange>,
    /// Measured ranges over the live data
    observed: Vec<ColumnRange>,
}

impl EventMatrix {
    pub fn new(names: Vec<String>, events: usize, double_precision: bool) -> Self {
        let count = names.len();
        let data = if double_precision {
            EventData::Double(vec![vec![0.0; events]; count])
        } else {
            EventData::Single(vec![vec![0.0; events]; count])
        };
        Self {
            names,
            data,
            event_count: events,
            original_event_count: events,
            specified: vec![ColumnRange::default(); count],
            observed: vec![ColumnRange::default(); count],
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.names.len()
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn is_double_precision(&self) -> bool {
        matches!(self.data, EventData::Double(_))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn set_original_event_count(&mut self, count: usize) {
        self.original_event_count = count;
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut EventData {
        &mut self.data
    }

    pub fn column_f32(&self, parameter: usize) -> Option<&[f32]> {
        match &self.data {
            EventData::Single(cols) => cols.get(parameter).map(Vec::as_slice),
            EventData::Double(_) => None,
        }
    }

    pub fn column_f64(&self, parameter: usize) -> Option<&[f64]> {
        match &self.data {
            EventData::Double(cols) => cols.get(parameter).map(Vec::as_slice),
            EventData::Single(_) => None,
        }
    }

    /// Value at (event, parameter), widened to f64
    pub fn get(&self, event: usize, parameter: usize) -> Option<f64> {
        if event >= self.event_count {
            return None;
        }
        match &self.data {
            EventData::Single(cols) => cols.get(parameter).map(|c| c[event] as f64),
            EventData::Double(cols) => cols.get(parameter).map(|c| c[event]),
        }
    }

    pub fn set(&mut self, event: usize, parameter: usize, value: f64) {
        match &mut self.data {
            EventData::Single(cols) => cols[parameter][event] = value as f32,
            EventData::Double(cols) => cols[parameter][event] = value,
        }
    }

    pub fn specified_range(&self, parameter: usize) -> Option<ColumnRange> {
        self.specified.get(parameter).copied()
    }

    pub fn set_specified_range(&mut self, parameter: usize, min: f64, max: f64) {
        if let Some(slot) = self.specified.get_mut(parameter) {
            *slot = ColumnRange { min, max };
        }
    }

    pub fn observed_range(&self, parameter: usize) -> Option<ColumnRange> {
        self.observed.get(parameter).copied()
    }
}

impl EventStore for EventMatrix {
    fn with_dimensions(
        parameter_names: Vec<String>,
        events: usize,
        double_precision: bool,
    ) -> Self {
        Self::new(parameter_names, events, double_precision)
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.event_count, self.names.len())
    }

    fn original_event_count(&self) -> usize {
        self.original_event_count
    }

    fn value(&self, event: usize, parameter: usize) -> Option<f64> {
        self.get(event, parameter)
    }

    fn parameter_name(&self, parameter: usize) -> Option<&str> {
        self.names.get(parameter).map(String::as_str)
    }

    fn recompute_observed_ranges(&mut self) {
        let ranges: Vec<ColumnRange> = match &self.data {
            EventData::Single(cols) => cols
                .iter()
                .map(|col| minmax(col.iter().map(|&v| v as f64)))
                .collect(),
            EventData::Double(cols) => cols
                .iter()
                .map(|col| minmax(col.iter().copied()))
                .collect(),
        };
        self.observed = ranges;
    }
}

fn minmax(values: impl Iterator<Item = f64>) -> ColumnRange {
    let mut range = ColumnRange::default();
    let mut first = true;
    for v in values {
        if first {
            range = ColumnRange { min: v, max: v };
            first = false;
        } else {
            range.min = range.min.min(v);
            range.max = range.max.max(v);
        }
    }
    range
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_construction() {
        let m = EventMatrix::new(names(&["FSC", "SSC"]), 4, false);
        assert_eq!(m.dimensions(), (4, 2));
        assert!(!m.is_double_precision());
        assert_eq!(m.get(0, 0), Some(0.0));
        assert_eq!(m.get(4, 0), None);
        assert_eq!(m.get(0, 2), None);
    }

    #[test]
    fn test_original_event_count_is_distinct() {
        let mut m = EventMatrix::new(names(&["FSC"]), 100, true);
        m.set_original_event_count(5000);
        assert_eq!(m.event_count(), 100);
        assert_eq!(m.original_event_count(), 5000);
    }

    #[test]
    fn test_observed_ranges() {
        let mut m = EventMatrix::new(names(&["A"]), 3, false);
        m.set(0, 0, 5.0);
        m.set(1, 0, -2.0);
        m.set(2, 0, 10.0);
        m.recompute_observed_ranges();
        let r = m.observed_range(0).unwrap();
        assert_eq!(r.min, -2.0);
        assert_eq!(r.max, 10.0);
    }

    #[test]
    fn test_precision_specific_column_access() {
        let m = EventMatrix::new(names(&["A"]), 2, false);
        assert!(m.column_f32(0).is_some());
        assert!(m.column_f64(0).is_none());
        let m = EventMatrix::new(names(&["A"]), 2, true);
        assert!(m.column_f64(0).is_some());
    }
}
