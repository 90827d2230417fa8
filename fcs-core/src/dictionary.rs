//! Ordered keyword-value dictionary
//!
//! Keywords are case-insensitive and stored upper-case; values are UTF-8
//! with leading and trailing blanks trimmed. Insertion order is preserved
//! (it decides TEXT segment layout on save); later writes overwrite the
//! value in place.

use crate::error::{FcsError, Result};
use crate::format::constants::keywords;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn contains_key(&self, keyword: &str) -> bool {
        self.index.contains_key(&normalize_key(keyword))
    }

    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.index
            .get(&normalize_key(keyword))
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Insert or overwrite. Overwriting keeps the entry's position.
    pub fn set(&mut self, keyword: &str, value: impl Into<String>) {
        let key = normalize_key(keyword);
        if key.is_empty() {
            return;
        }
        let value = value.into().trim().to_string();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn remove(&mut self, keyword: &str) -> Option<String> {
        let key = normalize_key(keyword);
        let i = self.index.remove(&key)?;
        let (_, value) = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(value)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Value parsed as an unsigned integer. A present but unparseable value
    /// is `Malformed`; a missing keyword is `Ok(None)`.
    pub fn get_u64(&self, keyword: &str) -> Result<Option<u64>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(v) => v.trim().parse::<u64>().map(Some).map_err(|_| {
                FcsError::Malformed(format!("keyword {keyword} has non-integer value '{v}'"))
            }),
        }
    }

    /// Value parsed as a float, same contract as [`Dictionary::get_u64`]
    pub fn get_f64(&self, keyword: &str) -> Result<Option<f64>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(v) => v.trim().parse::<f64>().map(Some).map_err(|_| {
                FcsError::Malformed(format!("keyword {keyword} has non-numeric value '{v}'"))
            }),
        }
    }

    pub fn get_param(&self, template: &str, index: usize) -> Option<&str> {
        self.get(&param_key(template, index))
    }

    pub fn set_param(&mut self, template: &str, index: usize, value: impl Into<String>) {
        let key = param_key(template, index);
        self.set(&key, value);
    }

    pub fn remove_param(&mut self, template: &str, index: usize) -> Option<String> {
        self.remove(&param_key(template, index))
    }

    /// The spillover matrix, if any of the carrier keywords is present.
    ///
    /// Searches `$SPILLOVER`, `$COMP`, `$SPILL`, `SPILL` in that fixed
    /// order; the first present keyword wins. No standard defines the
    /// precedence between these when several coexist.
    pub fn spillover(&self) -> Result<Option<Spillover>> {
        for keyword in keywords::SPILLOVER_KEYWORDS {
            if let Some(value) = self.get(keyword) {
                let parameter_count = self.get_u64(keywords::PAR)?.map(|p| p as usize);
                return parse_spillover(value, parameter_count).map(Some);
            }
        }
        Ok(None)
    }

    /// Drop every entry whose vocabulary record carries the personal-data
    /// flag. Returns the removed keywords.
    pub fn remove_personal(&mut self) -> Vec<String> {
        let personal: Vec<String> = self
            .keys()
            .filter(|k| {
                crate::vocabulary::lookup(k)
                    .map(|r| r.spec.personal)
                    .unwrap_or(false)
            })
            .map(ToString::to_string)
            .collect();
        for key in &personal {
            self.remove(key);
        }
        personal
    }
}

/// Substitute the 1-based parameter index into a keyword template,
/// e.g. `param_key("$PnB", 3)` is `"$P3B"`.
pub fn param_key(template: &str, index: usize) -> String {
    template.replacen('n', &index.to_string(), 1)
}

fn normalize_key(keyword: &str) -> String {
    keyword.trim().to_ascii_uppercase()
}

/// A square fluorescence cross-talk matrix keyed to named parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Spillover {
    pub parameter_names: Vec<String>,
    /// Row-major n×n coefficients
    pub coefficients: Vec<f64>,
}

fn parse_spillover(value: &str, parameter_count: Option<usize>) -> Result<Spillover> {
    let tokens: Vec<&str> = value.split(',').map(str::trim).collect();
    let n: usize = tokens[0]
        .parse()
        .map_err(|_| FcsError::Malformed(format!("spillover count '{}' is not a number", tokens[0])))?;
    if n == 0 {
        return Err(FcsError::Malformed(String::from(
            "spillover matrix declares zero parameters",
        )));
    }
    if let Some(par) = parameter_count {
        if n > par {
            return Err(FcsError::Malformed(format!(
                "spillover matrix names {n} parameters but the file declares only {par}"
            )));
        }
    }
    let expected = 1 + n + n * n;
    if tokens.len() != expected {
        return Err(FcsError::Malformed(format!(
            "spillover value has {} tokens, expected {expected} for {n} parameters",
            tokens.len()
        )));
    }
    let parameter_names = tokens[1..=n].iter().map(|s| s.to_string()).collect();
    let mut coefficients = Vec::with_capacity(n * n);
    for token in &tokens[1 + n..] {
        coefficients.push(token.parse::<f64>().map_err(|_| {
            FcsError::Malformed(format!("spillover coefficient '{token}' is not a number"))
        })?);
    }
    Ok(Spillover {
        parameter_names,
        coefficients,
    })
}
