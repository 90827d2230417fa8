//! Standard keyword vocabulary
//!
//! A process-wide immutable table of the standard keyword names and the
//! parametric `$PnX` templates. Lookup failure is a normal outcome — vendor
//! keywords are everywhere — never an error.

/// Broad grouping used by the save planner and de-identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCategory {
    /// Segment offset bookkeeping
    Segment,
    /// Dataset-wide structure: data type, mode, counts
    Dataset,
    /// Acquisition context: instrument, times, labels
    Acquisition,
    /// Per-parameter keyword template
    Parameter,
}

/// Rough value shape, a hint for display and validation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueHint {
    Integer,
    Float,
    Text,
    /// Comma-delimited composite value
    Delimited,
}

/// One row of the vocabulary table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordSpec {
    /// Literal name, or a template with a lowercase `n` index position
    pub name: &'static str,
    pub category: KeywordCategory,
    pub hint: ValueHint,
    /// Nominally required by the written standard
    pub required: bool,
    pub deprecated: bool,
    /// Carries potentially identifying information
    pub personal: bool,
    pub description: &'static str,
}

const fn kw(
    name: &'static str,
    category: KeywordCategory,
    hint: ValueHint,
    description: &'static str,
) -> KeywordSpec {
    KeywordSpec {
        name,
        category,
        hint,
        required: false,
        deprecated: false,
        personal: false,
        description,
    }
}

const fn required(mut spec: KeywordSpec) -> KeywordSpec {
    spec.required = true;
    spec
}

const fn deprecated(mut spec: KeywordSpec) -> KeywordSpec {
    spec.deprecated = true;
    spec
}

const fn personal(mut spec: KeywordSpec) -> KeywordSpec {
    spec.personal = true;
    spec
}

use KeywordCategory::*;
use ValueHint::*;

static KEYWORDS: &[KeywordSpec] = &[
    required(kw("$BEGINANALYSIS", Segment, Integer, "Byte offset to the beginning of the ANALYSIS segment")),
    required(kw("$BEGINDATA", Segment, Integer, "Byte offset to the beginning of the DATA segment")),
    required(kw("$BEGINSTEXT", Segment, Integer, "Byte offset to the beginning of the supplemental TEXT segment")),
    required(kw("$ENDANALYSIS", Segment, Integer, "Byte offset to the end of the ANALYSIS segment")),
    required(kw("$ENDDATA", Segment, Integer, "Byte offset to the end of the DATA segment")),
    required(kw("$ENDSTEXT", Segment, Integer, "Byte offset to the end of the supplemental TEXT segment")),
    required(kw("$BYTEORD", Dataset, Delimited, "Byte order of binary data words")),
    required(kw("$DATATYPE", Dataset, Text, "Element type of the DATA segment")),
    required(kw("$MODE", Dataset, Text, "Data storage mode")),
    required(kw("$NEXTDATA", Dataset, Integer, "Byte offset to the next dataset in the file")),
    required(kw("$PAR", Dataset, Integer, "Number of parameters per event")),
    required(kw("$TOT", Dataset, Integer, "Total number of events")),
    kw("$ABRT", Acquisition, Integer, "Events lost to acquisition electronics aborts"),
    kw("$BTIM", Acquisition, Text, "Clock time at the beginning of acquisition"),
    kw("$CELLS", Acquisition, Text, "Description of the cells measured"),
    kw("$COM", Acquisition, Text, "Free-form comment"),
    deprecated(kw("$COMP", Dataset, Delimited, "Fluorescence compensation matrix (superseded by $SPILLOVER)")),
    kw("$CYT", Acquisition, Text, "Cytometer model"),
    kw("$CYTSN", Acquisition, Text, "Cytometer serial number"),
    kw("$DATE", Acquisition, Text, "Acquisition date"),
    kw("$ETIM", Acquisition, Text, "Clock time at the end of acquisition"),
    personal(kw("$EXP", Acquisition, Text, "Name of the person initiating the experiment")),
    kw("$FIL", Acquisition, Text, "Name of the dataset on its original system"),
    personal(kw("$INST", Acquisition, Text, "Institution at which the data was acquired")),
    kw("$LAST_MODIFIED", Acquisition, Text, "Timestamp of the last modification"),
    personal(kw("$LAST_MODIFIER", Acquisition, Text, "Name of the person who last modified the dataset")),
    kw("$LOST", Acquisition, Integer, "Events lost due to computer busy"),
    personal(kw("$OP", Acquisition, Text, "Name of the instrument operator")),
    kw("$ORIGINALITY", Acquisition, Text, "Whether the dataset has been modified since acquisition"),
    kw("$PLATEID", Acquisition, Text, "Plate identifier"),
    kw("$PLATENAME", Acquisition, Text, "Plate name"),
    kw("$PROJ", Acquisition, Text, "Project name"),
    kw("$SMNO", Acquisition, Text, "Specimen (tube) label"),
    deprecated(kw("$SPILL", Dataset, Delimited, "Spillover matrix (vendor spelling, superseded by $SPILLOVER)")),
    kw("$SPILLOVER", Dataset, Delimited, "Fluorescence spillover matrix"),
    personal(kw("$SRC", Acquisition, Text, "Source of the specimen, often a patient identifier")),
    kw("$SYS", Acquisition, Text, "Acquisition computer and operating system"),
    kw("$TIMESTEP", Dataset, Float, "Time step of the time parameter in seconds"),
    kw("$TR", Dataset, Delimited, "Trigger parameter and threshold"),
    kw("$VOL", Acquisition, Float, "Volume of sample consumed, in nanoliters"),
    kw("$WELLID", Acquisition, Text, "Well identifier"),
    required(kw("$PnB", Parameter, Integer, "Bits reserved for parameter n")),
    kw("$PnD", Parameter, Delimited, "Suggested display scale for parameter n"),
    kw("$PnE", Parameter, Delimited, "Amplification exponent (decades, offset) for parameter n"),
    kw("$PnF", Parameter, Text, "Optical filter for parameter n"),
    kw("$PnG", Parameter, Float, "Linear amplifier gain for parameter n"),
    kw("$PnL", Parameter, Delimited, "Excitation wavelengths for parameter n"),
    required(kw("$PnN", Parameter, Text, "Short name of parameter n")),
    kw("$PnO", Parameter, Integer, "Excitation power for parameter n"),
    kw("$PnP", Parameter, Integer, "Percent of emitted light collected for parameter n"),
    required(kw("$PnR", Parameter, Integer, "Maximum range of parameter n")),
    kw("$PnS", Parameter, Text, "Long stain name of parameter n"),
    kw("$PnT", Parameter, Text, "Detector type for parameter n"),
    kw("$PnV", Parameter, Float, "Detector voltage for parameter n"),
];

/// A successful vocabulary lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedKeyword {
    pub spec: &'static KeywordSpec,
    /// The 1-based index when the name matched a parametric template
    pub parameter_index: Option<usize>,
}

/// Resolve a keyword name against the table, matching both literal names
/// and parametric templates (`$P7N` resolves to the `$PnN` row).
pub fn lookup(name: &str) -> Option<ResolvedKeyword> {
    let name = name.trim();
    for spec in KEYWORDS {
        if let Some(n_pos) = spec.name.find('n') {
            if let Some(index) = match_template(spec.name, n_pos, name) {
                return Some(ResolvedKeyword {
                    spec,
                    parameter_index: Some(index),
                });
            }
        } else if spec.name.eq_ignore_ascii_case(name) {
            return Some(ResolvedKeyword {
                spec,
                parameter_index: None,
            });
        }
    }
    None
}

fn match_template(template: &str, n_pos: usize, name: &str) -> Option<usize> {
    let prefix = &template[..n_pos];
    let suffix = &template[n_pos + 1..];
    if name.len() <= prefix.len() + suffix.len() {
        return None;
    }
    if !name[..prefix.len()].eq_ignore_ascii_case(prefix) {
        return None;
    }
    if !name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix) {
        return None;
    }
    let middle = &name[prefix.len()..name.len() - suffix.len()];
    if !middle.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    middle.parse::<usize>().ok().filter(|&n| n >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_lookup() {
        let resolved = lookup("$DATATYPE").unwrap();
        assert_eq!(resolved.spec.name, "$DATATYPE");
        assert!(resolved.spec.required);
        assert_eq!(resolved.parameter_index, None);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(lookup("$datatype").is_some());
        assert!(lookup(" $Tot ").is_some());
    }

    #[test]
    fn test_template_lookup() {
        let resolved = lookup("$P7N").unwrap();
        assert_eq!(resolved.spec.name, "$PnN");
        assert_eq!(resolved.parameter_index, Some(7));
        assert_eq!(resolved.spec.category, KeywordCategory::Parameter);

        let resolved = lookup("$P12B").unwrap();
        assert_eq!(resolved.spec.name, "$PnB");
        assert_eq!(resolved.parameter_index, Some(12));
    }

    #[test]
    fn test_template_rejects_non_numeric_index() {
        assert!(lookup("$PxN").is_none());
        assert!(lookup("$PN").is_none());
        assert!(lookup("$P0N").is_none());
    }

    #[test]
    fn test_unknown_vendor_keyword_is_none() {
        assert!(lookup("FJ_FCS_VERSION").is_none());
        assert!(lookup("$NOTAKEYWORD").is_none());
    }

    #[test]
    fn test_flags() {
        assert!(lookup("$SRC").unwrap().spec.personal);
        assert!(lookup("$COMP").unwrap().spec.deprecated);
        assert!(!lookup("$CYT").unwrap().spec.required);
    }
}
