use std::collections::BTreeSet;
use std::str::FromStr;

use super::models::SourceType;

pub const DEFAULT_LIMIT: u32 = 50;

/// Confirmation filter. `Any` is never sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    Any,
    Confirmed,
    Pending,
}

impl Confirmation {
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            Confirmation::Any => None,
            Confirmation::Confirmed => Some("true"),
            Confirmation::Pending => Some("false"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Confirmation::Any => "all",
            Confirmation::Confirmed => "confirmed",
            Confirmation::Pending => "pending",
        }
    }

    /// Next value in the any -> confirmed -> pending cycle.
    pub fn cycle(self) -> Self {
        match self {
            Confirmation::Any => Confirmation::Confirmed,
            Confirmation::Confirmed => Confirmation::Pending,
            Confirmation::Pending => Confirmation::Any,
        }
    }
}

impl FromStr for Confirmation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(Confirmation::Any),
            "true" | "confirmed" => Ok(Confirmation::Confirmed),
            "false" | "pending" => Ok(Confirmation::Pending),
            other => Err(format!(
                "unknown confirmation filter '{}' (expected any, true or false)",
                other
            )),
        }
    }
}

/// What the analyst wants to see.
///
/// Everything except `starred_only` is evaluated by the server; `starred_only`
/// is applied locally as a final pass over whatever the server returned.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub query: String,
    pub min_hotness: f64,
    pub confirmation: Confirmation,
    pub types: BTreeSet<SourceType>,
    pub starred_only: bool,
    pub limit: Option<u32>,
    pub event_type: Option<String>,
    pub impact_side: Option<String>,
    pub min_materiality_ai: f64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            query: String::new(),
            min_hotness: 0.0,
            confirmation: Confirmation::Any,
            types: SourceType::ALL.into_iter().collect(),
            starred_only: false,
            limit: Some(DEFAULT_LIMIT),
            event_type: None,
            impact_side: None,
            min_materiality_ai: 0.0,
        }
    }
}

impl FilterCriteria {
    /// Query parameters for `GET /events`, omitting criteria at their
    /// default or empty value. The type set is always sent verbatim unless
    /// it is empty.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        let query = self.query.trim();
        if !query.is_empty() {
            pairs.push(("q", query.to_string()));
        }
        if self.min_hotness > 0.0 {
            pairs.push(("min_hotness", format_unit(self.min_hotness)));
        }
        if let Some(confirmed) = self.confirmation.as_query() {
            pairs.push(("confirmed", confirmed.to_string()));
        }
        if !self.types.is_empty() {
            let joined = self
                .types
                .iter()
                .map(SourceType::as_str)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("types", joined));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(event_type) = non_empty(&self.event_type) {
            pairs.push(("event_type", event_type.to_string()));
        }
        if let Some(impact_side) = non_empty(&self.impact_side) {
            pairs.push(("impact_side", impact_side.to_string()));
        }
        if self.min_materiality_ai > 0.0 {
            pairs.push(("min_materiality_ai", format_unit(self.min_materiality_ai)));
        }

        pairs
    }

    /// Whether two criteria would produce the same server request.
    pub fn same_server_query(&self, other: &FilterCriteria) -> bool {
        self.to_query_pairs() == other.to_query_pairs()
    }

    pub fn apply(&mut self, patch: CriteriaPatch) {
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(min_hotness) = patch.min_hotness {
            self.min_hotness = clamp_unit(min_hotness);
        }
        if let Some(confirmation) = patch.confirmation {
            self.confirmation = confirmation;
        }
        if let Some(types) = patch.types {
            self.types = types;
        }
        if let Some(starred_only) = patch.starred_only {
            self.starred_only = starred_only;
        }
        if let Some(limit) = patch.limit {
            self.limit = limit;
        }
        if let Some(event_type) = patch.event_type {
            self.event_type = event_type;
        }
        if let Some(impact_side) = patch.impact_side {
            self.impact_side = impact_side;
        }
        if let Some(min_materiality_ai) = patch.min_materiality_ai {
            self.min_materiality_ai = clamp_unit(min_materiality_ai);
        }
    }

    /// Flip membership of one source type.
    pub fn toggle_type(&mut self, kind: SourceType) {
        if !self.types.remove(&kind) {
            self.types.insert(kind);
        }
    }
}

/// Partial update for [`FilterCriteria`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaPatch {
    pub query: Option<String>,
    pub min_hotness: Option<f64>,
    pub confirmation: Option<Confirmation>,
    pub types: Option<BTreeSet<SourceType>>,
    pub starred_only: Option<bool>,
    pub limit: Option<Option<u32>>,
    pub event_type: Option<Option<String>>,
    pub impact_side: Option<Option<String>>,
    pub min_materiality_ai: Option<f64>,
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Threshold as sent on the wire: at most four decimals, no trailing zeros.
fn format_unit(value: f64) -> String {
    let fixed = format!("{:.4}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(criteria: &FilterCriteria) -> Vec<(&'static str, String)> {
        criteria.to_query_pairs()
    }

    #[test]
    fn defaults_send_only_types_and_limit() {
        let criteria = FilterCriteria::default();
        assert_eq!(
            pairs(&criteria),
            vec![
                ("types", "regulator,ir,news,exchange,aggregator".to_string()),
                ("limit", "50".to_string()),
            ]
        );
    }

    #[test]
    fn hotness_and_confirmation_are_forwarded() {
        let mut criteria = FilterCriteria::default();
        criteria.apply(CriteriaPatch {
            min_hotness: Some(0.5),
            confirmation: Some(Confirmation::Confirmed),
            ..Default::default()
        });

        let sent = pairs(&criteria);
        assert_eq!(sent[0], ("min_hotness", "0.5".to_string()));
        assert_eq!(sent[1], ("confirmed", "true".to_string()));
    }

    #[test]
    fn whitespace_query_and_empty_types_are_omitted() {
        let mut criteria = FilterCriteria::default();
        criteria.apply(CriteriaPatch {
            query: Some("   ".into()),
            types: Some(BTreeSet::new()),
            limit: Some(None),
            confirmation: Some(Confirmation::Pending),
            ..Default::default()
        });

        assert_eq!(pairs(&criteria), vec![("confirmed", "false".to_string())]);
    }

    #[test]
    fn query_is_trimmed_and_types_keep_declaration_order() {
        let mut criteria = FilterCriteria::default();
        criteria.apply(CriteriaPatch {
            query: Some("  sec fine ".into()),
            types: Some([SourceType::News, SourceType::Regulator].into_iter().collect()),
            event_type: Some(Some("enforcement".into())),
            ..Default::default()
        });

        assert_eq!(
            pairs(&criteria),
            vec![
                ("q", "sec fine".to_string()),
                ("types", "regulator,news".to_string()),
                ("limit", "50".to_string()),
                ("event_type", "enforcement".to_string()),
            ]
        );
    }

    #[test]
    fn accumulated_threshold_steps_go_out_clean() {
        let mut criteria = FilterCriteria::default();
        for _ in 0..3 {
            let next = criteria.min_hotness + 0.05;
            criteria.apply(CriteriaPatch {
                min_hotness: Some(next),
                ..Default::default()
            });
        }
        assert_ne!(criteria.min_hotness, 0.15);

        let sent = pairs(&criteria);
        assert_eq!(sent[0], ("min_hotness", "0.15".to_string()));

        criteria.apply(CriteriaPatch {
            min_hotness: Some(1.0),
            min_materiality_ai: Some(0.7000000000000001),
            ..Default::default()
        });
        let sent = pairs(&criteria);
        assert_eq!(sent[0], ("min_hotness", "1".to_string()));
        assert!(sent.contains(&("min_materiality_ai", "0.7".to_string())));
    }

    #[test]
    fn hotness_is_clamped() {
        let mut criteria = FilterCriteria::default();
        criteria.apply(CriteriaPatch {
            min_hotness: Some(3.0),
            ..Default::default()
        });
        assert_eq!(criteria.min_hotness, 1.0);
    }

    #[test]
    fn starred_only_does_not_change_server_query() {
        let before = FilterCriteria::default();
        let mut after = before.clone();
        let patch = CriteriaPatch {
            starred_only: Some(true),
            ..Default::default()
        };
        after.apply(patch);

        assert!(after.starred_only);
        assert!(before.same_server_query(&after));
    }

    #[test]
    fn toggle_type_flips_membership() {
        let mut criteria = FilterCriteria::default();
        criteria.toggle_type(SourceType::Ir);
        assert!(!criteria.types.contains(&SourceType::Ir));
        criteria.toggle_type(SourceType::Ir);
        assert!(criteria.types.contains(&SourceType::Ir));
    }

    #[test]
    fn confirmation_parses_and_cycles() {
        assert_eq!("true".parse::<Confirmation>().unwrap(), Confirmation::Confirmed);
        assert_eq!("pending".parse::<Confirmation>().unwrap(), Confirmation::Pending);
        assert_eq!("".parse::<Confirmation>().unwrap(), Confirmation::Any);
        assert!("maybe".parse::<Confirmation>().is_err());
        assert_eq!(Confirmation::Pending.cycle(), Confirmation::Any);
    }
}
