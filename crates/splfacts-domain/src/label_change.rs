//! Safety-related label changes (SRLC) published outside the label archive
//!
//! An SRLC record announces new warnings or boxed-warning text for an
//! application number. Its terms are matched like label sections and then
//! folded into every product carrying that application number.

use serde::{Deserialize, Serialize};

use crate::date::LabelDate;
use crate::document::SectionText;

/// Query parameters that name the drug in an SRLC page URL
const DRUG_ID_PARAMS: [&str; 3] = ["drug_id", "drugid", "id"];

/// One safety-related label change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyLabelChange {
    /// Drug name as published
    #[serde(default)]
    pub drug_name: String,

    /// Active ingredient as published
    #[serde(default)]
    pub active_ingredient: String,

    /// Application (NDA/BLA) number the change applies to
    pub application_number: u32,

    /// Date the supplement was approved
    #[serde(default)]
    pub supplement_date: Option<LabelDate>,

    /// Date the change database was last updated
    #[serde(default)]
    pub database_updated: Option<LabelDate>,

    /// Page the change was published on
    #[serde(default)]
    pub url: String,

    /// Changed section texts (warnings and boxed warnings)
    #[serde(default)]
    pub sections: Vec<SectionText>,
}

impl SafetyLabelChange {
    /// Source id terms from this change are attributed to
    pub fn source_id(&self) -> String {
        format!("NDA0{}", self.application_number)
    }

    /// Date the change's terms are observed on: the supplement date, else
    /// the database update date
    pub fn observed_on(&self) -> Option<LabelDate> {
        self.supplement_date.or(self.database_updated)
    }

    /// Drug id from the page URL query.
    ///
    /// Looks for a known drug id parameter first and falls back to the
    /// second query pair.
    pub fn drug_id(&self) -> Option<i64> {
        let (_, query) = self.url.split_once('?')?;
        let pairs: Vec<(&str, &str)> = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .collect();

        let named = pairs
            .iter()
            .find(|(key, _)| DRUG_ID_PARAMS.iter().any(|p| key.eq_ignore_ascii_case(p)));
        named
            .or_else(|| pairs.get(1))
            .and_then(|(_, value)| value.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(url: &str) -> SafetyLabelChange {
        SafetyLabelChange {
            drug_name: "Taxol".to_string(),
            active_ingredient: "paclitaxel".to_string(),
            application_number: 20262,
            supplement_date: None,
            database_updated: None,
            url: url.to_string(),
            sections: vec![],
        }
    }

    #[test]
    fn test_drug_id_from_named_param() {
        let c = change("https://example.org/safety/index.cfm?event=searchdetail.page&DrugID=1234");
        assert_eq!(c.drug_id(), Some(1234));
        assert_eq!(change("https://example.org/x?id=77").drug_id(), Some(77));
    }

    #[test]
    fn test_drug_id_falls_back_to_second_pair() {
        assert_eq!(change("https://example.org/x?page=detail&key=55").drug_id(), Some(55));
        assert_eq!(change("https://example.org/x?page=detail").drug_id(), None);
        assert_eq!(change("https://example.org/x").drug_id(), None);
        assert_eq!(change("https://example.org/x?a=1&b=two").drug_id(), None);
    }

    #[test]
    fn test_source_and_date() {
        let json = r#"{"application_number": 20262, "database_updated": "2020-02-01",
            "sections": [{"kind": "boxed_warning", "text": "Anaphylaxis"}]}"#;
        let c: SafetyLabelChange = serde_json::from_str(json).unwrap();
        assert_eq!(c.source_id(), "NDA020262");
        assert_eq!(c.observed_on(), LabelDate::from_ymd_opt(2020, 2, 1));
        assert!(c.drug_name.is_empty());
    }
}
