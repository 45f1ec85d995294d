//! Typed records of the catalog and of a dataset's address tree
//!
//! The persisted JSON uses camelCase field names. Fields the crate does not
//! interpret are carried through untouched in `extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw validation result of a dataset's CSV file. No structure is assumed.
pub type Report = Value;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Malformed,
    #[default]
    Unknown,
    /// Spelling written by older catalog builds, kept as read.
    #[serde(rename = "unknow")]
    LegacyUnknown,
}

impl Status {
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown | Self::LegacyUnknown)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Organization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the catalog list.
///
/// A stored list reads back as it was written: absent fields stay absent,
/// `valid` and `error` keep an explicit `null`, and fields this crate does
/// not interpret land in `extra`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_label: Option<String>,
    /// URL of the CSV resource the dataset was validated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    /// Stored as written. Use [`Dataset::numeros`] for the count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeros_count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub valid: Option<Option<bool>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub error: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Dataset {
    /// Number of numeros, `None` when the stored value is not a number.
    /// Negative numbers count as zero and fractions are truncated.
    pub fn numeros(&self) -> Option<u64> {
        match self.numeros_count.as_ref()? {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.max(0.0) as u64)
            }),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> Option<bool> {
        self.valid.flatten()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref()?.as_deref()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Point {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Position {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<Point>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Numero {
    pub numero: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffixe: Option<String>,
    /// `None` when the record has no `positions` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<Position>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Numero {
    pub fn new(numero: u32, suffixe: Option<&str>) -> Self {
        Self {
            numero,
            suffixe: suffixe.map(Into::into),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Voie {
    #[serde(rename = "codeVoie")]
    pub code: String,
    #[serde(rename = "nomVoie", default, skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    /// `None` when the record has no `numeros` field at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeros: Option<BTreeMap<String, Numero>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Commune {
    pub code: String,
    #[serde(default)]
    pub voies: BTreeMap<String, Voie>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole normalized tree of one dataset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DatasetData {
    #[serde(default)]
    pub communes: BTreeMap<String, Commune>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetData {
    pub fn numeros_count(&self) -> u64 {
        self.communes
            .values()
            .flat_map(|commune| commune.voies.values())
            .filter_map(|voie| voie.numeros.as_ref())
            .map(|numeros| numeros.len() as u64)
            .sum()
    }
}

/// Reference metadata joined into communes at read time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommuneReference {
    pub nom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
    #[serde(
        default,
        alias = "departement",
        skip_serializing_if = "Option::is_none"
    )]
    pub code_departement: Option<String>,
    #[serde(default, alias = "region", skip_serializing_if = "Option::is_none")]
    pub code_region: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes_postaux: Vec<String>,
}

impl CommuneReference {
    pub const FIELDS: &'static [&'static str] = &[
        "nom",
        "population",
        "codeDepartement",
        "codeRegion",
        "codesPostaux",
    ];
}

/// A commune (or commune view) with its reference metadata merged in.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Enriched<C> {
    #[serde(flatten)]
    pub commune: C,
    #[serde(flatten)]
    pub reference: CommuneReference,
}

impl<C> Enriched<C> {
    pub fn map<D>(self, f: impl FnOnce(C) -> D) -> Enriched<D> {
        Enriched {
            commune: f(self.commune),
            reference: self.reference,
        }
    }
}

/// Commune without its voies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CommuneSummary {
    pub code: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Voie without its numeros.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VoieSummary {
    #[serde(rename = "codeVoie")]
    pub code: String,
    #[serde(rename = "nomVoie", default, skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Commune whose voies are listed in code order, without numeros.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CommuneDetail {
    pub code: String,
    pub voies: Vec<VoieSummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummaryView {
    pub communes: Vec<Enriched<CommuneSummary>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type CommuneView = Enriched<CommuneDetail>;

/// Voie with its numeros in sorted order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VoieView {
    #[serde(rename = "codeVoie")]
    pub code: String,
    #[serde(rename = "nomVoie", default, skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeros: Option<Vec<Numero>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Voie {
    pub fn into_summary(self) -> VoieSummary {
        VoieSummary {
            code: self.code,
            nom: self.nom,
            extra: self.extra,
        }
    }

    pub fn into_view(self) -> VoieView {
        VoieView {
            code: self.code,
            nom: self.nom,
            numeros: self
                .numeros
                .map(|numeros| crate::sort::sort_by_numero(numeros.into_values().collect())),
            extra: self.extra,
        }
    }
}

impl Commune {
    pub fn into_summary(self) -> CommuneSummary {
        CommuneSummary {
            code: self.code,
            extra: self.extra,
        }
    }

    pub fn into_detail(self) -> CommuneDetail {
        CommuneDetail {
            code: self.code,
            voies: self.voies.into_values().map(Voie::into_summary).collect(),
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_numeros_count_tolerates_garbage() {
        let datasets: Vec<Dataset> = serde_json::from_value(json!([
            {"id": "a", "numerosCount": 3},
            {"id": "b", "numerosCount": null},
            {"id": "c", "numerosCount": "many"},
            {"id": "d"},
        ]))
        .unwrap();
        let counts: Vec<_> = datasets.iter().map(Dataset::numeros).collect();
        assert_eq!(counts, vec![Some(3), None, None, None]);
        assert_eq!(datasets[2].numeros_count, Some(json!("many")));
    }

    #[test]
    fn test_legacy_status_spelling() {
        let dataset: Dataset =
            serde_json::from_value(json!({"id": "a", "status": "unknow"})).unwrap();
        let status = dataset.status.unwrap();
        assert!(status.is_unknown());
        assert_eq!(serde_json::to_value(status).unwrap(), json!("unknow"));
        assert_eq!(serde_json::to_value(Status::Unknown).unwrap(), json!("unknown"));
    }

    #[test]
    fn test_dataset_keeps_nulls_and_unknown_fields() {
        let raw = json!({
            "url": "https://example.org/a.csv",
            "report": {"errors": []},
            "status": "ok",
            "error": null,
            "id": "a",
            "title": "A",
            "valid": null,
            "organization": {"name": "X", "id": "org1"},
        });
        let dataset: Dataset = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(dataset.is_valid(), None);
        assert_eq!(dataset.error_message(), None);
        assert_eq!(dataset.extra["report"], json!({"errors": []}));
        assert_eq!(
            dataset.organization.as_ref().unwrap().extra["id"],
            json!("org1")
        );
        assert_eq!(serde_json::to_value(&dataset).unwrap(), raw);
    }

    #[test]
    fn test_dataset_without_id_or_title() {
        let dataset: Dataset =
            serde_json::from_value(json!({"numerosCount": 3, "license": "A", "title": null}))
                .unwrap();
        assert_eq!(dataset.id, "");
        assert_eq!(dataset.title, None);
        assert_eq!(dataset.numeros(), Some(3));
        assert_eq!(
            serde_json::to_value(&dataset).unwrap(),
            json!({"numerosCount": 3, "license": "A"})
        );
    }

    #[test]
    fn test_voie_distinguishes_absent_and_empty_numeros() {
        let absent: Voie = serde_json::from_value(json!({"codeVoie": "0001"})).unwrap();
        let empty: Voie =
            serde_json::from_value(json!({"codeVoie": "0002", "numeros": {}})).unwrap();
        assert_eq!(absent.numeros, None);
        assert_eq!(empty.numeros, Some(BTreeMap::new()));
        assert!(
            serde_json::to_value(absent.into_view())
                .unwrap()
                .get("numeros")
                .is_none()
        );
        assert_eq!(
            serde_json::to_value(empty.into_view()).unwrap()["numeros"],
            json!([])
        );
    }

    #[test]
    fn test_numero_keeps_empty_positions() {
        let raw = json!({"numero": 4, "positions": []});
        let numero: Numero = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(numero.positions, Some(vec![]));
        assert_eq!(serde_json::to_value(&numero).unwrap(), raw);
        assert_eq!(
            serde_json::to_value(Numero::new(4, None)).unwrap(),
            json!({"numero": 4})
        );
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let data: DatasetData = serde_json::from_value(json!({
            "communes": {
                "27115": {"code": "27115", "voies": {}, "custom": 1}
            },
            "source": "bal"
        }))
        .unwrap();
        assert_eq!(data.extra["source"], json!("bal"));
        assert_eq!(data.communes["27115"].extra["custom"], json!(1));
    }
}
