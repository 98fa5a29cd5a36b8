//! Beacon protocol request/response types
//!
//! JSON shapes served by the query service. Field names follow the beacon
//! protocol (camelCase, plus the literal `variantCount>10` key).

use serde::{Deserialize, Serialize};

use crate::config::{BeaconMetadata, Dataset, Organization};
use crate::engine::{Answer, RawQuery};

/// Echo of the allele request in every query response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlleleRequest {
    pub reference_name: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub reference_bases: Option<String>,
    pub alternate_bases: Option<String>,
    pub assembly_id: String,
}

impl AlleleRequest {
    /// Echo of a raw request, with the assembly defaulted
    pub fn from_raw(raw: &RawQuery, default_assembly: &str) -> Self {
        Self {
            reference_name: raw.chromosome.clone(),
            start: raw.start.clone(),
            end: raw.end.clone(),
            reference_bases: raw.reference.clone(),
            alternate_bases: raw.alternate.clone(),
            assembly_id: raw
                .assembly
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| default_assembly.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconError {
    pub error_code: u16,
    pub error_message: String,
}

/// Disclosed aggregate of one query
///
/// Fields the client's tiers do not cover keep neutral values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAlleleResponse {
    pub exists: bool,
    pub sample_count: u32,
    pub variant_count: u32,
    #[serde(rename = "variantCount>10")]
    pub variant_count_greater_than_ten: bool,
    pub frequency: f64,
    pub coarse_phenotype: Vec<String>,
    pub phenotype: Vec<String>,
    pub case_name: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconResponse {
    pub beacon_id: String,
    pub api_version: String,
    /// `null` when the request was rejected
    pub exists: Option<bool>,
    pub error: Option<BeaconError>,
    pub allele_request: AlleleRequest,
    pub dataset_allele_responses: Vec<DatasetAlleleResponse>,
}

impl BeaconResponse {
    pub fn answered(beacon: &BeaconMetadata, raw: &RawQuery, answer: &Answer) -> Self {
        let aggregate = &answer.aggregate;
        let dataset_allele_responses = if aggregate.exists {
            vec![DatasetAlleleResponse {
                exists: aggregate.exists,
                sample_count: aggregate.sample_count,
                variant_count: aggregate.variant_count,
                variant_count_greater_than_ten: aggregate.variant_count_greater_than_ten,
                frequency: aggregate.frequency,
                coarse_phenotype: aggregate.coarse_phenotypes.clone(),
                phenotype: aggregate.phenotypes.clone(),
                case_name: aggregate.case_indices.clone(),
            }]
        } else {
            Vec::new()
        };

        Self {
            beacon_id: beacon.id.clone(),
            api_version: beacon.api_version.clone(),
            exists: Some(aggregate.exists),
            error: None,
            allele_request: AlleleRequest::from_raw(raw, &answer.assembly),
            dataset_allele_responses,
        }
    }

    pub fn rejected(
        beacon: &BeaconMetadata,
        allele_request: AlleleRequest,
        error_code: u16,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            beacon_id: beacon.id.clone(),
            api_version: beacon.api_version.clone(),
            exists: None,
            error: Some(BeaconError {
                error_code,
                error_message: error_message.into(),
            }),
            allele_request,
            dataset_allele_responses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInfo {
    pub id: String,
    pub name: String,
    pub contact_url: String,
}

impl From<&Organization> for OrganizationInfo {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id.clone(),
            name: org.name.clone(),
            contact_url: org.contact_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    pub assembly_id: String,
    pub create_date_time: String,
    pub update_date_time: String,
}

impl From<&Dataset> for DatasetInfo {
    fn from(dataset: &Dataset) -> Self {
        Self {
            id: dataset.id.clone(),
            name: dataset.name.clone(),
            assembly_id: dataset.assembly_id.clone(),
            create_date_time: dataset.create_date_time.clone(),
            update_date_time: dataset.update_date_time.clone(),
        }
    }
}

/// Beacon self-description (info endpoint)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconInfo {
    pub id: String,
    pub name: String,
    pub api_version: String,
    pub organization: OrganizationInfo,
    pub datasets: Vec<DatasetInfo>,
}

impl From<&BeaconMetadata> for BeaconInfo {
    fn from(beacon: &BeaconMetadata) -> Self {
        Self {
            id: beacon.id.clone(),
            name: beacon.name.clone(),
            api_version: beacon.api_version.clone(),
            organization: OrganizationInfo::from(&beacon.organization),
            datasets: beacon.datasets.iter().map(DatasetInfo::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Aggregate, ValidatedQuery};
    use crate::variant::Chromosome;
    use serde_json::json;
    use uuid::Uuid;

    fn answer(aggregate: Aggregate) -> Answer {
        Answer {
            request_id: Uuid::new_v4(),
            client_name: "public".to_string(),
            query: ValidatedQuery {
                chromosome: Chromosome::Autosome(1),
                start: 12345,
                end: 12346,
                reference: "C".to_string(),
                alternate: "T".to_string(),
            },
            assembly: "GRCh37".to_string(),
            aggregate,
            touched_cases: vec![],
        }
    }

    #[test]
    fn test_answered_response_json_shape() {
        let raw = RawQuery::new("1", "12345", "12346", "C", "T");
        let aggregate = Aggregate {
            exists: true,
            sample_count: 1,
            variant_count: 1,
            variant_count_greater_than_ten: false,
            frequency: 0.5,
            coarse_phenotypes: vec![],
            phenotypes: vec!["HP:0001049".to_string()],
            case_indices: vec![],
        };
        let response = BeaconResponse::answered(&BeaconMetadata::default(), &raw, &answer(aggregate));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["beaconId"], "varbeacon");
        assert_eq!(value["exists"], true);
        assert_eq!(value["error"], serde_json::Value::Null);
        assert_eq!(
            value["alleleRequest"],
            json!({"referenceName": "1", "start": "12345", "end": "12346",
                   "referenceBases": "C", "alternateBases": "T", "assemblyId": "GRCh37"})
        );
        let allele = &value["datasetAlleleResponses"][0];
        assert_eq!(allele["variantCount>10"], false);
        assert_eq!(allele["sampleCount"], 1);
        assert_eq!(allele["frequency"], 0.5);
        assert_eq!(allele["phenotype"], json!(["HP:0001049"]));
        assert_eq!(allele["caseName"], json!([]));
    }

    #[test]
    fn test_absent_variant_has_no_allele_responses() {
        let raw = RawQuery::new("1", "1", "2", "A", "G");
        let response =
            BeaconResponse::answered(&BeaconMetadata::default(), &raw, &answer(Aggregate::default()));
        assert_eq!(response.exists, Some(false));
        assert!(response.dataset_allele_responses.is_empty());
    }

    #[test]
    fn test_rejected_response() {
        let raw = RawQuery::default();
        let response = BeaconResponse::rejected(
            &BeaconMetadata::default(),
            AlleleRequest::from_raw(&raw, "GRCh37"),
            400,
            "The input format is invalid.",
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["exists"], serde_json::Value::Null);
        assert_eq!(value["error"]["errorCode"], 400);
        assert_eq!(value["alleleRequest"]["assemblyId"], "GRCh37");
        assert_eq!(value["alleleRequest"]["referenceName"], serde_json::Value::Null);
    }

    #[test]
    fn test_info_from_metadata() {
        let mut beacon = BeaconMetadata::default();
        beacon.organization.contact_url = "mailto:beacon@example.org".to_string();
        beacon.datasets.push(Dataset {
            id: "cases".to_string(),
            assembly_id: "GRCh37".to_string(),
            ..Default::default()
        });
        let value = serde_json::to_value(BeaconInfo::from(&beacon)).unwrap();
        assert_eq!(value["apiVersion"], "v1.0.0");
        assert_eq!(value["organization"]["contactUrl"], "mailto:beacon@example.org");
        assert_eq!(value["datasets"][0]["assemblyId"], "GRCh37");
    }
}
