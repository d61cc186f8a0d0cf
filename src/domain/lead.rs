//! Lead Records
//!
//! CRM entities paged by the list core. Only the fields the lists filter,
//! sort and score by are modeled here.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::filter::FilterValue;
use super::record::{Identified, Record};
use super::score::{ScoreFactors, score_opportunity};

/// Unique identifier for a lead
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct LeadId(pub Arc<str>);

impl LeadId {
    /// Create a new LeadId from a string
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh time-ordered id
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::now_v7().to_string())
    }

    /// Get the underlying string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LeadId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of collection a list pages through; part of every cache key
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Leads,
    Valoraciones,
    Mandates,
    Contacts,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Leads => "leads",
            EntityKind::Valoraciones => "valoraciones",
            EntityKind::Mandates => "mandates",
            EntityKind::Contacts => "contacts",
        }
    }
}

/// A sell-side or buy-side lead
#[derive(Clone, Debug, PartialEq)]
pub struct Lead {
    pub id: LeadId,
    pub company: Arc<str>,
    pub sector: Arc<str>,
    pub stage: Arc<str>,
    pub created_at: DateTime<Utc>,
    pub factors: ScoreFactors,
}

impl Lead {
    /// Create a lead with no score factors
    pub fn new(
        id: impl Into<LeadId>,
        company: impl Into<Arc<str>>,
        sector: impl Into<Arc<str>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            company: company.into(),
            sector: sector.into(),
            stage: "nuevo".into(),
            created_at,
            factors: ScoreFactors::default(),
        }
    }

    pub fn with_stage(mut self, stage: impl Into<Arc<str>>) -> Self {
        self.stage = stage.into();
        self
    }

    pub fn with_factors(mut self, factors: ScoreFactors) -> Self {
        self.factors = factors;
        self
    }

    /// Composite opportunity score with default weights
    pub fn score(&self) -> u8 {
        score_opportunity(Some(&self.factors)).score
    }
}

impl Identified for Lead {
    type Key = LeadId;

    fn key(&self) -> LeadId {
        self.id.clone()
    }
}

impl Record for Lead {
    fn field(&self, name: &str) -> Option<FilterValue> {
        let optional = |v: Option<f64>| v.map_or(FilterValue::Null, FilterValue::Float);
        let value = match name {
            "id" => FilterValue::Text(self.id.to_string()),
            "company" => FilterValue::Text(self.company.to_string()),
            "sector" => FilterValue::Text(self.sector.to_string()),
            "stage" => FilterValue::Text(self.stage.to_string()),
            "created_at" => {
                FilterValue::Text(self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            "score" => FilterValue::Int(i64::from(self.score())),
            "sector_attractiveness" => optional(self.factors.sector_attractiveness),
            "investment_capacity" => optional(self.factors.investment_capacity),
            "urgency" => optional(self.factors.urgency),
            "strategic_fit" => optional(self.factors.strategic_fit),
            _ => return None,
        };
        Some(value)
    }
}

const SAMPLE_SECTORS: [&str; 5] = ["industria", "tecnologia", "alimentacion", "salud", "retail"];
const SAMPLE_STAGES: [&str; 4] = ["nuevo", "contactado", "cualificado", "descartado"];

/// Deterministic sample leads, one minute apart, `newest` first
///
/// Ids are `lead-0000`, `lead-0001`, ... with `lead-0000` the newest.
pub fn sample_leads(count: usize, newest: DateTime<Utc>) -> Vec<Lead> {
    (0..count)
        .map(|i| {
            let seed = i as f64;
            Lead::new(
                LeadId::new(format!("lead-{i:04}")),
                format!("Empresa {i:04} SL"),
                SAMPLE_SECTORS[i % SAMPLE_SECTORS.len()],
                newest - Duration::minutes(i as i64),
            )
            .with_stage(SAMPLE_STAGES[i % SAMPLE_STAGES.len()])
            .with_factors(ScoreFactors::new(
                (seed * 37.0) % 101.0,
                (seed * 53.0) % 101.0,
                (seed * 17.0) % 101.0,
                (seed * 71.0) % 101.0,
            ))
        })
        .collect()
}
