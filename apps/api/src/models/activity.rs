use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GxpScope {
    Yes,
    No,
}

impl GxpScope {
    pub fn as_str(self) -> &'static str {
        match self {
            GxpScope::Yes => "Yes",
            GxpScope::No => "No",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

/// Any status may move to any other; there is no enforced ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    Planned,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Planned => "Planned",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
            Status::Cancelled => "Cancelled",
            Status::OnHold => "On Hold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    #[serde(rename = "Corp IT Cybersecurity")]
    Cybersecurity,
    #[serde(rename = "Corp IT Helpdesk")]
    Helpdesk,
    #[serde(rename = "Corp IT Compliance")]
    Compliance,
    #[serde(rename = "Corp IT Application Solutions")]
    ApplicationSolutions,
    #[serde(rename = "Corp IT Business Technology")]
    BusinessTechnology,
    #[serde(rename = "Corp IT OctaERP Solution")]
    OctaErpSolution,
    #[serde(rename = "Local IT")]
    LocalIt,
}

impl Department {
    pub fn as_str(self) -> &'static str {
        match self {
            Department::Cybersecurity => "Corp IT Cybersecurity",
            Department::Helpdesk => "Corp IT Helpdesk",
            Department::Compliance => "Corp IT Compliance",
            Department::ApplicationSolutions => "Corp IT Application Solutions",
            Department::BusinessTechnology => "Corp IT Business Technology",
            Department::OctaErpSolution => "Corp IT OctaERP Solution",
            Department::LocalIt => "Local IT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItType {
    #[serde(rename = "Corp IT")]
    CorpIt,
    #[serde(rename = "Local IT")]
    LocalIt,
}

impl ItType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItType::CorpIt => "Corp IT",
            ItType::LocalIt => "Local IT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GxpImpact {
    #[serde(rename = "GxP")]
    Gxp,
    #[serde(rename = "non-GxP")]
    NonGxp,
    #[serde(rename = "indirect GxP")]
    IndirectGxp,
}

impl GxpImpact {
    pub fn as_str(self) -> &'static str {
        match self {
            GxpImpact::Gxp => "GxP",
            GxpImpact::NonGxp => "non-GxP",
            GxpImpact::IndirectGxp => "indirect GxP",
        }
    }
}

/// An activity row joined with the usernames of the people it references.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub activity_name: String,
    pub description: Option<String>,
    pub gxp_scope: String,
    pub priority: String,
    pub risk_level: String,
    pub activity_date: NaiveDate,
    pub sprint: i32,
    pub status: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub last_edited_by: Option<i64>,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub backup_person: Option<i64>,
    pub department: Option<String>,
    pub it_type: Option<String>,
    pub gxp_impact: Option<String>,
    pub business_benefit: Option<String>,
    pub tco_value: Option<f64>,
    pub activity_year: Option<i32>,
    pub owner_id: Option<i64>,
    pub owner_name: Option<String>,
    pub is_shared: bool,
    pub is_archived: bool,
    pub progress_percentage: i32,
    pub unique_identifier: Option<String>,
    #[sqlx(default)]
    pub created_by_name: Option<String>,
    #[sqlx(default)]
    pub last_edited_by_name: Option<String>,
    #[sqlx(default)]
    pub backup_person_name: Option<String>,
    #[sqlx(default)]
    pub owner_name_display: Option<String>,
}

impl ActivityRow {
    /// Owner falls back to the creator for rows that predate the owner column.
    pub fn effective_owner(&self) -> i64 {
        self.owner_id.unwrap_or(self.created_by)
    }

    /// Creator, owner and backup person may view a personal activity.
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.created_by == user_id
            || self.effective_owner() == user_id
            || self.backup_person == Some(user_id)
    }
}
