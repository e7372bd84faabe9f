//! Persisted franchise application record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

/// One applicant's completed application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,

    // Acknowledgments
    pub purpose_acknowledged: bool,
    pub instructions_acknowledged: bool,

    // Applicant
    pub full_name: String,
    pub age: Number,
    pub gender: Gender,
    pub mobile_number: String,
    pub email: String,
    pub current_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_address: Option<String>,
    pub highest_qualification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_occupation: Option<String>,

    // Business context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_city: Option<String>,
    #[serde(default)]
    pub proposed_premises: ProposedPremises,
    #[serde(default)]
    pub target_classes: Vec<TargetClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_type: Option<ManagementType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_range: Option<InvestmentRange>,

    // Operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_students: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_staff: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_model: Option<bool>,
    #[serde(default)]
    pub teaching_team: TeachingTeam,

    // Marketing
    #[serde(default)]
    pub marketing: Marketing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_notes: Option<String>,

    // Mindset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub motivation: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_motivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_time_dedication: Option<bool>,
    #[serde(default)]
    pub education_beliefs: EducationBeliefs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classroom_environment: Option<ClassroomEnvironment>,

    #[serde(default)]
    pub documents: Documents,

    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
    #[serde(rename = "other")]
    Other,
    #[serde(rename = "preferNotToSay")]
    PreferNotToSay,
    /// Hyphenated spelling some form revisions send
    #[serde(rename = "prefer-not-to-say")]
    PreferNotToSayHyphenated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetClass {
    #[serde(rename = "Class 6-8")]
    Class6To8,
    #[serde(rename = "Class 9-10")]
    Class9To10,
    #[serde(rename = "Class 11-12 (Science)")]
    Class11To12Science,
    #[serde(rename = "Class 11-12 (Commerce)")]
    Class11To12Commerce,
    #[serde(rename = "JEE")]
    Jee,
    #[serde(rename = "NEET")]
    Neet,
    #[serde(rename = "Foundation / Olympiad")]
    FoundationOlympiad,
    #[serde(rename = "Other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagementType {
    #[serde(rename = "self")]
    SelfManaged,
    Team,
    Both,
    Partnership,
    Corporate,
}

/// Planned investment bracket (rupee labels and compact labels both occur)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestmentRange {
    #[serde(rename = "₹5-7 lakhs")]
    Lakhs5To7,
    #[serde(rename = "₹7-10 lakhs")]
    Lakhs7To10,
    #[serde(rename = "₹10-15 lakhs")]
    Lakhs10To15,
    #[serde(rename = "Above ₹15 lakhs")]
    Above15Lakhs,
    #[serde(rename = "5-10L")]
    L5To10,
    #[serde(rename = "10-20L")]
    L10To20,
    #[serde(rename = "20-30L")]
    L20To30,
    #[serde(rename = "30L+")]
    L30Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassroomEnvironment {
    Friendly,
    Result,
    FriendlyDisciplined,
    ResultPressure,
}

/// Review lifecycle of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedPremises {
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub other_details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingTeam {
    #[serde(default)]
    pub has_team: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_size: Option<Number>,
    #[serde(default)]
    pub open_to_training: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marketing {
    #[serde(default)]
    pub has_budget: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Number>,
    #[serde(default)]
    pub has_network: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationBeliefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_building: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_free_learning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_methodologies: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent_communication: Option<bool>,
}

/// The five document slots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Documents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_proof: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_proof: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_statement: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_certificate: Option<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premises_photo: Option<DocumentRef>,
}

impl Documents {
    /// Slot keys as they appear in field names and JSON
    pub const SLOTS: [&'static str; 5] = [
        "idProof",
        "addressProof",
        "bankStatement",
        "experienceCertificate",
        "premisesPhoto",
    ];

    pub fn slot(&self, key: &str) -> Option<&DocumentRef> {
        match key {
            "idProof" => self.id_proof.as_ref(),
            "addressProof" => self.address_proof.as_ref(),
            "bankStatement" => self.bank_statement.as_ref(),
            "experienceCertificate" => self.experience_certificate.as_ref(),
            "premisesPhoto" => self.premises_photo.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn slot_mut(&mut self, key: &str) -> Option<&mut Option<DocumentRef>> {
        match key {
            "idProof" => Some(&mut self.id_proof),
            "addressProof" => Some(&mut self.address_proof),
            "bankStatement" => Some(&mut self.bank_statement),
            "experienceCertificate" => Some(&mut self.experience_certificate),
            "premisesPhoto" => Some(&mut self.premises_photo),
            _ => None,
        }
    }

    /// Populated slots in declaration order
    pub fn populated(&self) -> impl Iterator<Item = (&'static str, &DocumentRef)> {
        Self::SLOTS
            .into_iter()
            .filter_map(move |key| self.slot(key).map(|doc| (key, doc)))
    }
}

/// Reference to an uploaded file in object storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub url: String,
    pub public_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Number>,
    #[serde(default)]
    pub resource_type: ResourceKind,
}

/// Storage classification of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Image,
    Raw,
}

impl ResourceKind {
    /// `image` for image media types, `raw` for everything else
    pub fn for_media_type(media_type: &str) -> Self {
        if media_type.starts_with("image/") {
            ResourceKind::Image
        } else {
            ResourceKind::Raw
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Raw => "raw",
        }
    }
}
