//! Schema pass: reconstructed JSON record → [`Submission`]
//!
//! Each declared path is read with a lenient cast (numbers from numeric
//! text, booleans from "yes"/"no", text from scalars). Every failure is
//! collected as a [`Violation`] so one pass reports all of them. Keys not
//! declared here are dropped.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use uuid::Uuid;

use super::submission::{
    ApplicationStatus, ClassroomEnvironment, DocumentRef, Documents, EducationBeliefs,
    InvestmentRange, ManagementType, Marketing, ProposedPremises, ResourceKind, Submission,
    TargetClass, TeachingTeam,
};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("Invalid regex"));

/// Optional fields where an empty string means "not provided"
const BLANK_AS_ABSENT: [&str; 4] = [
    "managementType",
    "investmentRange",
    "classroomEnvironment",
    "timeframe",
];

/// One failed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl Violation {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// All violations found in one record
#[derive(Debug, Clone, Error)]
#[error("Application validation failed: {}", join_violations(.0))]
pub struct SchemaViolations(pub Vec<Violation>);

impl SchemaViolations {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|v| v.path.as_str())
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.path, v.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Identity and timestamps assigned by the server, never read from the payload
#[derive(Debug, Clone, Copy)]
pub struct RecordStamp {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub stored_at: DateTime<Utc>,
}

impl RecordStamp {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            submitted_at: now,
            stored_at: now,
        }
    }
}

/// Text post-processing applied after the cast
#[derive(Clone, Copy)]
enum TextCase {
    Trimmed,
    Lowercased,
}

/// Run the schema pass over a reconstructed record
pub fn read_submission(
    record: &Map<String, Value>,
    stamp: RecordStamp,
) -> Result<Submission, SchemaViolations> {
    let record = normalize(record);
    let mut reader = SchemaReader::new(&record);

    let purpose_acknowledged =
        reader.required_bool("purposeAcknowledged", "Please acknowledge the purpose of this form");
    let instructions_acknowledged =
        reader.required_bool("instructionsAcknowledged", "Please acknowledge the instructions");
    let full_name = reader.required_text("fullName", TextCase::Trimmed, "Please enter your full name");
    let age = reader.required_number("age", "Please enter your age");
    reader.check_min("age", age.as_ref(), 18.0, "You must be at least 18 years old");
    let gender = reader.required_enum("gender", "Please select your gender");
    let mobile_number =
        reader.required_text("mobileNumber", TextCase::Trimmed, "Please enter your mobile number");
    let email = reader.required_text("email", TextCase::Lowercased, "Please enter your email");
    if let Some(email) = &email {
        if !EMAIL_PATTERN.is_match(email) {
            reader.violate("email", "Please enter a valid email address");
        }
    }
    let current_address =
        reader.required_text("currentAddress", TextCase::Trimmed, "Please enter your current address");
    let highest_qualification = reader.required_text(
        "highestQualification",
        TextCase::Trimmed,
        "Please enter your highest qualification",
    );

    let expected_students = reader.number("expectedStudents");
    reader.check_min(
        "expectedStudents",
        expected_students.as_ref(),
        1.0,
        "Expected students must be at least 1",
    );
    let available_staff = reader.number("availableStaff");
    reader.check_min("availableStaff", available_staff.as_ref(), 0.0, "Number cannot be negative");

    let optional = OptionalFields {
        permanent_address: reader.text("permanentAddress", TextCase::Trimmed),
        current_occupation: reader.text("currentOccupation", TextCase::Trimmed),
        target_city: reader.text("targetCity", TextCase::Trimmed),
        proposed_premises: reader.proposed_premises(),
        target_classes: reader.enum_list("targetClasses"),
        management_type: reader.enumerated("managementType"),
        investment_range: reader.enumerated("investmentRange"),
        previous_experience: reader.text("previousExperience", TextCase::Trimmed),
        class_schedule: reader.text("classSchedule", TextCase::Trimmed),
        hybrid_model: reader.boolean("hybridModel"),
        teaching_team: reader.teaching_team(),
        marketing: reader.marketing(),
        marketing_notes: reader.text("marketingNotes", TextCase::Trimmed),
        timeframe: reader.text("timeframe", TextCase::Trimmed),
        motivation: reader.text_list("motivation"),
        other_motivation: reader.text("otherMotivation", TextCase::Trimmed),
        full_time_dedication: reader.boolean("fullTimeDedication"),
        education_beliefs: reader.education_beliefs(),
        classroom_environment: reader.enumerated("classroomEnvironment"),
        documents: reader.documents(),
        status: reader.enumerated("status").unwrap_or_default(),
        notes: reader.text("notes", TextCase::Trimmed),
    };

    let violations = reader.finish();
    let (
        Some(purpose_acknowledged),
        Some(instructions_acknowledged),
        Some(full_name),
        Some(age),
        Some(gender),
        Some(mobile_number),
        Some(email),
        Some(current_address),
        Some(highest_qualification),
    ) = (
        purpose_acknowledged,
        instructions_acknowledged,
        full_name,
        age,
        gender,
        mobile_number,
        email,
        current_address,
        highest_qualification,
    )
    else {
        return Err(SchemaViolations(violations));
    };
    if !violations.is_empty() {
        return Err(SchemaViolations(violations));
    }

    Ok(Submission {
        id: stamp.id,
        purpose_acknowledged,
        instructions_acknowledged,
        full_name,
        age,
        gender,
        mobile_number,
        email,
        current_address,
        permanent_address: optional.permanent_address,
        highest_qualification,
        current_occupation: optional.current_occupation,
        target_city: optional.target_city,
        proposed_premises: optional.proposed_premises,
        target_classes: optional.target_classes,
        management_type: optional.management_type,
        investment_range: optional.investment_range,
        previous_experience: optional.previous_experience,
        expected_students,
        available_staff,
        class_schedule: optional.class_schedule,
        hybrid_model: optional.hybrid_model,
        teaching_team: optional.teaching_team,
        marketing: optional.marketing,
        marketing_notes: optional.marketing_notes,
        timeframe: optional.timeframe,
        motivation: optional.motivation,
        other_motivation: optional.other_motivation,
        full_time_dedication: optional.full_time_dedication,
        education_beliefs: optional.education_beliefs,
        classroom_environment: optional.classroom_environment,
        documents: optional.documents,
        status: optional.status,
        notes: optional.notes,
        submitted_at: stamp.submitted_at,
        created_at: stamp.stored_at,
        updated_at: stamp.stored_at,
    })
}

struct OptionalFields {
    permanent_address: Option<String>,
    current_occupation: Option<String>,
    target_city: Option<String>,
    proposed_premises: ProposedPremises,
    target_classes: Vec<TargetClass>,
    management_type: Option<ManagementType>,
    investment_range: Option<InvestmentRange>,
    previous_experience: Option<String>,
    class_schedule: Option<String>,
    hybrid_model: Option<bool>,
    teaching_team: TeachingTeam,
    marketing: Marketing,
    marketing_notes: Option<String>,
    timeframe: Option<String>,
    motivation: Vec<String>,
    other_motivation: Option<String>,
    full_time_dedication: Option<bool>,
    education_beliefs: EducationBeliefs,
    classroom_environment: Option<ClassroomEnvironment>,
    documents: Documents,
    status: ApplicationStatus,
    notes: Option<String>,
}

/// Pre-validation normalization
///
/// Blank optional enums become absent, and a bare `motivation` string becomes
/// a one-element list.
fn normalize(record: &Map<String, Value>) -> Map<String, Value> {
    let mut record = record.clone();
    for key in BLANK_AS_ABSENT {
        if matches!(record.get(key), Some(Value::String(s)) if s.is_empty()) {
            record.remove(key);
        }
    }
    if let Some(motivation) = record.get_mut("motivation") {
        if !motivation.is_array() && !motivation.is_null() {
            *motivation = Value::Array(vec![motivation.take()]);
        }
    }
    record
}

struct SchemaReader<'a> {
    record: &'a Map<String, Value>,
    violations: Vec<Violation>,
}

impl<'a> SchemaReader<'a> {
    fn new(record: &'a Map<String, Value>) -> Self {
        Self {
            record,
            violations: Vec::new(),
        }
    }

    fn finish(self) -> Vec<Violation> {
        self.violations
    }

    fn violate(&mut self, path: &str, reason: impl Into<String>) {
        self.violations.push(Violation::new(path, reason));
    }

    /// Value at a dotted path; null counts as absent
    fn lookup(&self, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let value = segments.try_fold(self.record.get(first)?, |node, segment| {
            node.as_object()?.get(segment)
        })?;
        (!value.is_null()).then_some(value)
    }

    fn cast_failure(&mut self, kind: &str, path: &str, value: &Value) {
        self.violate(
            path,
            format!("Cast to {kind} failed for value \"{}\" at path \"{path}\"", display_value(value)),
        );
    }

    // ------------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------------

    fn cast_text(&mut self, path: &str, value: &Value, case: TextCase) -> Option<String> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                self.cast_failure("String", path, other);
                return None;
            }
        };
        let text = text.trim();
        Some(match case {
            TextCase::Trimmed => text.to_string(),
            TextCase::Lowercased => text.to_lowercase(),
        })
    }

    fn text(&mut self, path: &str, case: TextCase) -> Option<String> {
        let value = self.lookup(path)?;
        self.cast_text(path, value, case)
    }

    fn required_text(&mut self, path: &str, case: TextCase, message: &str) -> Option<String> {
        match self.lookup(path) {
            None => {
                self.violate(path, message);
                None
            }
            Some(value) => {
                let text = self.cast_text(path, value, case)?;
                if text.is_empty() {
                    self.violate(path, message);
                    return None;
                }
                Some(text)
            }
        }
    }

    fn number(&mut self, path: &str) -> Option<Number> {
        let value = self.lookup(path)?;
        let number = match value {
            Value::Number(n) => Some(n.clone()),
            Value::Bool(b) => Some(Number::from(u8::from(*b))),
            Value::String(s) if s.trim().is_empty() => return None,
            Value::String(s) => parse_number(s.trim()),
            _ => None,
        };
        if number.is_none() {
            self.cast_failure("Number", path, value);
        }
        number
    }

    fn required_number(&mut self, path: &str, message: &str) -> Option<Number> {
        let number = self.number(path);
        if number.is_none() && !self.has_violation(path) {
            // Absent, or blank text which casts to absent
            self.violate(path, message);
        }
        number
    }

    fn check_min(&mut self, path: &str, number: Option<&Number>, min: f64, message: &str) {
        if let Some(value) = number.and_then(Number::as_f64) {
            if value < min {
                self.violate(path, message);
            }
        }
    }

    fn boolean(&mut self, path: &str) -> Option<bool> {
        let value = self.lookup(path)?;
        let cast = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_f64() {
                Some(v) if v == 1.0 => Some(true),
                Some(v) if v == 0.0 => Some(false),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if cast.is_none() {
            self.cast_failure("Boolean", path, value);
        }
        cast
    }

    fn required_bool(&mut self, path: &str, message: &str) -> Option<bool> {
        if self.lookup(path).is_none() {
            self.violate(path, message);
            return None;
        }
        self.boolean(path)
    }

    fn cast_enum<E: DeserializeOwned>(&mut self, path: &str, value: &Value) -> Option<E> {
        let label = self.cast_text(path, value, TextCase::Trimmed)?;
        match serde_json::from_value::<E>(Value::String(label.clone())) {
            Ok(variant) => Some(variant),
            Err(_) => {
                self.violate(path, format!("`{label}` is not a valid enum value for path `{path}`."));
                None
            }
        }
    }

    fn enumerated<E: DeserializeOwned>(&mut self, path: &str) -> Option<E> {
        let value = self.lookup(path)?;
        self.cast_enum(path, value)
    }

    fn required_enum<E: DeserializeOwned>(&mut self, path: &str, message: &str) -> Option<E> {
        match self.lookup(path) {
            None => {
                self.violate(path, message);
                None
            }
            Some(value) => self.cast_enum(path, value),
        }
    }

    fn has_violation(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }

    // ------------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------------

    /// List items at `path`; a lone scalar is treated as a one-element list
    fn items(&self, path: &str) -> Vec<&'a Value> {
        match self.lookup(path) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.iter().filter(|item| !item.is_null()).collect(),
            Some(single) => vec![single],
        }
    }

    fn text_list(&mut self, path: &str) -> Vec<String> {
        self.items(path)
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| self.cast_text(&format!("{path}.{index}"), item, TextCase::Trimmed))
            .collect()
    }

    fn enum_list<E: DeserializeOwned>(&mut self, path: &str) -> Vec<E> {
        self.items(path)
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| self.cast_enum(&format!("{path}.{index}"), item))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Nested objects
    // ------------------------------------------------------------------------

    /// Whether a nested object may be read; a non-object value is a violation
    fn nested(&mut self, path: &str) -> bool {
        match self.lookup(path) {
            None | Some(Value::Object(_)) => true,
            Some(other) => {
                self.cast_failure("Object", path, other);
                false
            }
        }
    }

    fn proposed_premises(&mut self) -> ProposedPremises {
        if !self.nested("proposedPremises") {
            return ProposedPremises::default();
        }
        ProposedPremises {
            floor: self
                .text("proposedPremises.floor", TextCase::Trimmed)
                .unwrap_or_default(),
            other_details: self
                .text("proposedPremises.otherDetails", TextCase::Trimmed)
                .unwrap_or_default(),
        }
    }

    fn teaching_team(&mut self) -> TeachingTeam {
        if !self.nested("teachingTeam") {
            return TeachingTeam::default();
        }
        let team_size = self.number("teachingTeam.teamSize");
        self.check_min("teachingTeam.teamSize", team_size.as_ref(), 0.0, "Number cannot be negative");
        TeachingTeam {
            has_team: self.boolean("teachingTeam.hasTeam").unwrap_or(false),
            team_size,
            open_to_training: self.boolean("teachingTeam.openToTraining").unwrap_or(false),
        }
    }

    fn marketing(&mut self) -> Marketing {
        if !self.nested("marketing") {
            return Marketing::default();
        }
        let budget = self.number("marketing.budget");
        self.check_min("marketing.budget", budget.as_ref(), 0.0, "Number cannot be negative");
        Marketing {
            has_budget: self.boolean("marketing.hasBudget").unwrap_or(false),
            budget,
            has_network: self.boolean("marketing.hasNetwork").unwrap_or(false),
            network_details: self.text("marketing.networkDetails", TextCase::Trimmed),
        }
    }

    fn education_beliefs(&mut self) -> EducationBeliefs {
        if !self.nested("educationBeliefs") {
            return EducationBeliefs::default();
        }
        EducationBeliefs {
            character_building: self.boolean("educationBeliefs.characterBuilding"),
            stress_free_learning: self.boolean("educationBeliefs.stressFreeLearning"),
            new_methodologies: self.boolean("educationBeliefs.newMethodologies"),
            transparent_communication: self.boolean("educationBeliefs.transparentCommunication"),
        }
    }

    fn documents(&mut self) -> Documents {
        let mut documents = Documents::default();
        if !self.nested("documents") {
            return documents;
        }
        for key in Documents::SLOTS {
            let path = format!("documents.{key}");
            let document = self.document(&path);
            if let Some(slot) = documents.slot_mut(key) {
                *slot = document;
            }
        }
        documents
    }

    /// One document slot; an empty placeholder object counts as absent
    fn document(&mut self, path: &str) -> Option<DocumentRef> {
        match self.lookup(path)? {
            Value::Object(map) if map.is_empty() => return None,
            Value::Object(_) => {}
            other => {
                self.cast_failure("Object", path, other);
                return None;
            }
        }

        let url_path = format!("{path}.url");
        let public_id_path = format!("{path}.public_id");
        let url = self.required_text(&url_path, TextCase::Trimmed, &format!("Path `{url_path}` is required."));
        let public_id = self.required_text(
            &public_id_path,
            TextCase::Trimmed,
            &format!("Path `{public_id_path}` is required."),
        );
        let format = self.text(&format!("{path}.format"), TextCase::Trimmed);
        let size = self.number(&format!("{path}.size"));
        let resource_type: ResourceKind = self
            .enumerated(&format!("{path}.resource_type"))
            .unwrap_or_default();

        Some(DocumentRef {
            url: url?,
            public_id: public_id?,
            format,
            size,
            resource_type,
        })
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(Number::from(int));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
