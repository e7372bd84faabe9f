//! Multi-step form controller
//!
//! Holds the nested form state, the active step and the submit phase.
//! Navigation is forward/back only; the two acknowledgment steps refuse to
//! advance until their flag is set.

use std::fmt;

use intake_common::form_value::FormMap;
use intake_common::keypath::parse_key_path;
use intake_common::model::Documents;
use intake_common::transcode::{encode_submission, FlatEntry};
use intake_common::{FileBlob, FormValue};
use tracing::{debug, info, warn};

/// Form steps in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Purpose,
    Instructions,
    BasicDetails,
    BusinessDetails,
    OperationsTeam,
    BrandingMarketing,
    FinalStep,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Purpose,
        Step::Instructions,
        Step::BasicDetails,
        Step::BusinessDetails,
        Step::OperationsTeam,
        Step::BrandingMarketing,
        Step::FinalStep,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Purpose => "Purpose",
            Step::Instructions => "Instructions",
            Step::BasicDetails => "Basic Details",
            Step::BusinessDetails => "Business Details",
            Step::OperationsTeam => "Operations & Team",
            Step::BrandingMarketing => "Branding & Marketing",
            Step::FinalStep => "Final Step",
        }
    }

    fn following(self) -> Option<Step> {
        Step::ALL.get(self.index() + 1).copied()
    }

    fn preceding(self) -> Option<Step> {
        self.index().checked_sub(1).and_then(|i| Step::ALL.get(i).copied())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Submission lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Editing,
    Submitting,
    /// Terminal; navigation is suppressed
    Submitted,
}

/// Input event from a form control
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// Text input, select or programmatic value
    Value { name: String, value: FormValue },
    /// Checkbox; the checked flag is the value
    Checkbox { name: String, checked: bool },
    /// File picker; only the first file is kept
    Files { name: String, files: Vec<FileBlob> },
}

impl ChangeEvent {
    pub fn value(name: impl Into<String>, value: impl Into<FormValue>) -> Self {
        ChangeEvent::Value {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        ChangeEvent::Checkbox {
            name: name.into(),
            checked,
        }
    }

    pub fn file(name: impl Into<String>, file: FileBlob) -> Self {
        ChangeEvent::Files {
            name: name.into(),
            files: vec![file],
        }
    }
}

/// One failed final-step check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Final-step text answers that must be non-empty
const FINAL_STEP_ANSWERS: [(&str, &str); 7] = [
    ("timeframe", "Please select your expected timeframe"),
    ("motivation", "Please select your primary motivation"),
    ("educationGoal", "Please answer about education goals"),
    ("learningModel", "Please specify your view on learning models"),
    ("trainingAdoption", "Please specify training adoption"),
    ("communicationStyle", "Please select communication style"),
    ("classroomEnvironment", "Please select classroom environment"),
];

const REQUIRED_DOCUMENTS: [(&str, &str); 3] = [
    ("idProof", "ID proof is required"),
    ("addressProof", "Address proof is required"),
    ("bankStatement", "Bank statement is required"),
];

/// Headless state machine behind the seven-step form
#[derive(Debug, Clone)]
pub struct WizardController {
    state: FormValue,
    step: Step,
    phase: Phase,
    submit_error: Option<String>,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    pub fn new() -> Self {
        Self {
            state: initial_state(),
            step: Step::Purpose,
            phase: Phase::Editing,
            submit_error: None,
        }
    }

    pub fn state(&self) -> &FormValue {
        &self.state
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Message of the last failed submit, cleared when a new one starts
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    fn field(&self, name: &str) -> Option<&FormValue> {
        self.state.get(name)
    }

    fn flag(&self, name: &str) -> bool {
        matches!(self.field(name), Some(FormValue::Bool(true)))
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Advance one step; returns whether the step changed
    pub fn next(&mut self) -> bool {
        if self.phase != Phase::Editing {
            return false;
        }
        let gate = match self.step {
            Step::Purpose => Some("purposeAcknowledged"),
            Step::Instructions => Some("instructionsAcknowledged"),
            _ => None,
        };
        if let Some(flag) = gate {
            if !self.flag(flag) {
                debug!(step = %self.step, "Advance refused until {} is set", flag);
                return false;
            }
        }
        match self.step.following() {
            Some(step) => {
                self.step = step;
                debug!(step = %step, "Step advanced");
                true
            }
            None => false,
        }
    }

    /// Go back one step; returns whether the step changed
    pub fn back(&mut self) -> bool {
        if self.phase != Phase::Editing {
            return false;
        }
        match self.step.preceding() {
            Some(step) => {
                self.step = step;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Change handlers
    // ========================================================================

    /// Apply one control event to the form state
    pub fn handle_change(&mut self, event: ChangeEvent) {
        let (name, value) = match event {
            ChangeEvent::Files { name, files } => {
                let file = files.into_iter().next().map(FormValue::File).unwrap_or_default();
                self.set_document(&name, file);
                return;
            }
            ChangeEvent::Checkbox { name, checked } => (name, FormValue::Bool(checked)),
            ChangeEvent::Value { name, value } => (name, value),
        };
        if name.is_empty() {
            warn!("Change event without a field name ignored");
            return;
        }

        if name == "targetClasses" {
            let classes = match value {
                FormValue::List(items) => items,
                FormValue::Text(text) if !text.trim().is_empty() => vec![FormValue::Text(text)],
                _ => self.target_classes(),
            };
            self.set_top(&name, FormValue::List(classes));
            return;
        }

        if name.contains('.') {
            self.state.set_path(&parse_key_path(&name), value);
            return;
        }

        if let FormValue::Map(incoming) = value {
            let mut merged = self
                .field(&name)
                .and_then(FormValue::as_map)
                .cloned()
                .unwrap_or_default();
            for (key, item) in incoming.iter() {
                merged.insert(key, item.clone());
            }
            self.set_top(&name, FormValue::Map(merged));
            return;
        }

        self.set_top(&name, value);
    }

    /// Add the class if absent, remove it if present
    pub fn toggle_target_class(&mut self, class: &str) {
        let mut classes = self.target_classes();
        match classes.iter().position(|c| c.as_text() == Some(class)) {
            Some(index) => {
                classes.remove(index);
            }
            None => classes.push(FormValue::from(class)),
        }
        self.handle_change(ChangeEvent::value("targetClasses", FormValue::List(classes)));
    }

    /// `parent.child` merges `{child: value}` into the parent object
    pub fn set_nested(&mut self, field: &str, value: impl Into<FormValue>) {
        let Some((parent, child)) = field.split_once('.') else {
            self.handle_change(ChangeEvent::value(field, value));
            return;
        };
        let update: FormMap = [(child, value.into())].into_iter().collect();
        self.handle_change(ChangeEvent::value(parent, FormValue::Map(update)));
    }

    /// Branded-institute checkbox; unchecking clears the name
    pub fn set_branded_institute(&mut self, exists: bool) {
        let name = if exists {
            self.branded_institute()
                .and_then(|b| b.get("name"))
                .and_then(FormValue::as_text)
                .unwrap_or_default()
                .to_string()
        } else {
            String::new()
        };
        let institute: FormMap = [
            ("exists", FormValue::Bool(exists)),
            ("name", FormValue::Text(name)),
        ]
        .into_iter()
        .collect();
        self.set_nested("competition.brandedInstitute", FormValue::Map(institute));
    }

    /// Branded-institute name, keeping the checkbox state
    pub fn set_branded_institute_name(&mut self, name: &str) {
        let mut institute = self.branded_institute().cloned().unwrap_or_default();
        if institute.get("exists").is_none() {
            institute.insert("exists", FormValue::Bool(false));
        }
        institute.insert("name", FormValue::from(name));
        self.set_nested("competition.brandedInstitute", FormValue::Map(institute));
    }

    /// Shallow whole-object update; the last edit wins per key
    pub fn update(&mut self, values: FormMap) {
        for (key, value) in values.iter() {
            self.set_top(key, value.clone());
        }
    }

    fn set_top(&mut self, name: &str, value: FormValue) {
        if let Some(map) = self.state.as_map_mut() {
            map.insert(name, value);
        }
    }

    fn set_document(&mut self, slot: &str, value: FormValue) {
        self.state.set_path(&["documents", slot], value);
    }

    fn target_classes(&self) -> Vec<FormValue> {
        self.field("targetClasses")
            .and_then(FormValue::as_list)
            .map(<[FormValue]>::to_vec)
            .unwrap_or_default()
    }

    fn branded_institute(&self) -> Option<&FormMap> {
        self.state
            .get_path(&["competition", "brandedInstitute"])
            .and_then(FormValue::as_map)
    }

    // ========================================================================
    // Final step and submit
    // ========================================================================

    /// Checks run before the final step may submit
    pub fn validate_final(&self) -> Result<(), Vec<FieldError>> {
        let mut errors: Vec<FieldError> = FINAL_STEP_ANSWERS
            .iter()
            .filter(|(field, _)| !self.answered(field))
            .map(|(field, message)| FieldError::new(field, message))
            .collect();

        if matches!(self.field("fullTimeDedication"), None | Some(FormValue::Null)) {
            errors.push(FieldError::new(
                "fullTimeDedication",
                "Please specify if you can dedicate full time",
            ));
        }

        for (slot, message) in REQUIRED_DOCUMENTS {
            let present = self
                .state
                .get_path(&["documents", slot])
                .is_some_and(|doc| !matches!(doc, FormValue::Null));
            if !present {
                errors.push(FieldError::new(&format!("documents.{slot}"), message));
            }
        }

        if !self.flag("termsAccepted") {
            errors.push(FieldError::new("termsAccepted", "You must accept the terms"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn answered(&self, field: &str) -> bool {
        match self.field(field) {
            Some(FormValue::Text(text)) => !text.trim().is_empty(),
            Some(FormValue::List(items)) => !items.is_empty(),
            Some(FormValue::Null) | None => false,
            Some(other) => other.is_truthy(),
        }
    }

    /// Multipart entries for the current state: snapshot first, then leaves
    pub fn submission_entries(&self) -> Vec<FlatEntry> {
        encode_submission(&self.state)
    }

    /// Enter the submitting phase; `false` unless editing the final step
    pub fn begin_submit(&mut self) -> bool {
        if self.phase != Phase::Editing || self.step != Step::FinalStep {
            return false;
        }
        self.phase = Phase::Submitting;
        self.submit_error = None;
        true
    }

    /// Submit succeeded; the form is done
    pub fn submit_succeeded(&mut self) {
        info!("Application submitted");
        self.phase = Phase::Submitted;
    }

    /// Submit failed; record the message and return to editing
    pub fn submit_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "Application submit failed");
        self.submit_error = Some(message);
        self.phase = Phase::Editing;
    }
}

/// Blank form as first presented
fn initial_state() -> FormValue {
    let text = |s: &str| FormValue::from(s);
    let map = |entries: Vec<(&str, FormValue)>| FormValue::Map(entries.into_iter().collect());

    let documents = map(Documents::SLOTS.iter().map(|slot| (*slot, FormValue::Null)).collect());

    map(vec![
        ("purposeAcknowledged", FormValue::Bool(false)),
        ("instructionsAcknowledged", FormValue::Bool(false)),
        ("fullName", text("")),
        ("email", text("")),
        ("mobileNumber", text("")),
        ("age", text("")),
        ("gender", text("")),
        ("currentAddress", text("")),
        ("permanentAddress", text("")),
        ("highestQualification", text("")),
        ("currentOccupation", text("")),
        ("maritalStatus", text("")),
        ("familyMembers", text("")),
        (
            "familyInEducation",
            map(vec![("isInEducation", FormValue::Bool(false)), ("details", text(""))]),
        ),
        ("proposedPremises", FormValue::empty_map()),
        (
            "competition",
            map(vec![
                ("nearbySchools", text("")),
                ("coachingInstitutes", text("")),
                (
                    "brandedInstitute",
                    map(vec![("exists", FormValue::Bool(false)), ("name", text(""))]),
                ),
            ]),
        ),
        ("targetClasses", FormValue::List(Vec::new())),
        ("teachingTeam", FormValue::empty_map()),
        ("managementType", text("")),
        ("investmentRange", text("")),
        ("needsLoan", FormValue::Bool(false)),
        ("loanAmount", text("")),
        ("feeStructure", FormValue::empty_map()),
        ("hasTeachingTeam", FormValue::Bool(false)),
        ("teacherCount", text("")),
        ("teachersCertified", FormValue::Bool(false)),
        ("teachersExperienced", FormValue::Bool(false)),
        ("weekdayOpen", text("09:00")),
        ("weekdayClose", text("18:00")),
        ("weekendOperations", text("yes")),
        (
            "marketing",
            map(vec![
                ("hasBudget", FormValue::Bool(false)),
                ("budget", text("")),
                ("hasNetwork", FormValue::Bool(false)),
                ("networkDetails", text("")),
            ]),
        ),
        ("additionalMarketingNotes", text("")),
        ("documents", documents),
        ("termsAccepted", FormValue::Bool(false)),
        ("timeframe", text("")),
        ("motivation", text("")),
        ("fullTimeDedication", FormValue::Bool(false)),
        ("educationGoal", text("")),
        ("learningModel", text("")),
        ("trainingAdoption", text("")),
        ("communicationStyle", text("")),
        ("classroomEnvironment", text("")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(controller: &WizardController, field: &str) -> serde_json::Value {
        controller.state().get(field).map(FormValue::to_snapshot).unwrap_or_default()
    }

    fn at_final_step() -> WizardController {
        let mut wizard = WizardController::new();
        wizard.handle_change(ChangeEvent::checkbox("purposeAcknowledged", true));
        wizard.handle_change(ChangeEvent::checkbox("instructionsAcknowledged", true));
        while wizard.next() {}
        wizard
    }

    fn completed_final_step() -> WizardController {
        let mut wizard = at_final_step();
        for (field, _) in FINAL_STEP_ANSWERS {
            wizard.handle_change(ChangeEvent::value(field, "answer"));
        }
        for (slot, _) in REQUIRED_DOCUMENTS {
            wizard.handle_change(ChangeEvent::file(slot, FileBlob::new("doc.pdf", "application/pdf", vec![1])));
        }
        wizard.handle_change(ChangeEvent::checkbox("termsAccepted", true));
        wizard
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    #[test]
    fn test_acknowledgment_gates() {
        let mut wizard = WizardController::new();

        assert!(!wizard.next(), "purpose not acknowledged");
        assert_eq!(wizard.step(), Step::Purpose);

        wizard.handle_change(ChangeEvent::checkbox("purposeAcknowledged", true));
        assert!(wizard.next());
        assert_eq!(wizard.step(), Step::Instructions);

        assert!(!wizard.next(), "instructions not acknowledged");
        wizard.handle_change(ChangeEvent::checkbox("instructionsAcknowledged", true));
        assert!(wizard.next());
        assert_eq!(wizard.step(), Step::BasicDetails);
    }

    #[test]
    fn test_navigation_bounds() {
        let mut wizard = WizardController::new();
        assert!(!wizard.back());

        wizard.handle_change(ChangeEvent::checkbox("purposeAcknowledged", true));
        wizard.handle_change(ChangeEvent::checkbox("instructionsAcknowledged", true));
        while wizard.next() {}
        assert_eq!(wizard.step(), Step::FinalStep);
        assert_eq!(wizard.step().title(), "Final Step");

        assert!(wizard.back());
        assert_eq!(wizard.step(), Step::BrandingMarketing);
    }

    #[test]
    fn test_navigation_suppressed_after_submit() {
        let mut wizard = at_final_step();

        assert!(wizard.begin_submit());
        assert!(!wizard.begin_submit());
        wizard.submit_succeeded();

        assert_eq!(wizard.phase(), Phase::Submitted);
        assert!(!wizard.next());
        assert!(!wizard.back());
        assert_eq!(wizard.step(), Step::FinalStep);
    }

    #[test]
    fn test_submit_refused_before_final_step() {
        // Given: a form whose final-step answers are complete but which sits on step one
        let mut wizard = completed_final_step();
        while wizard.back() {}
        assert_eq!(wizard.validate_final(), Ok(()));

        // When/Then: submitting is refused until the final step is reached
        assert!(!wizard.begin_submit());
        assert_eq!(wizard.phase(), Phase::Editing);

        while wizard.next() {}
        assert!(wizard.begin_submit());
        assert_eq!(wizard.phase(), Phase::Submitting);
    }

    #[test]
    fn test_failed_submit_returns_to_editing() {
        let mut wizard = at_final_step();
        assert!(wizard.begin_submit());
        wizard.submit_failed("Missing required fields");

        assert_eq!(wizard.phase(), Phase::Editing);
        assert_eq!(wizard.submit_error(), Some("Missing required fields"));

        wizard.begin_submit();
        assert_eq!(wizard.submit_error(), None);
    }

    // ========================================================================
    // Change handlers
    // ========================================================================

    #[test]
    fn test_file_change_goes_to_documents() {
        let mut wizard = WizardController::new();
        let file = FileBlob::new("id.png", "image/png", vec![1, 2, 3]);

        wizard.handle_change(ChangeEvent::file("idProof", file.clone()));

        assert_eq!(
            wizard.state().get_path(&["documents", "idProof"]),
            Some(&FormValue::File(file))
        );

        wizard.handle_change(ChangeEvent::Files {
            name: "idProof".to_string(),
            files: Vec::new(),
        });
        assert_eq!(wizard.state().get_path(&["documents", "idProof"]), Some(&FormValue::Null));
    }

    #[test]
    fn test_target_classes_stay_a_list() {
        let mut wizard = WizardController::new();

        wizard.handle_change(ChangeEvent::value("targetClasses", "JEE"));
        assert_eq!(snapshot(&wizard, "targetClasses"), json!(["JEE"]));

        wizard.handle_change(ChangeEvent::value("targetClasses", ""));
        assert_eq!(snapshot(&wizard, "targetClasses"), json!(["JEE"]));

        wizard.toggle_target_class("NEET");
        wizard.toggle_target_class("JEE");
        assert_eq!(snapshot(&wizard, "targetClasses"), json!(["NEET"]));
    }

    #[test]
    fn test_dotted_and_nested_changes() {
        let mut wizard = WizardController::new();

        wizard.handle_change(ChangeEvent::value("marketing.budget", 50000i64));
        wizard.set_nested("proposedPremises.floor", "Ground Floor");
        wizard.set_nested("proposedPremises.otherDetails", "Corner shop");

        assert_eq!(
            snapshot(&wizard, "marketing"),
            json!({"hasBudget": false, "budget": 50000, "hasNetwork": false, "networkDetails": ""})
        );
        assert_eq!(
            snapshot(&wizard, "proposedPremises"),
            json!({"floor": "Ground Floor", "otherDetails": "Corner shop"})
        );
    }

    #[test]
    fn test_branded_institute_toggle() {
        let mut wizard = WizardController::new();

        wizard.set_branded_institute(true);
        wizard.set_branded_institute_name("Acme Academy");
        assert_eq!(
            snapshot(&wizard, "competition")["brandedInstitute"],
            json!({"exists": true, "name": "Acme Academy"})
        );

        wizard.set_branded_institute(false);
        assert_eq!(
            snapshot(&wizard, "competition")["brandedInstitute"],
            json!({"exists": false, "name": ""})
        );
        assert_eq!(snapshot(&wizard, "competition")["nearbySchools"], "");
    }

    #[test]
    fn test_whole_object_update_last_edit_wins() {
        let mut wizard = WizardController::new();
        wizard.handle_change(ChangeEvent::value("timeframe", "3 months"));

        let values: FormMap = [
            ("timeframe", FormValue::from("6 months")),
            ("motivation", FormValue::from("passion")),
        ]
        .into_iter()
        .collect();
        wizard.update(values);

        assert_eq!(snapshot(&wizard, "timeframe"), "6 months");
        assert_eq!(snapshot(&wizard, "motivation"), "passion");
    }

    // ========================================================================
    // Final step
    // ========================================================================

    #[test]
    fn test_final_validation_on_blank_form() {
        let errors = WizardController::new().validate_final().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(
            fields,
            vec![
                "timeframe",
                "motivation",
                "educationGoal",
                "learningModel",
                "trainingAdoption",
                "communicationStyle",
                "classroomEnvironment",
                "documents.idProof",
                "documents.addressProof",
                "documents.bankStatement",
                "termsAccepted",
            ]
        );
    }

    #[test]
    fn test_final_validation_passes_when_complete() {
        let wizard = completed_final_step();
        assert_eq!(wizard.validate_final(), Ok(()));
    }

    #[test]
    fn test_full_time_dedication_must_be_present() {
        let mut wizard = completed_final_step();
        wizard.handle_change(ChangeEvent::value("fullTimeDedication", FormValue::Null));

        let errors = wizard.validate_final().unwrap_err();
        assert_eq!(errors, vec![FieldError::new(
            "fullTimeDedication",
            "Please specify if you can dedicate full time"
        )]);
    }

    #[test]
    fn test_submission_entries_lead_with_snapshot() {
        let mut wizard = completed_final_step();
        wizard.handle_change(ChangeEvent::value("fullName", "Asha Rao"));

        let entries = wizard.submission_entries();

        assert_eq!(entries[0].name, "formData");
        let snapshot: serde_json::Value = serde_json::from_str(entries[0].as_text().unwrap()).unwrap();
        assert_eq!(snapshot["fullName"], "Asha Rao");
        assert_eq!(snapshot["documents"]["idProof"], serde_json::Value::Null);
        assert!(entries.iter().any(|e| e.name == "documents[idProof]" && e.as_text().is_none()));
    }
}
