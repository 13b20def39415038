use super::common::*;

use crate::workflows::intake::domain::{
    ApplicationFields, ResumeAsset, ResumePolicy, SubmissionState, ValidationError,
};

#[test]
fn blank_name_is_rejected() {
    let fields = ApplicationFields::new("   ", "ada@example.com");
    assert_eq!(fields.validated(), Err(ValidationError::MissingName));
}

#[test]
fn malformed_emails_are_rejected() {
    for email in [
        "",
        "ada",
        "ada@",
        "@example.com",
        "ada@example",
        "ada@@example.com",
        "ada@exa mple.com",
        "ada@-example.com",
        "ada@example..com",
    ] {
        let fields = ApplicationFields::new("Ada", email);
        assert!(
            matches!(fields.validated(), Err(ValidationError::InvalidEmail(_))),
            "{email:?} should be rejected"
        );
    }
}

#[test]
fn plausible_emails_are_accepted() {
    for email in ["ada@example.com", "ada.lovelace+jobs@mail.example.co.uk"] {
        let fields = ApplicationFields::new("Ada", email);
        assert!(fields.validated().is_ok(), "{email:?} should be accepted");
    }
}

#[test]
fn validated_fields_are_trimmed() {
    let fields = ApplicationFields::new("\tAda Lovelace ", " ada@example.com ");
    assert_eq!(fields.validated().expect("valid"), super::common::fields());
}

#[test]
fn default_policy_accepts_pdf_with_parameters() {
    let policy = ResumePolicy::default();
    let asset = ResumeAsset::new(b"%PDF-1.7".to_vec(), "cv.pdf", "application/pdf; charset=binary");
    assert_eq!(policy.check(&asset), Ok(()));
    assert_eq!(policy.check(&pdf_asset()), Ok(()));
}

#[test]
fn policy_rejects_other_media_types() {
    let policy = ResumePolicy::default();
    for mime_type in ["text/plain", "image/png", "not a mime"] {
        let asset = ResumeAsset::new(b"data".to_vec(), "cv.bin", mime_type);
        assert_eq!(
            policy.check(&asset),
            Err(ValidationError::UnsupportedMediaType(mime_type.to_string()))
        );
    }
}

#[test]
fn policy_rejects_empty_and_unnamed_files() {
    let policy = ResumePolicy::default();

    let empty = ResumeAsset::new(Vec::new(), "cv.pdf", "application/pdf");
    assert_eq!(policy.check(&empty), Err(ValidationError::EmptyResume));

    let unnamed = ResumeAsset::new(b"%PDF".to_vec(), " ", "application/pdf");
    assert_eq!(policy.check(&unnamed), Err(ValidationError::MissingFilename));
}

#[test]
fn policy_enforces_size_limit() {
    let policy = ResumePolicy::pdf_only(16 * 1024);
    assert_eq!(
        policy.check(&pdf_asset()),
        Err(ValidationError::ResumeTooLarge {
            max: 16 * 1024,
            found: 17 * 1024,
        })
    );

    let at_limit = ResumeAsset::new(vec![0; 16 * 1024], "cv.pdf", "application/pdf");
    assert_eq!(policy.check(&at_limit), Ok(()));
}

#[test]
fn zero_limit_falls_back_to_default() {
    let policy = ResumePolicy::pdf_only(0);
    assert_eq!(policy.max_bytes(), ResumePolicy::default().max_bytes());
    assert_eq!(policy.accepted(), &[mime::APPLICATION_PDF]);
}

#[test]
fn resume_debug_omits_contents() {
    let rendered = format!("{:?}", pdf_asset());
    assert!(rendered.contains("resume.pdf"));
    assert!(rendered.contains("17408"));
    assert!(!rendered.contains("%%%"));
}

#[test]
fn states_serialize_with_a_tag() {
    assert_eq!(
        serde_json::to_value(SubmissionState::Submitting).expect("serializes"),
        serde_json::json!({ "state": "submitting" })
    );
    assert!(SubmissionState::Uploading.is_in_flight());
    assert!(!SubmissionState::Succeeded.is_in_flight());
    assert!(SubmissionState::Succeeded.is_terminal());
    assert!(!SubmissionState::Idle.is_terminal());
}
