//! Integration tests for editor crate

use regionlock_editor::{
    apply_protection, with_session, Document, DocumentContent, DocumentHost, EditorError,
    EditorIdentity, FileHost, HeaderFooterKind, HostDocument, HostError, Pipeline,
    ProtectionMode, ProtectionOptions, Section, StreamRef, StreamScope, SubstitutionRequest,
    TagPair,
};
use std::path::{Path, PathBuf};

fn contract() -> DocumentContent {
    let body = "Agreement between [COMPANY] and the client. \
                Terms: [sgfs]fill in terms[sgfe]. Signed for [COMPANY].";
    let terms_at = body.find("Terms").unwrap();
    let signed_at = body.find("Signed").unwrap();

    DocumentContent::new(body)
        .with_section(
            Section::new()
                .with_header(HeaderFooterKind::Primary, "[COMPANY] confidential")
                .with_footer(HeaderFooterKind::Primary, "Page footer"),
        )
        .with_region("terms", StreamRef::Body, terms_at, signed_at)
        .with_region("signature", StreamRef::Body, signed_at, body.chars().count())
}

fn write_json(dir: &Path, name: &str, content: &DocumentContent) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(content).unwrap()).unwrap();
    path
}

#[test]
fn test_document_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_json(dir.path(), "contract.json", &contract());
    let output = dir.path().join("contract.protected.json");

    let mut host = FileHost;
    let result = with_session(&mut host, &source, |session| {
        let pipeline = Pipeline::new()
            .with_substitutions(vec![SubstitutionRequest::new("[COMPANY]", "Company")])
            .with_protection(ProtectionOptions {
                keep_locked: ["signature".to_string()].into(),
                tags: vec![TagPair::new("[sgfs]", "[sgfe]")?],
                password: Some("secret".to_string()),
                ..ProtectionOptions::default()
            });
        let result = pipeline.run(session.document_mut())?;
        session.save_as(&output)?;
        Ok::<_, EditorError>(result)
    })
    .unwrap();

    let substitution = result.substitution.unwrap();
    assert_eq!(substitution.total(), 3);
    assert_eq!(substitution.properties_created(), 1);
    assert_eq!(result.fields_updated, 3);

    let protection = result.protection.unwrap();
    assert_eq!(protection.kept, vec!["signature"]);
    assert_eq!(protection.released, vec!["terms"]);
    assert_eq!(protection.tag_grants, 1);
    assert!(protection.protected);

    // Source is untouched; output holds the pass.
    let original = Document::load(source).unwrap();
    assert_eq!(original.content(), &contract());

    let saved = Document::load(output).unwrap();
    assert_eq!(saved.protection(), Some(ProtectionMode::ReadOnly));

    let signature = saved
        .named_regions()
        .into_iter()
        .find(|r| r.name == "signature")
        .unwrap();
    assert_eq!(
        saved.text_at(&StreamRef::Body, signature.start, signature.end).unwrap(),
        "Signed for \u{FFFC}."
    );
    assert!(!saved.is_editable(&StreamRef::Body, signature.start));
    assert!(saved.is_editable(&StreamRef::Body, 0));
    assert_eq!(
        saved.display_text(&StreamRef::Header { section: 0, kind: HeaderFooterKind::Primary }).unwrap(),
        "Company confidential"
    );
}

#[test]
fn test_failed_pass_saves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = contract();
    content.protection = Some(regionlock_editor::Protection::new(ProtectionMode::ReadOnly, Some("right")));
    let source = write_json(dir.path(), "locked.json", &content);
    let output = dir.path().join("locked.protected.json");

    let mut host = FileHost;
    let result = with_session(&mut host, &source, |session| {
        let options = ProtectionOptions {
            password: Some("wrong".to_string()),
            ..ProtectionOptions::default()
        };
        apply_protection(session.document_mut(), &options)?;
        session.save_as(&output)?;
        Ok::<_, EditorError>(())
    });

    assert!(matches!(result, Err(EditorError::Host(HostError::WrongPassword))));
    assert!(!output.exists());
}

#[test]
fn test_missing_source_is_host_error() {
    let mut host = FileHost;
    let result = with_session(&mut host, Path::new("/nonexistent/doc.json"), |_| Ok::<_, EditorError>(()));
    assert!(matches!(result, Err(EditorError::Host(HostError::NotFound(_)))));
}

#[test]
fn test_protect_all_streams_then_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_json(dir.path(), "contract.json", &contract());

    let mut host = FileHost;
    let mut doc = host.open(&source).unwrap();
    let options = ProtectionOptions {
        keep_locked: ["terms".to_string(), "signature".to_string()].into(),
        streams: vec![StreamScope::All],
        editor: EditorIdentity::User("reviewer".to_string()),
        ..ProtectionOptions::default()
    };

    let first = apply_protection(&mut doc, &options).unwrap();
    let second = apply_protection(&mut doc, &options).unwrap();

    // Body prefix, header and footer are gaps.
    assert_eq!(first.gap_grants, 3);
    assert_eq!(second.revoked, first.grants_added);
    assert!(doc.grants().all(|g| g.editor == EditorIdentity::User("reviewer".to_string())));

    let footer = StreamRef::Footer { section: 0, kind: HeaderFooterKind::Primary };
    assert!(doc.is_editable(&footer, 0));
    host.close(doc).unwrap();
}
