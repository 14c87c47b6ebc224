use miospora_core::error::Error;
use miospora_core::models::SidedValue;
use miospora_db::test_fixtures::{diagnosed_genus, test_database};

/// Submitting a second genus with a semantically identical diagnosis is
/// rejected with the existing genus's identity.
#[tokio::test]
async fn identical_diagnosis_is_a_conflict() {
    let db = test_database().await;
    let original = diagnosed_genus("Leiotriletes", "rounded", &["circular"]);
    let original_id = db
        .create_genus(&original)
        .await
        .expect("Failed to create original genus");

    let mut copy = original.clone();
    copy.name = "Pseudoleiotriletes".to_string();
    let err = db
        .create_genus(&copy)
        .await
        .expect_err("Duplicate diagnosis must be rejected");
    match &err {
        Error::DuplicateDiagnosis { id, name } => {
            assert_eq!(*id, original_id);
            assert_eq!(name.as_str(), "Leiotriletes");
        }
        other => panic!("expected DuplicateDiagnosis, got {other:?}"),
    }
    assert!(err.is_conflict());
}

/// The comparison is asymmetric: a candidate that leaves a multi-valued
/// axis empty matches a stored diagnosis that has values there, but a
/// candidate that supplies values does not match a stored diagnosis
/// without them.
#[tokio::test]
async fn multi_valued_axis_check_is_asymmetric() {
    let db = test_database().await;

    // Stored diagnosis has amb values; the candidate leaves amb empty but
    // shares every scalar, so it still collides.
    db.create_genus(&diagnosed_genus("Leiotriletes", "rounded", &["circular"]))
        .await
        .expect("Failed to create genus");
    let mut empty_amb = diagnosed_genus("Leiotriletes", "rounded", &[]);
    empty_amb.name = "Pseudoleiotriletes".to_string();
    let err = db
        .create_genus(&empty_amb)
        .await
        .expect_err("Candidate without amb must match stored diagnosis with amb");
    assert!(matches!(err, Error::DuplicateDiagnosis { .. }));

    // The reverse direction does not collide: the candidate supplies amb
    // values the stored diagnosis lacks.
    let db = test_database().await;
    db.create_genus(&diagnosed_genus("Leiotriletes", "rounded", &[]))
        .await
        .expect("Failed to create genus");
    db.create_genus(&{
        let mut p = diagnosed_genus("Leiotriletes", "rounded", &["circular"]);
        p.name = "Pseudoleiotriletes".to_string();
        p
    })
    .await
    .expect("Candidate with amb must not match stored diagnosis without amb");
}

/// For the side-qualified axes only the FIRST supplied pair's side is
/// compared, for the whole axis. This pins the longstanding behavior.
#[tokio::test]
async fn sided_axis_compares_first_pair_side_only() {
    let db = test_database().await;
    let mut stored = diagnosed_genus("Lophotriletes", "rounded", &["circular"]);
    stored.diagnosis.sculpture = vec![SidedValue {
        side: Some("proximal".to_string()),
        value: "granulate".to_string(),
    }];
    db.create_genus(&stored).await.expect("Failed to create genus");

    // Same value on a different side: the single pair's side differs, so
    // no conflict.
    let mut other_side = stored.clone();
    other_side.name = "Acanthotriletes".to_string();
    other_side.diagnosis.sculpture = vec![SidedValue {
        side: Some("distal".to_string()),
        value: "granulate".to_string(),
    }];
    db.create_genus(&other_side)
        .await
        .expect("Different side on the first pair must not collide");

    // First pair matches the stored assignment; the second pair's side and
    // value are never consulted, so this collides even though the stored
    // diagnosis has no distal spinose sculpture.
    let mut quirky = stored.clone();
    quirky.name = "Trachytriletes".to_string();
    quirky.diagnosis.sculpture = vec![
        SidedValue {
            side: Some("proximal".to_string()),
            value: "granulate".to_string(),
        },
        SidedValue {
            side: Some("distal".to_string()),
            value: "spinose".to_string(),
        },
    ];
    let err = db
        .create_genus(&quirky)
        .await
        .expect_err("First-pair side match must collide");
    assert!(matches!(err, Error::DuplicateDiagnosis { .. }));
}

/// Updating a genus with its own unchanged diagnosis must not be reported
/// as a conflict with itself.
#[tokio::test]
async fn update_excludes_the_edited_genus() {
    let db = test_database().await;
    let payload = diagnosed_genus("Retusotriletes", "rounded", &["circular"]);
    let genus_id = db.create_genus(&payload).await.expect("Failed to create genus");

    db.update_genus(genus_id, &payload)
        .await
        .expect("Re-saving an unchanged genus must succeed");
}

/// Updating a genus so its diagnosis becomes identical to another stored
/// genus is still rejected.
#[tokio::test]
async fn update_cannot_clone_another_diagnosis() {
    let db = test_database().await;
    let first = diagnosed_genus("Leiotriletes", "rounded", &["circular"]);
    db.create_genus(&first).await.expect("Failed to create genus");
    let second = diagnosed_genus("Acanthotriletes", "triangular", &["oval"]);
    let second_id = db.create_genus(&second).await.expect("Failed to create genus");

    let mut collide = first.clone();
    collide.name = "Acanthotriletes".to_string();
    let err = db
        .update_genus(second_id, &collide)
        .await
        .expect_err("Update onto an existing diagnosis must be rejected");
    assert!(matches!(err, Error::DuplicateDiagnosis { .. }));
}
