use miospora_db::test_fixtures::{
    diagnosed_genus, insert_location, insert_period, test_database,
};

/// Seeding loads the initial allowed values and is idempotent.
#[tokio::test]
async fn seed_defaults_is_idempotent() {
    let db = test_database().await;
    db.seed_defaults().await.expect("Failed to seed vocabularies");

    let options = db
        .reference_option_lists()
        .await
        .expect("Failed to collect option lists");
    let forms = options.get("form").expect("form options must exist");
    assert!(forms.contains(&"rounded".to_string()));
    assert!(forms.contains(&"triangular".to_string()));
    let first_count = forms.len();

    db.seed_defaults().await.expect("Second seeding must not fail");
    let options = db
        .reference_option_lists()
        .await
        .expect("Failed to collect option lists");
    assert_eq!(
        options.get("form").expect("form options must exist").len(),
        first_count,
        "re-seeding must not duplicate values"
    );
}

/// Values upserted through a genus submission show up in the option lists.
#[tokio::test]
async fn submissions_extend_the_vocabularies() {
    let db = test_database().await;
    db.create_genus(&diagnosed_genus("Leiotriletes", "biconvex", &["fusiform"]))
        .await
        .expect("Failed to create genus");

    let options = db
        .reference_option_lists()
        .await
        .expect("Failed to collect option lists");
    assert!(options
        .get("form")
        .expect("form options must exist")
        .contains(&"biconvex".to_string()));
    assert!(options
        .get("amb")
        .expect("amb options must exist")
        .contains(&"fusiform".to_string()));
}

/// The thickness context lists only carry values actually referenced
/// through that context.
#[tokio::test]
async fn thickness_lists_are_per_context() {
    let db = test_database().await;
    let mut payload = diagnosed_genus("Trachytriletes", "rounded", &["circular"]);
    payload.diagnosis.exine_thickness = Some("2 µm".to_string());
    db.create_genus(&payload).await.expect("Failed to create genus");

    let options = db
        .reference_option_lists()
        .await
        .expect("Failed to collect option lists");
    assert_eq!(
        options.get("exine_thickness").expect("list must exist"),
        &vec!["2 µm".to_string()]
    );
    assert!(options
        .get("exoexine_thickness")
        .expect("list must exist")
        .is_empty());
    // The shared vocabulary list still carries the value.
    assert!(options
        .get("thickness")
        .expect("list must exist")
        .contains(&"2 µm".to_string()));
}

/// Stratigraphy and geography come in used-only and all variants, encoded
/// as their packed display strings.
#[tokio::test]
async fn distribution_lists_have_used_and_all_variants() {
    let db = test_database().await;
    insert_period(&db, Some("Devonian"), Some("Upper"), Some("Famennian")).await;
    insert_period(&db, Some("Carboniferous"), None, None).await;
    let russia = insert_location(&db, "Russia", None).await;
    insert_location(&db, "Siberia", Some(russia)).await;

    let mut payload = diagnosed_genus("Archaeozonotriletes", "rounded", &["circular"]);
    payload.stratigraphy = vec!["Devonian Upper, Famennian".to_string()];
    payload.geography = vec!["Russia: Siberia".to_string()];
    db.create_genus(&payload).await.expect("Failed to create genus");

    let options = db
        .reference_option_lists()
        .await
        .expect("Failed to collect option lists");

    assert_eq!(
        options.get("stratigraphy").expect("list must exist"),
        &vec!["Devonian Upper, Famennian".to_string()]
    );
    let all = options.get("stratigraphy_all").expect("list must exist");
    assert!(all.contains(&"Carboniferous".to_string()));
    assert!(all.contains(&"Devonian Upper, Famennian".to_string()));

    assert_eq!(
        options.get("geography").expect("list must exist"),
        &vec!["Russia: Siberia".to_string()]
    );
    let all = options.get("geography_all").expect("list must exist");
    assert!(all.contains(&"Russia".to_string()));
    assert!(all.contains(&"Russia: Siberia".to_string()));
}

/// The in-use side lists track only sides actually assigned on that axis.
#[tokio::test]
async fn side_lists_track_assignments() {
    let db = test_database().await;
    let mut payload = diagnosed_genus("Lophotriletes", "rounded", &["circular"]);
    payload.diagnosis.sculpture = vec![miospora_core::models::SidedValue {
        side: Some("proximal".to_string()),
        value: "granulate".to_string(),
    }];
    db.create_genus(&payload).await.expect("Failed to create genus");

    let options = db
        .reference_option_lists()
        .await
        .expect("Failed to collect option lists");
    assert_eq!(
        options.get("sculpture_sides").expect("list must exist"),
        &vec!["proximal".to_string()]
    );
    assert!(options
        .get("ornamentation_sides")
        .expect("list must exist")
        .is_empty());
}
