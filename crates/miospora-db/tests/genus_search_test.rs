use miospora_core::filter::{keys, FilterMap, FilterMapExt, SidedTerm};
use miospora_core::models::{ExineLayerPayload, SidedValue};
use miospora_db::test_fixtures::{
    diagnosed_genus, full_genus, insert_location, insert_period, simple_genus, test_database,
};

/// An empty filter map returns every genus, including one whose diagnosis
/// carries no values at all.
#[tokio::test]
async fn empty_filter_returns_every_genus() {
    let db = test_database().await;
    db.create_genus(&simple_genus("Azonotriletes"))
        .await
        .expect("Failed to create bare genus");
    db.create_genus(&diagnosed_genus("Leiotriletes", "rounded", &["circular"]))
        .await
        .expect("Failed to create diagnosed genus");

    let results = db
        .find_genera(&FilterMap::new())
        .await
        .expect("Failed to run empty search");
    assert_eq!(results.len(), 2);
    // Ordered by name.
    assert_eq!(results[0].name, "Azonotriletes");
    assert_eq!(results[1].name, "Leiotriletes");
}

/// A single-valued reference axis narrows to genera whose diagnosis points
/// at one of the accepted vocabulary values.
#[tokio::test]
async fn scalar_axis_filters_by_accepted_values() {
    let db = test_database().await;
    db.create_genus(&diagnosed_genus("Leiotriletes", "rounded", &["circular"]))
        .await
        .expect("Failed to create genus");
    db.create_genus(&diagnosed_genus("Acanthotriletes", "triangular", &["triangular"]))
        .await
        .expect("Failed to create genus");

    let filters = FilterMap::new().with_terms(keys::FORM, &["rounded"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Leiotriletes");

    // OR within the accepted-value list.
    let filters = FilterMap::new().with_terms(keys::FORM, &["rounded", "triangular"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 2);
}

/// A present key with an empty accepted-value list matches nothing; an
/// unknown key is ignored entirely.
#[tokio::test]
async fn empty_value_set_and_unknown_keys() {
    let db = test_database().await;
    db.create_genus(&diagnosed_genus("Leiotriletes", "rounded", &["circular"]))
        .await
        .expect("Failed to create genus");

    let filters = FilterMap::new().with_terms(keys::FORM, &[]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert!(results.is_empty(), "empty accepted-value list must match nothing");

    let filters = FilterMap::new().with_terms("no_such_axis", &["anything"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1, "unknown keys must not constrain the search");
}

/// Matching several values of one multi-valued axis must not duplicate the
/// genus in the result set.
#[tokio::test]
async fn multi_valued_matches_never_multiply_rows() {
    let db = test_database().await;
    db.create_genus(&diagnosed_genus(
        "Punctatisporites",
        "rounded",
        &["circular", "oval"],
    ))
    .await
    .expect("Failed to create genus");

    let filters = FilterMap::new().with_terms(keys::AMB, &["circular", "oval"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1, "one genus matching twice must appear once");
}

/// Range axes use containment: the stored minimum must be at or above the
/// query floor, the stored maximum at or below the query ceiling.
#[tokio::test]
async fn size_range_containment() {
    let db = test_database().await;
    // full_genus stores length 20..45.
    db.create_genus(&full_genus("Retusotriletes"))
        .await
        .expect("Failed to create genus");

    let filters = FilterMap::new()
        .with_bound(keys::LENGTH_MIN, 15.0)
        .with_bound(keys::LENGTH_MAX, 50.0);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);

    let filters = FilterMap::new().with_bound(keys::LENGTH_MIN, 25.0);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert!(results.is_empty(), "stored minimum 20 is below the floor 25");

    let filters = FilterMap::new().with_bound(keys::LENGTH_MAX, 40.0);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert!(results.is_empty(), "stored maximum 45 exceeds the ceiling 40");
}

/// Every selected side-qualified pair must be satisfied; a pair with no
/// side matches the value on any side.
#[tokio::test]
async fn side_qualified_pairs_are_all_required() {
    let db = test_database().await;
    let mut payload = diagnosed_genus("Lophotriletes", "rounded", &["circular"]);
    payload.diagnosis.sculpture = vec![
        SidedValue {
            side: Some("proximal".to_string()),
            value: "granulate".to_string(),
        },
        SidedValue {
            side: Some("distal".to_string()),
            value: "verrucate".to_string(),
        },
    ];
    db.create_genus(&payload).await.expect("Failed to create genus");

    // Both stored pairs requested: match.
    let filters = FilterMap::new().with_sided(
        keys::SCULPTURE,
        vec![
            SidedTerm::new(Some("proximal"), "granulate"),
            SidedTerm::new(Some("distal"), "verrucate"),
        ],
    );
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);

    // Value exists but on the other side: no match.
    let filters = FilterMap::new().with_sided(
        keys::SCULPTURE,
        vec![SidedTerm::new(Some("proximal"), "verrucate")],
    );
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert!(results.is_empty());

    // Unspecified side matches any side.
    let filters = FilterMap::new()
        .with_sided(keys::SCULPTURE, vec![SidedTerm::new(None, "verrucate")]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);
}

/// Stratigraphic selections decode the packed string: absent components
/// impose nothing, the "null" literal requires a stored null.
#[tokio::test]
async fn stratigraphy_decoding_and_null_literal() {
    let db = test_database().await;
    insert_period(&db, Some("Devonian"), Some("Upper"), Some("Famennian")).await;
    insert_period(&db, Some("Devonian"), None, None).await;

    let mut famennian = diagnosed_genus("Archaeozonotriletes", "rounded", &["circular"]);
    famennian.stratigraphy = vec!["Devonian Upper, Famennian".to_string()];
    db.create_genus(&famennian).await.expect("Failed to create genus");

    let mut bare = diagnosed_genus("Hymenozonotriletes", "triangular", &["oval"]);
    bare.stratigraphy = vec!["Devonian null".to_string()];
    db.create_genus(&bare).await.expect("Failed to create genus");

    // Period-only selection matches both.
    let filters = FilterMap::new().with_terms(keys::STRATIGRAPHY, &["Devonian"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 2);

    // "null" epoch requires a stored null epoch.
    let filters = FilterMap::new().with_terms(keys::STRATIGRAPHY, &["Devonian null"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Hymenozonotriletes");

    // Unrelated period matches nothing.
    let filters = FilterMap::new().with_terms(keys::STRATIGRAPHY, &["Carboniferous"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert!(results.is_empty());
}

/// Geographic selections match by leaf name, case-insensitively; the
/// parent label carried in the packed string is informational.
#[tokio::test]
async fn geography_matches_leaf_name_case_insensitively() {
    let db = test_database().await;
    let russia = insert_location(&db, "Russia", None).await;
    insert_location(&db, "Siberia", Some(russia)).await;

    let mut payload = diagnosed_genus("Calamospora", "rounded", &["circular"]);
    payload.geography = vec!["Russia: Siberia".to_string()];
    db.create_genus(&payload).await.expect("Failed to create genus");

    let filters = FilterMap::new().with_terms(keys::GEOGRAPHY, &["Russia: Siberia"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);

    let filters = FilterMap::new().with_terms(keys::GEOGRAPHY, &["SIBERIA"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1, "leaf-name matching is case-insensitive");
}

/// The shared thickness vocabulary is filtered per structural context: an
/// exine thickness never satisfies an exoexine thickness filter.
#[tokio::test]
async fn thickness_contexts_do_not_cross_contaminate() {
    let db = test_database().await;

    let mut exine = diagnosed_genus("Trachytriletes", "rounded", &["circular"]);
    exine.diagnosis.exine_thickness = Some("2 µm".to_string());
    db.create_genus(&exine).await.expect("Failed to create genus");

    let mut exo = diagnosed_genus("Stenozonotriletes", "triangular", &["oval"]);
    exo.diagnosis.exoexine = Some(ExineLayerPayload {
        thickness: Some("2 µm".to_string()),
        description: None,
    });
    db.create_genus(&exo).await.expect("Failed to create genus");

    let filters = FilterMap::new().with_terms(keys::EXINE_THICKNESS, &["2 µm"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Trachytriletes");

    let filters = FilterMap::new().with_terms(keys::EXOEXINE_THICKNESS, &["2 µm"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Stenozonotriletes");
}

/// The facets reached through the infraturma reference are filterable even
/// though they sit one table removed from the diagnosis.
#[tokio::test]
async fn infraturma_facets_filter_through_the_reference() {
    let db = test_database().await;

    // Wire an infraturma with a laesurae character by hand; payloads only
    // carry the infraturma name.
    sqlx::query("INSERT INTO character_of_laesurae (name) VALUES ('trilete')")
        .execute(db.pool())
        .await
        .expect("Failed to insert facet");
    sqlx::query(
        "INSERT INTO infraturma (name, character_of_laesurae_id) \
         VALUES ('Laevigati', (SELECT id FROM character_of_laesurae WHERE name = 'trilete'))",
    )
    .execute(db.pool())
    .await
    .expect("Failed to insert infraturma");

    let mut payload = diagnosed_genus("Leiotriletes", "rounded", &["circular"]);
    payload.diagnosis.infraturma = Some("Laevigati".to_string());
    db.create_genus(&payload).await.expect("Failed to create genus");

    let filters = FilterMap::new().with_terms(keys::CHARACTER_OF_LAESURAE, &["trilete"]);
    let results = db.find_genera(&filters).await.expect("Failed to search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].infraturma.as_deref(), Some("Laevigati"));
}

/// Summary rows come back with synonyms and stratigraphy already attached.
#[tokio::test]
async fn summaries_attach_synonyms_and_stratigraphy() {
    let db = test_database().await;
    insert_period(&db, Some("Carboniferous"), None, None).await;

    let mut payload = full_genus("Densosporites");
    payload.stratigraphy = vec!["Carboniferous".to_string()];
    db.create_genus(&payload).await.expect("Failed to create genus");

    let results = db
        .find_genera(&FilterMap::new())
        .await
        .expect("Failed to search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].synonyms, vec!["Densosporitesites".to_string()]);
    assert_eq!(results[0].stratigraphy, vec!["Carboniferous".to_string()]);
}
