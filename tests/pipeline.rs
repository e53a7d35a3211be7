use std::fs;
use std::path::Path;

use foodcluster::{Algorithm, Error, Pipeline, PipelineConfig, NOISE};
use tempfile::TempDir;

const FIVE_FOODS: &str = "\
smlmitzrach,shmmitzrach,protein,total_fat,carbohydrates,alcohol,food_energy
1,oat flakes,2.0,1.0,1.0,,60
2,oat bran,2.2,1.1,0.9,,62
3,beef stew,20.0,15.0,10.0,,250
4,lamb stew,21.0,14.0,10.5,0,255
5,pork stew,19.5,15.5,9.5,,
";

const TAXONOMY: &str = "\
id,name
1,GroupA
3,GroupB
";

fn setup(foods: &str, taxonomy: &str) -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "foods.csv", foods);
    write(dir.path(), "groups.csv", taxonomy);

    let mut config = PipelineConfig::default();
    config.data.dataset = dir.path().join("foods.csv");
    config.data.taxonomy = dir.path().join("groups.csv");
    config.data.labeled_dataset = dir.path().join("labeled.csv");
    config.data.output_dir = dir.path().join("out");
    config.clustering.n_clusters = 2;
    (dir, config)
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn group_column(path: &Path) -> Vec<String> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let col = headers.iter().position(|h| h == "group_name").unwrap();
    reader
        .records()
        .map(|r| r.unwrap()[col].to_string())
        .collect()
}

#[test]
fn test_five_records_two_groups() {
    let (_dir, config) = setup(FIVE_FOODS, TAXONOMY);
    let pipeline = Pipeline::new(config).unwrap();

    let features = pipeline.load_features().unwrap();
    let taxonomy = pipeline.load_taxonomy().unwrap();
    assert_eq!(features.len(), 5);

    let labeling = pipeline.label(&features, &taxonomy, Algorithm::Kmeans).unwrap();
    let labels = labeling.assignment.labels();
    assert_eq!(labels[0], labels[1]);
    assert!(labels[2..].iter().all(|&l| l == labels[2]));
    assert_ne!(labels[0], labels[2]);

    let matrix = labeling.reconciliation.matrix();
    assert_eq!(matrix.clusters_for("GroupA"), vec![labels[0]]);
    assert_eq!(matrix.clusters_for("GroupB"), vec![labels[2]]);

    let paths = pipeline.write_labeling(&labeling).unwrap();
    assert!(paths[0].ends_with("labeled_kmeans.csv"));
    assert!(paths[1].ends_with("food_groups_kmeans.csv"));
    assert_eq!(
        group_column(&paths[0]),
        vec!["GroupA", "GroupA", "GroupB", "GroupB", "GroupB"]
    );

    let membership = fs::read_to_string(&paths[1]).unwrap();
    let mut lines = membership.lines();
    assert_eq!(lines.next(), Some("group,0,1"));
    let group_a = lines.next().unwrap();
    assert!(group_a.starts_with("GroupA,"));
    assert_eq!(group_a.matches('✅').count(), 1);
}

#[test]
fn test_all_noise_is_unclassified() {
    let (_dir, mut config) = setup(FIVE_FOODS, TAXONOMY);
    config.clustering.dbscan_eps = 0.01;
    config.clustering.dbscan_min_samples = 2;
    let pipeline = Pipeline::new(config).unwrap();

    let features = pipeline.load_features().unwrap();
    let taxonomy = pipeline.load_taxonomy().unwrap();
    let labeling = pipeline.label(&features, &taxonomy, Algorithm::Dbscan).unwrap();

    assert!(labeling.assignment.labels().iter().all(|&l| l == NOISE));
    assert_eq!(labeling.reconciliation.unplaced(), &[1, 3]);

    let paths = pipeline.write_labeling(&labeling).unwrap();
    assert!(group_column(&paths[0]).iter().all(|g| g == "unclassified"));

    let membership = fs::read_to_string(&paths[1]).unwrap();
    assert!(membership.starts_with("group,-1\n"));
    assert!(!membership.contains('✅'));
}

#[test]
fn test_missing_macronutrient_rows_dropped() {
    let foods = "\
smlmitzrach,shmmitzrach,protein,total_fat,carbohydrates
1,a,1.0,1.0,1.0
2,b,,1.0,1.0
3,c,1.1,NaN,1.0
4,d,9.0,9.0,9.0
";
    let (_dir, config) = setup(foods, "id,name\n1,x\n4,y\n");
    let pipeline = Pipeline::new(config).unwrap();

    let features = pipeline.load_features().unwrap();

    assert_eq!(features.len(), 2);
    assert_eq!(features.dropped(), 2);
    assert_eq!(features.ids(), vec![1, 4]);
}

#[test]
fn test_missing_columns_is_data_error() {
    let (_dir, config) = setup("smlmitzrach,protein,total_fat\n1,1.0,2.0\n", TAXONOMY);
    let pipeline = Pipeline::new(config).unwrap();

    let err = pipeline.load_features().unwrap_err();

    assert!(err.is_data_error());
    match err {
        Error::MissingColumns { columns } => assert_eq!(columns, vec!["carbohydrates"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_taxonomy_id_absent_from_dataset() {
    let (_dir, config) = setup(FIVE_FOODS, "id,name\n1,GroupA\n42,GroupZ\n");
    let pipeline = Pipeline::new(config).unwrap();

    let features = pipeline.load_features().unwrap();
    let taxonomy = pipeline.load_taxonomy().unwrap();
    let err = pipeline.label(&features, &taxonomy, Algorithm::Kmeans).unwrap_err();

    assert!(matches!(err, Error::MissingTaxonomyRecord { id: 42 }));
}

#[test]
fn test_selector_strictness() {
    let (_dir, mut config) = setup(FIVE_FOODS, TAXONOMY);
    let strict = Pipeline::new(config.clone()).unwrap();
    let features = strict.load_features().unwrap();
    let taxonomy = strict.load_taxonomy().unwrap();

    let err = strict.label_selector(&features, &taxonomy, "birch").unwrap_err();
    assert!(matches!(err, Error::UnknownAlgorithm(_)));

    config.clustering.strict_selector = false;
    let lenient = Pipeline::new(config).unwrap();
    let labeling = lenient.label_selector(&features, &taxonomy, "birch").unwrap();
    assert_eq!(labeling.algorithm(), Algorithm::FallbackKmeans);

    let paths = lenient.write_labeling(&labeling).unwrap();
    assert!(paths[0].ends_with("labeled_fallback_kmeans.csv"));
}

#[test]
fn test_evaluate_writes_scores() {
    let (dir, mut config) = setup(FIVE_FOODS, TAXONOMY);
    let mut labeled = String::from("protein,total_fat,carbohydrates,alcohol,SubFoodGroupLabel\n");
    for i in 0..4 {
        labeled.push_str(&format!("{},1.0,1.0,,grains\n", 1.0 + i as f64 * 0.1));
    }
    for i in 0..4 {
        labeled.push_str(&format!("{},20.0,5.0,0,meat\n", 30.0 + i as f64 * 0.1));
    }
    labeled.push_str("5.0,5.0,5.0,0,\n");
    write(dir.path(), "labeled.csv", &labeled);
    config.evaluation.algorithms = vec![Algorithm::Kmeans, Algorithm::Hierarchical];
    let pipeline = Pipeline::new(config).unwrap();

    let truth = pipeline.load_ground_truth().unwrap();
    assert_eq!(truth.len(), 8);

    let scores = pipeline.evaluate(&truth).unwrap();
    assert_eq!(scores.len(), 2);
    for s in &scores {
        assert!((s.ari - 1.0).abs() < 1e-10);
        assert!((s.v_measure - 1.0).abs() < 1e-10);
    }

    let path = pipeline.write_scores(&scores).unwrap();
    let text = fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "algorithm,ari,fowlkes_mallows,ami,v_measure");
    assert!(lines[1].starts_with("kmeans,"));
    assert!(lines[2].starts_with("hierarchical,"));
}

#[test]
fn test_profiles_written() {
    let (_dir, mut config) = setup(FIVE_FOODS, TAXONOMY);
    config.report.top_keywords = 1;
    let pipeline = Pipeline::new(config).unwrap();

    let features = pipeline.load_features().unwrap();
    let taxonomy = pipeline.load_taxonomy().unwrap();
    let labeling = pipeline.label(&features, &taxonomy, Algorithm::Kmeans).unwrap();
    let profiles = pipeline.profile(&labeling);

    assert_eq!(profiles.len(), 2);
    let stews = profiles.iter().find(|p| p.group_name == "GroupB").unwrap();
    assert_eq!(stews.size, 3);
    assert_eq!(stews.keywords[0].word, "stew");
    assert_eq!(stews.food_energy, Some(252.5));

    let path = pipeline.write_profiles(labeling.algorithm(), &profiles).unwrap();
    assert!(path.ends_with("profiles_kmeans.csv"));
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("stew:3"));
}
