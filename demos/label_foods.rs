use foodcluster::features::{self, RawTable};
use foodcluster::reconciliation::UNCLASSIFIED;
use foodcluster::{Algorithm, ClusteringEngine, PipelineConfig, Taxonomy};

const FOODS: &str = "\
smlmitzrach,shmmitzrach,protein,total_fat,carbohydrates,alcohol,food_energy
1,whole wheat bread,9.0,3.0,41.0,,247
2,rye bread,8.5,3.3,48.0,,259
3,pita,9.1,1.2,55.7,,275
4,chicken breast,31.0,3.6,0.0,,165
5,turkey breast,29.0,1.0,0.0,,135
6,beef sirloin,27.0,8.0,0.0,,183
7,red wine,0.1,0.0,2.6,10.6,85
8,beer,0.5,0.0,3.6,3.9,43
9,olive oil,0.0,100.0,0.0,,884
10,apple,0.3,0.2,13.8,,52
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Cluster ten foods into four groups and name each cluster after the
    // reference groups whose representative food landed in it.
    let config = PipelineConfig::default();
    let table = features::extract(&RawTable::from_reader(FOODS.as_bytes())?, &config.schema)?;
    let taxonomy = Taxonomy::from_pairs([(1, "grains"), (4, "meat"), (7, "alcoholic drinks")])?;

    let engine = ClusteringEngine::new(foodcluster::config::ClusteringConfig {
        n_clusters: 4,
        dbscan_eps: 5.0,
        dbscan_min_samples: 2,
        ..config.clustering
    });

    for algorithm in [Algorithm::Kmeans, Algorithm::Hierarchical, Algorithm::Dbscan] {
        let assignment = engine.fit(algorithm, &table.matrix())?;
        let result = foodcluster::reconcile(&table, &assignment, &taxonomy, UNCLASSIFIED)?;

        println!("{algorithm}:");
        for labeled in result.records() {
            println!(
                "  {:<18} cluster {:>2}  {}",
                labeled.record.name,
                labeled.cluster,
                labeled.group_name.replace('\n', " + ")
            );
        }
        for group in result.matrix().groups() {
            println!("  {group} -> clusters {:?}", result.matrix().clusters_for(group));
        }
    }

    Ok(())
}
