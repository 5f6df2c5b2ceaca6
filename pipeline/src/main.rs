use std::{collections::BTreeMap, env, path::Path, process};

use anyhow::Context;
use pipeline::{
    LocalStore,
    configs::{Adapter, PipelineConfig},
    upload_channels,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <prepare|inspect> <path>", args[0]);
        process::exit(1);
    }

    let path = Path::new(&args[2]);
    match args[1].as_str() {
        "prepare" => prepare(path).await,
        "inspect" => inspect(path).await,
        mode => {
            eprintln!("Unknown mode: {mode}. You must use 'prepare' or 'inspect'.");
            process::exit(1);
        }
    }
}

/// Loads the configured dataset and uploads its partitions to the local store.
async fn prepare(config_path: &Path) -> anyhow::Result<()> {
    let config = PipelineConfig::from_file(config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;

    let (dataset, classes) = config.dataset.load()?;
    let plan = Adapter::new().adapt(&config, &dataset)?;
    let store = LocalStore::new(&config.store_root);

    for channel in upload_channels(&store, &dataset, &plan).await? {
        println!(
            "{:<10} {:>8} rows  {:<32} {}",
            channel.kind,
            channel.rows,
            channel.content_type,
            store.path(&channel.location).display()
        );
    }

    if !classes.is_empty() {
        println!("classes: {}", classes.join(", "));
    }

    Ok(())
}

/// Summarizes a RecordIO dense record file, or a label first CSV file.
async fn inspect(path: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let is_csv = path.extension().is_some_and(|ext| ext == "csv");
    let (rows, dim, labels) = if is_csv {
        let rows = recordio::csv::parse_rows(std::str::from_utf8(&bytes)?)?;
        let dim = rows.first().map_or(0, |row| row.len().saturating_sub(1));
        let labels: Vec<f32> = rows.iter().filter_map(|row| row.first().copied()).collect();
        (rows.len(), dim, Some(labels))
    } else {
        let records = recordio::decode_dense(&bytes)?;
        let labels = records.labels.map(|labels| labels.to_vec());
        (records.features.nrows(), records.features.ncols(), labels)
    };

    println!("records:  {rows}");
    println!("features: {dim}");

    match labels {
        Some(labels) => {
            let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
            for label in labels {
                *counts.entry(label.round() as i64).or_default() += 1;
            }

            println!("labels:");
            for (label, count) in counts {
                println!("  {label:>6}: {count}");
            }
        }
        None => println!("labels:   none"),
    }

    Ok(())
}
