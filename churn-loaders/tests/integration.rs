//! End-to-end tests for the loading services

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use churn_loaders::{
    DataPaths, DatasetLoader, EnvironmentContext, ErrorKind, ModelStore, Settings, SplitOptions,
};
use serde::{Deserialize, Serialize};
use tempfile::tempdir;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChurnClassifier {
    feature_names: Vec<String>,
    thresholds: Vec<f32>,
}

fn write_raw_data(root: &Path) -> DataPaths {
    let raw = root.join("raw");
    fs::create_dir_all(&raw).unwrap();
    fs::write(
        raw.join("train.csv"),
        "feature1,feature2,churn\n0,4,no\n1,5,yes\n2,6,no\n3,7,yes\n",
    )
    .unwrap();
    fs::write(raw.join("test.csv"), "feature1,feature2\n0,2\n1,3\n").unwrap();
    fs::write(raw.join("sampleSubmission.csv"), "id,churn\n1,no\n2,no\n").unwrap();

    DataPaths {
        train_csv: raw.join("train.csv"),
        processed_dir: root.join("processed"),
    }
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_four_row_split_scenario() {
    let dir = tempdir().unwrap();
    let loader = DatasetLoader::new(write_raw_data(dir.path()), EnvironmentContext::default());

    let table = loader.load_train().unwrap();
    let splits = loader
        .get_splits(
            &table,
            &SplitOptions {
                target: "churn".into(),
                test_fraction: 0.5,
                seed: 42,
            },
        )
        .unwrap();

    assert_eq!(splits.y_train.len(), 2);
    assert_eq!(splits.y_val.len(), 2);
    for labels in [&splits.y_train, &splits.y_val] {
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["no".to_string(), "yes".to_string()]);
    }

    let again = loader
        .get_splits(
            &table,
            &SplitOptions {
                test_fraction: 0.5,
                ..SplitOptions::default()
            },
        )
        .unwrap();
    assert_eq!(again, splits);
}

#[test]
fn test_every_call_is_logged_with_env() {
    let dir = tempdir().unwrap();
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let loader = DatasetLoader::new(
            write_raw_data(dir.path()),
            EnvironmentContext::new("staging", "INFO"),
        );
        let table = loader.load_train().unwrap();
        loader.load_train().unwrap();
        loader
            .get_splits(
                &table,
                &SplitOptions {
                    test_fraction: 0.5,
                    ..SplitOptions::default()
                },
            )
            .unwrap();
    });

    let text = captured.text();
    assert_eq!(text.matches("calling DATA_LOAD load_train").count(), 2);
    assert_eq!(text.matches("completed DATA_LOAD load_train").count(), 2);
    assert_eq!(text.matches("Loaded train data").count(), 1);

    let lines: Vec<&str> = text.lines().collect();
    assert!(!lines.is_empty());
    for line in lines {
        assert!(line.contains("staging"), "event without env: {line}");
    }
    assert!(text.contains("split dataset"));
}

#[test]
fn test_concurrent_dataset_loads_read_once() {
    let dir = tempdir().unwrap();
    let loader = Arc::new(DatasetLoader::new(
        write_raw_data(dir.path()),
        EnvironmentContext::default(),
    ));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = Arc::clone(&loader);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                loader.load_test().unwrap()
            })
        })
        .collect();
    let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
    let (_, stats) = loader
        .stats()
        .into_iter()
        .find(|(name, _)| *name == "load_test")
        .unwrap();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 7);
}

#[test]
fn test_services_from_settings() {
    let dir = tempdir().unwrap();
    let settings = Settings {
        env: "prod".into(),
        data: write_raw_data(dir.path()),
        model_dir: dir.path().join("models"),
        ..Settings::default()
    };

    let loader = DatasetLoader::from_settings(&settings);
    let submission = loader.load_sample_submission().unwrap();
    assert_eq!(submission.num_rows(), 2);

    let store: ModelStore<ChurnClassifier> = ModelStore::from_settings(&settings);
    let model = ChurnClassifier {
        feature_names: vec!["feature1".into(), "feature2".into()],
        thresholds: vec![0.5, 1.5],
    };
    store.save(model.clone(), "mlp_churn_model").unwrap();
    assert!(dir.path().join("models/mlp_churn_model.bin").exists());

    let reopened: ModelStore<ChurnClassifier> = ModelStore::from_settings(&settings);
    assert_eq!(*reopened.load("mlp_churn_model").unwrap(), model);
    assert_eq!(
        reopened.load("missing_model").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}
