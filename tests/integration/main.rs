//! Integration tests for workref

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn workref() -> Command {
        cargo_bin_cmd!("workref")
    }

    #[test]
    fn help_displays() {
        workref()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("worker-qualified cache result storage"));
    }

    #[test]
    fn version_displays() {
        workref()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("workref"));
    }

    #[test]
    fn id_encode() {
        workref()
            .args(["id", "encode", "w1", "r42"])
            .assert()
            .success()
            .stdout("w1::r42\n");
    }

    #[test]
    fn id_encode_worker_only() {
        workref()
            .args(["id", "encode", "w1"])
            .assert()
            .success()
            .stdout("w1::\n");
    }

    #[test]
    fn id_encode_rejects_colon_at_boundary() {
        workref()
            .args(["id", "encode", "a:", "b"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid worker id"))
            .stderr(predicate::str::contains("Hint:"));

        workref()
            .args(["id", "decode", "a:::b"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid workerref id"));
    }

    #[test]
    fn id_decode_json() {
        workref()
            .args(["id", "decode", "--json", "w1::r42"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""worker_id": "w1""#))
            .stdout(predicate::str::contains(r#""ref_id": "r42""#));
    }

    #[test]
    fn id_decode_malformed() {
        workref()
            .args(["id", "decode", "w1::r42::extra"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid workerref id"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        workref()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains(r#"default_compression = "gzip""#));
    }

    #[test]
    fn config_init_then_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        workref()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(path.exists());

        workref()
            .arg("--config")
            .arg(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_init_force_repairs_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\ndefault_compression = \"lz4\"\n").unwrap();

        workref()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));

        workref()
            .arg("--config")
            .arg(&path)
            .args(["config", "init", "--force"])
            .assert()
            .success();

        workref()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success();
    }

    #[test]
    fn config_rejects_unknown_log_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_format = \"xml\"\n").unwrap();

        workref()
            .arg("--config")
            .arg(&path)
            .args(["id", "encode", "w1", "r1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }
}

mod storage_tests {
    use chrono::Utc;
    use futures_util::future::join_all;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use workref::compression::{CompressionOpt, CompressionType};
    use workref::session::Group;
    use workref::worker::{MemoryWorker, Worker, WorkerController, WorkerRef, WorkerResult};
    use workref::{CacheResult, CacheResultStorage, SolverResult, WorkerCacheStorage};

    fn setup(workers: &[Arc<MemoryWorker>]) -> WorkerCacheStorage {
        let controller = WorkerController::new();
        for worker in workers {
            controller.add(worker.clone()).unwrap();
        }
        WorkerCacheStorage::new(Arc::new(controller))
    }

    #[tokio::test]
    async fn save_load_exists_scenario() {
        let w1 = Arc::new(MemoryWorker::new("w1"));
        w1.put("r42", b"compiled output").unwrap();
        let storage = setup(&[w1.clone()]);
        let ctx = CancellationToken::new();

        // The solver just produced r42 on w1
        let produced = w1.load_ref(&ctx, "r42", false).await.unwrap();
        let result = WorkerResult::new(WorkerRef::new(Some(produced), w1.clone()));
        let created_at = Utc::now();
        let saved = storage.save(&result, created_at).await.unwrap();
        assert_eq!(saved.id, "w1::r42");
        assert_eq!(saved.created_at, created_at);
        Box::new(result).release().unwrap();

        // Persisted form survives a restart
        let persisted = serde_json::to_string(&saved).unwrap();
        let restored: CacheResult = serde_json::from_str(&persisted).unwrap();

        let loaded = storage.load(&ctx, &restored).await.unwrap();
        {
            let wref = loaded.sys().downcast_ref::<WorkerRef>().unwrap();
            assert_eq!(wref.worker().id(), "w1");
            assert_eq!(wref.immutable_ref().map(|r| r.id()), Some("r42"));
        }

        assert!(storage.exists("w1::r42").await);
        assert!(!storage.exists("w1::rMissing").await);
        assert!(!storage.exists("ghost::r1").await);

        loaded.release().unwrap();
        assert_eq!(w1.outstanding(), 0);
    }

    #[tokio::test]
    async fn identities_route_to_owning_worker() {
        let w1 = Arc::new(MemoryWorker::new("w1"));
        let w2 = Arc::new(MemoryWorker::new("w2"));
        w1.put("shared", b"from w1").unwrap();
        w2.put_with_blobs("shared", b"from w2", &[CompressionType::Zstd]).unwrap();
        let storage = setup(&[w1.clone(), w2.clone()]);

        let res = CacheResult {
            id: "w2::shared".to_string(),
            created_at: Utc::now(),
        };
        let opt = CompressionOpt::new(CompressionType::Zstd);
        let remotes = storage
            .load_remotes(&CancellationToken::new(), &res, Some(&opt), &Group::empty())
            .await
            .unwrap();

        assert_eq!(remotes.len(), 1);
        assert_eq!(w2.hidden_loads(), 1);
        assert_eq!(w1.hidden_loads(), 0);
        assert!(w1.export_requests().is_empty());
    }

    #[tokio::test]
    async fn concurrent_probes_release_every_handle() {
        let w1 = Arc::new(MemoryWorker::new("w1"));
        let mut ids = Vec::new();
        for i in 0..16 {
            let ref_id = w1.insert(format!("layer {}", i).as_bytes());
            ids.push(format!("w1::{}", ref_id));
        }
        let storage = Arc::new(setup(&[w1.clone()]));

        let probes = ids.iter().map(|id| {
            let storage = storage.clone();
            let id = id.clone();
            async move {
                let res = CacheResult {
                    id: id.clone(),
                    created_at: Utc::now(),
                };
                let exists = storage.exists(&id).await;
                let remotes = storage
                    .load_remotes(
                        &CancellationToken::new(),
                        &res,
                        Some(&CompressionOpt::default()),
                        &Group::empty(),
                    )
                    .await;
                (exists, remotes)
            }
        });

        for (exists, remotes) in join_all(probes).await {
            assert!(exists);
            // No blob was exported ahead of time, so every export comes back empty
            assert!(remotes.unwrap().is_empty());
        }
        assert_eq!(w1.hidden_loads(), 32);
        assert_eq!(w1.outstanding(), 0);
    }
}
