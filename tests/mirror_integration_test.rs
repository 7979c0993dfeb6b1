use anyhow::Result;
use config_mirror::core::engine::report_outcome;
use config_mirror::utils::error::{AuthError, MirrorError};
use config_mirror::{
    AuthenticatingClient, ClientOptions, Credential, LocalConfigStore, MirrorEngine,
    MirrorSettings, MirrorTarget, TreeDiscoverer,
};
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

// base64("user:secret")
const BASIC_AUTH: &str = "Basic dXNlcjpzZWNyZXQ=";
const FOLDER: &str = "com.cloudbees.hudson.plugins.folder.Folder";
const JOB: &str = "hudson.model.FreeStyleProject";

/// Serves `body` only to requests carrying credentials; anonymous requests get
/// a 403 challenge. Returns the authorized mock.
fn protected<'a>(server: &'a MockServer, path: &str, status: u16, body: &str) -> Mock<'a> {
    let authorized = server.mock(|when, then| {
        when.method(GET).path(path).header("authorization", BASIC_AUTH);
        then.status(status).body(body);
    });
    server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(403);
    });
    authorized
}

fn credential() -> Option<Credential> {
    Some(Credential::new("user", "secret"))
}

fn settings(server: &MockServer, output: &Path, credential: Option<Credential>) -> MirrorSettings {
    MirrorSettings {
        targets: vec![MirrorTarget {
            name: "default".to_string(),
            root_url: server.url("/job/project/"),
            output_subdir: None,
        }],
        output_path: output.to_path_buf(),
        concurrency: 4,
        skip_folders: vec!["GenPRTest".to_string()],
        request_timeout: Duration::from_secs(5),
        probe_url: server.url("/configure"),
        credential,
    }
}

struct ProjectTree<'a> {
    listings: Vec<Mock<'a>>,
    hidden_listing: Mock<'a>,
    configs: Vec<Mock<'a>>,
}

/// project/ -> [F/ -> [J2], J1, GenPRTest/ -> [Hidden]]
fn mount_project_tree(server: &MockServer) -> ProjectTree<'_> {
    let root = json!({"jobs": [
        {"_class": FOLDER, "name": "F", "url": server.url("/job/project/job/F/")},
        {"_class": JOB, "name": "J1", "url": server.url("/job/project/job/J1/")},
        {"_class": FOLDER, "name": "GenPRTest", "url": server.url("/job/project/job/GenPRTest/")},
    ]});
    let folder = json!({"jobs": [
        {"_class": JOB, "name": "J2", "url": server.url("/job/project/job/F/job/J2/")},
    ]});
    let hidden = json!({"jobs": [
        {"_class": JOB, "name": "Hidden", "url": server.url("/job/project/job/GenPRTest/job/Hidden/")},
    ]});

    ProjectTree {
        listings: vec![
            protected(server, "/job/project/api/json", 200, &root.to_string()),
            protected(server, "/job/project/job/F/api/json", 200, &folder.to_string()),
        ],
        hidden_listing: protected(
            server,
            "/job/project/job/GenPRTest/api/json",
            200,
            &hidden.to_string(),
        ),
        configs: vec![
            protected(
                server,
                "/job/project/job/F/job/J2/config.xml",
                200,
                "<project><name>J2</name></project>",
            ),
            protected(
                server,
                "/job/project/job/J1/config.xml",
                200,
                "<project><name>J1</name></project>",
            ),
        ],
    }
}

fn mount_probe(server: &MockServer) -> Mock<'_> {
    protected(server, "/configure", 200, "")
}

#[tokio::test]
async fn test_mirror_run_behind_auth_challenge() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    let probe = mount_probe(&server);
    let tree = mount_project_tree(&server);

    let summary = MirrorEngine::new(settings(&server, output.path(), credential()))
        .run()
        .await?;

    assert!(summary.is_success());
    let report = &summary.targets[0].report;
    assert_eq!(summary.targets[0].discovered, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped, 0);

    probe.assert_hits(1);
    tree.hidden_listing.assert_hits(0);
    for mock in &tree.configs {
        mock.assert_hits(1);
    }

    assert_eq!(
        std::fs::read_to_string(output.path().join("J1.xml"))?,
        "<project><name>J1</name></project>"
    );
    assert_eq!(
        std::fs::read_to_string(output.path().join("J2.xml"))?,
        "<project><name>J2</name></project>"
    );
    assert!(!output.path().join("Hidden.xml").exists());
    Ok(())
}

#[tokio::test]
async fn test_second_run_fetches_no_bodies() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    mount_probe(&server);
    let tree = mount_project_tree(&server);

    let first = MirrorEngine::new(settings(&server, output.path(), credential()))
        .run()
        .await?;
    let j1_before = std::fs::read(output.path().join("J1.xml"))?;
    let j2_before = std::fs::read(output.path().join("J2.xml"))?;

    let second = MirrorEngine::new(settings(&server, output.path(), credential()))
        .run()
        .await?;

    assert_eq!(first.targets[0].report.succeeded, 2);
    assert_eq!(second.targets[0].report.succeeded, 0);
    assert_eq!(second.targets[0].report.skipped, 2);
    assert!(second.is_success());

    // listings are walked again, bodies are not
    for mock in &tree.listings {
        mock.assert_hits(2);
    }
    for mock in &tree.configs {
        mock.assert_hits(1);
    }

    assert_eq!(std::fs::read(output.path().join("J1.xml"))?, j1_before);
    assert_eq!(std::fs::read(output.path().join("J2.xml"))?, j2_before);
    Ok(())
}

#[tokio::test]
async fn test_one_failing_job_is_reported_and_others_are_saved() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    let root = json!({"jobs": [
        {"_class": JOB, "name": "a", "url": server.url("/job/a/")},
        {"_class": JOB, "name": "broken", "url": server.url("/job/broken/")},
        {"_class": JOB, "name": "c", "url": server.url("/job/c/")},
    ]});
    server.mock(|when, then| {
        when.method(GET).path("/api/json");
        then.status(200).json_body(root);
    });
    for name in ["a", "c"] {
        server.mock(|when, then| {
            when.method(GET).path(format!("/job/{}/config.xml", name));
            then.status(200).body(format!("<project>{}</project>", name));
        });
    }
    server.mock(|when, then| {
        when.method(GET).path("/job/broken/config.xml");
        then.status(500);
    });

    let mut settings = settings(&server, output.path(), None);
    settings.targets[0].root_url = server.url("/");

    let summary = MirrorEngine::new(settings).run().await?;
    let report = &summary.targets[0].report;

    assert!(!summary.is_success());
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed_names(), vec!["broken"]);
    assert_eq!(report.failed[0].url, server.url("/job/broken/config.xml"));
    assert!(output.path().join("a.xml").exists());
    assert!(output.path().join("c.xml").exists());
    assert!(!output.path().join("broken.xml").exists());

    assert_eq!(report_outcome(Ok(summary), None), 1);
    Ok(())
}

#[tokio::test]
async fn test_rejected_credentials_stop_before_discovery() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    server.mock(|when, then| {
        when.method(GET).path("/configure");
        then.status(401);
    });
    let root = server.mock(|when, then| {
        when.method(GET).path("/job/project/api/json");
        then.status(200).json_body(json!({"jobs": []}));
    });

    let err = MirrorEngine::new(settings(&server, output.path(), credential()))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::Auth(AuthError::Rejected { .. })));
    assert_eq!(err.exit_code(), 3);
    root.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_discovery_failure_downloads_nothing() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    let root = json!({"jobs": [
        {"_class": JOB, "name": "a", "url": server.url("/job/project/job/a/")},
        {"_class": FOLDER, "name": "F", "url": server.url("/job/project/job/F/")},
    ]});
    server.mock(|when, then| {
        when.method(GET).path("/job/project/api/json");
        then.status(200).json_body(root);
    });
    server.mock(|when, then| {
        when.method(GET).path("/job/project/job/F/api/json");
        then.status(502);
    });
    let config = server.mock(|when, then| {
        when.method(GET).path("/job/project/job/a/config.xml");
        then.status(200).body("<project/>");
    });

    let result = MirrorEngine::new(settings(&server, output.path(), None))
        .run()
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, MirrorError::Discovery(_)));
    assert_eq!(err.exit_code(), 4);
    config.assert_hits(0);
    assert_eq!(std::fs::read_dir(output.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_resumes_after_interruption() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    mount_probe(&server);
    let tree = mount_project_tree(&server);

    // A previous run finished J1 and crashed while writing J2.
    let store = LocalConfigStore::new(output.path());
    store.write_blocking("J1", b"<project><name>J1</name></project>")?;
    std::mem::forget(store.stage("J2", b"<proj")?);

    let summary = MirrorEngine::new(settings(&server, output.path(), credential()))
        .run()
        .await?;

    let report = &summary.targets[0].report;
    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded, 1);
    tree.configs[0].assert_hits(1);
    tree.configs[1].assert_hits(0);
    assert_eq!(
        std::fs::read_to_string(output.path().join("J2.xml"))?,
        "<project><name>J2</name></project>"
    );
    Ok(())
}

#[tokio::test]
async fn test_anonymous_run_skips_probe() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    let probe = server.mock(|when, then| {
        when.method(GET).path("/configure");
        then.status(200);
    });
    server.mock(|when, then| {
        when.method(GET).path("/job/project/api/json");
        then.status(200).json_body(json!({"jobs": [
            {"_class": JOB, "name": "solo", "url": server.url("/job/project/job/solo/")}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/job/project/job/solo/config.xml");
        then.status(200).body("<project/>");
    });

    let summary = MirrorEngine::new(settings(&server, output.path(), None))
        .run()
        .await?;

    assert!(summary.is_success());
    probe.assert_hits(0);
    assert!(output.path().join("solo.xml").exists());
    Ok(())
}

#[tokio::test]
async fn test_discovery_order_over_http() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/json");
        then.status(200).json_body(json!({"jobs": [
            {"_class": "Folder", "name": "F", "url": server.url("/F/")},
            {"_class": "Job", "name": "J1", "url": server.url("/J1/")},
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/F/api/json");
        then.status(200).json_body(json!({"jobs": [
            {"_class": "Job", "name": "J2", "url": server.url("/F/J2/")},
        ]}));
    });

    let client = AuthenticatingClient::new(ClientOptions::default())?;
    let discoverer = TreeDiscoverer::default();
    let first = discoverer.discover(&server.url("/"), &client).await?;
    let second = discoverer.discover(&server.url("/"), &client).await?;

    assert_eq!(first.names(), vec!["J2", "J1"]);
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_json_report_lists_failures() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    let report_dir = TempDir::new()?;
    server.mock(|when, then| {
        when.method(GET).path("/job/project/api/json");
        then.status(200).json_body(json!({"jobs": [
            {"_class": JOB, "name": "gone", "url": server.url("/job/project/job/gone/")}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/job/project/job/gone/config.xml");
        then.status(404);
    });

    let summary = MirrorEngine::new(settings(&server, output.path(), None))
        .run()
        .await?;
    let report_path = report_dir.path().join("report.json");
    assert_eq!(report_outcome(Ok(summary), Some(&report_path)), 1);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    let target = &json["targets"][0];
    assert_eq!(target["target"], "default");
    assert_eq!(target["discovered"], 1);
    assert_eq!(target["report"]["failed"][0]["name"], "gone");
    assert!(target["report"]["failed"][0]["cause"]
        .as_str()
        .unwrap()
        .contains("HTTP 404"));
    Ok(())
}

#[tokio::test]
async fn test_plan_lists_jobs_without_downloading() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    mount_probe(&server);
    let tree = mount_project_tree(&server);

    let plan = MirrorEngine::new(settings(&server, output.path(), credential()))
        .plan()
        .await?;

    assert_eq!(plan.len(), 1);
    let (target, leaves) = &plan[0];
    assert_eq!(target.name, "default");
    assert_eq!(leaves.names(), vec!["J2", "J1"]);
    for mock in &tree.configs {
        mock.assert_hits(0);
    }
    assert_eq!(std::fs::read_dir(output.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_earlier_target_reports_survive_a_later_discovery_failure() -> Result<()> {
    let server = MockServer::start();
    let output = TempDir::new()?;
    server.mock(|when, then| {
        when.method(GET).path("/job/first/api/json");
        then.status(200).json_body(json!({"jobs": [
            {"_class": JOB, "name": "gone", "url": server.url("/job/first/job/gone/")}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/job/first/job/gone/config.xml");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method(GET).path("/job/second/api/json");
        then.status(500);
    });

    let mut settings = settings(&server, output.path(), None);
    settings.targets = vec![
        MirrorTarget {
            name: "first".to_string(),
            root_url: server.url("/job/first/"),
            output_subdir: Some("first".to_string()),
        },
        MirrorTarget {
            name: "second".to_string(),
            root_url: server.url("/job/second/"),
            output_subdir: Some("second".to_string()),
        },
    ];

    let engine = MirrorEngine::new(settings);
    let mut summary = config_mirror::RunSummary::default();
    let err = engine.run_into(&mut summary).await.unwrap_err();

    assert!(matches!(err, MirrorError::Discovery(_)));
    assert_eq!(summary.targets.len(), 1);
    assert_eq!(summary.targets[0].target, "first");
    assert_eq!(summary.targets[0].report.failed_names(), vec!["gone"]);

    // run() reports the same error after printing the partial results
    assert_eq!(engine.run().await.unwrap_err().exit_code(), 4);
    Ok(())
}
