use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const SAMPLE_SERVICE: &str = r#"
service: demo
provider:
  name: aws
  region: eu-west-1
functions:
  hello:
    handler: handler.hello
    events:
      - schedule: rate(10 minutes)
  report:
    handler: handler.report
    memorySize: 256
    events:
      - cloudwatchLog:
          logGroup: /aws/lambda/demo-dev-hello
          filter: ERROR
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn with_service(content: &str) -> Self {
        let project = Self::new();
        project.write_service(content);
        project
    }

    pub fn write_service(&self, content: &str) {
        fs::write(self.service_file(), content).unwrap();
    }

    pub fn service_file(&self) -> PathBuf {
        self.root.path().join("stackflow.yml")
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
