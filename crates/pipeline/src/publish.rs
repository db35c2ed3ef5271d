//! Artifact publishing to one or more sinks.
//!
//! The first sink receives the exported bytes; every later sink receives a
//! file copy of what the first one wrote. Adding a destination is adding a
//! sink.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::error::PublishError;

/// What a sink is asked to store.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Bytes(&'a [u8]),
    /// Copy of an artifact another sink already wrote
    CopyOf(&'a Path),
}

/// One destination for artifacts.
pub trait ArtifactSink {
    fn name(&self) -> &str;

    /// Store `payload` under `file_name`, returning where it landed.
    fn put(&self, file_name: &str, payload: Payload<'_>) -> Result<PathBuf, PublishError>;
}

/// Sink writing plain files into a directory, created on demand.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    name: String,
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(name: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn put(&self, file_name: &str, payload: Payload<'_>) -> Result<PathBuf, PublishError> {
        let path = self.dir.join(file_name);
        let fail = |source| PublishError {
            sink: self.name.clone(),
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(fail)?;
        match payload {
            Payload::Bytes(bytes) => fs::write(&path, bytes).map_err(fail)?,
            Payload::CopyOf(src) => {
                fs::copy(src, &path).map_err(fail)?;
            }
        }
        Ok(path)
    }
}

/// Where one artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub sink: String,
    pub path: PathBuf,
}

/// A single publish operation over an ordered list of sinks.
pub struct Publisher {
    sinks: Vec<Box<dyn ArtifactSink>>,
}

impl Publisher {
    pub fn new(sinks: Vec<Box<dyn ArtifactSink>>) -> Self {
        Self { sinks }
    }

    /// Build-output sink followed by the viewer asset sink.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(vec![
            Box::new(DirectorySink::new("dist", &config.dist_dir)),
            Box::new(DirectorySink::new("viewer", &config.viewer_models_dir)),
        ])
    }

    /// Write `bytes` to the first sink and copy that file to the rest.
    /// Stops at the first failing sink.
    pub fn publish(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<Published>, PublishError> {
        let mut published: Vec<Published> = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let payload = match published.first() {
                Some(primary) => Payload::CopyOf(&primary.path),
                None => Payload::Bytes(bytes),
            };
            let path = sink.put(file_name, payload)?;
            published.push(Published {
                sink: sink.name().to_string(),
                path,
            });
        }
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dual_write_creates_dirs_and_copies() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");
        let viewer = dir.path().join("web").join("public").join("models");
        let publisher = Publisher::new(vec![
            Box::new(DirectorySink::new("dist", &dist)),
            Box::new(DirectorySink::new("viewer", &viewer)),
        ]);

        let published = publisher.publish("box.stl", b"mesh").unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].path, dist.join("box.stl"));
        assert_eq!(fs::read(viewer.join("box.stl")).unwrap(), b"mesh");
        assert!(!fs::symlink_metadata(viewer.join("box.stl"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[test]
    fn test_republish_after_external_delete() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new("viewer", dir.path().join("models"));
        let publisher = Publisher::new(vec![
            Box::new(DirectorySink::new("dist", dir.path().join("dist"))),
            Box::new(sink.clone()),
        ]);

        publisher.publish("a.stl", b"one").unwrap();
        fs::remove_file(sink.dir().join("a.stl")).unwrap();
        publisher.publish("a.stl", b"two").unwrap();
        assert_eq!(fs::read(sink.dir().join("a.stl")).unwrap(), b"two");
    }

    #[test]
    fn test_failing_sink_reports_name() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the sink expects a directory
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, b"").unwrap();
        let publisher = Publisher::new(vec![
            Box::new(DirectorySink::new("dist", dir.path().join("dist"))),
            Box::new(DirectorySink::new("viewer", &blocker)),
        ]);

        let err = publisher.publish("a.stl", b"x").unwrap_err();
        assert_eq!(err.sink, "viewer");
        assert!(dir.path().join("dist").join("a.stl").is_file());
    }
}
