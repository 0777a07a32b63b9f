//! Build pipeline
//!
//! Packages a project directory as a build context, submits it to the
//! engine's image-build operation, and interprets the resulting message
//! stream into a definitive verdict. A build that ends without an explicit
//! success marker is a failure: absence of evidence is never treated as
//! success.

use crate::runtime::Engine;
use bollard::image::BuildImageOptions;
use bollard::models::BuildInfo;
use chrono::Utc;
use infracon_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info};

/// File name the orchestrator writes synthesized Dockerfiles under, inside
/// the build context.
pub const SYNTHESIZED_DOCKERFILE: &str = "Dockerfile.ic";

/// A successfully built, tagged image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub tag: String,
}

/// Image tag for an application; a rebuild of the same application
/// supersedes the prior image under the same name.
pub fn image_tag(application_id: &str) -> String {
    format!("infracon-image-{}:latest", application_id)
}

/// Package a project directory into an in-memory tar archive.
pub fn pack_context(context_dir: &Path) -> Result<Vec<u8>> {
    if !context_dir.is_dir() {
        return Err(Error::Context(format!(
            "build context {} is not a readable directory",
            context_dir.display()
        )));
    }

    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_dir_all(".", context_dir)
        .map_err(|e| Error::Context(format!("unable to archive build context: {}", e)))?;
    builder
        .into_inner()
        .map_err(|e| Error::Context(format!("unable to finish build context archive: {}", e)))
}

/// Build an image from `context_dir` using the named Dockerfile within it.
///
/// When `deadline` is set, expiry aborts the outstanding engine call and the
/// attempt surfaces as cancelled.
pub async fn build(
    engine: &Engine,
    context_dir: &Path,
    dockerfile: &str,
    tag: &str,
    deadline: Option<Duration>,
) -> Result<BuildArtifact> {
    let archive = pack_context(context_dir)?;
    info!(
        "Building {} from {} ({} byte context)",
        tag,
        context_dir.display(),
        archive.len()
    );

    let submit = submit_and_interpret(engine, archive, dockerfile, tag);
    match deadline {
        Some(limit) => tokio::time::timeout(limit, submit)
            .await
            .map_err(|_| Error::Cancelled)?,
        None => submit.await,
    }
}

async fn submit_and_interpret(
    engine: &Engine,
    archive: Vec<u8>,
    dockerfile: &str,
    tag: &str,
) -> Result<BuildArtifact> {
    let mut buildargs = HashMap::new();
    buildargs.insert("BUILD_DATE".to_string(), Utc::now().to_rfc3339());

    let options = BuildImageOptions {
        dockerfile: dockerfile.to_string(),
        t: tag.to_string(),
        rm: true,
        nocache: false,
        buildargs,
        ..Default::default()
    };

    let stream = engine.inner().build_image(options, None, Some(archive.into()));
    interpret_build_stream(Box::pin(stream)).await?;

    Ok(BuildArtifact {
        tag: tag.to_string(),
    })
}

/// Consume a build-message stream and produce the final verdict.
///
/// An error fragment anywhere is fatal immediately, before the stream ends.
/// Success requires at least one observed success marker; a stream that
/// merely ends is a failed build. Every fragment is logged raw so a negative
/// verdict stays diagnosable.
pub async fn interpret_build_stream<S>(mut stream: S) -> Result<()>
where
    S: Stream<Item = std::result::Result<BuildInfo, bollard::errors::Error>> + Unpin,
{
    let mut confirmed = false;

    while let Some(message) = stream.next().await {
        let info = message.map_err(|e| Error::Build(e.to_string()))?;

        if let Some(reason) = info.error {
            if !reason.is_empty() {
                error!("Build error: {}", reason.trim_end());
                return Err(Error::Build(reason));
            }
        }

        if let Some(fragment) = info.stream {
            info!("{}", fragment.trim_end());
            if is_success_marker(&fragment) {
                confirmed = true;
            }
        }
    }

    if confirmed {
        Ok(())
    } else {
        Err(Error::Build("no success marker".to_string()))
    }
}

/// Authoritative confirmation that the engine built and/or tagged the image.
///
/// The wording is the engine's; keep the match isolated here so it can track
/// engine changes without touching pipeline control flow.
fn is_success_marker(fragment: &str) -> bool {
    fragment.contains("Successfully built") || fragment.contains("Successfully tagged")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_msg(text: &str) -> BuildInfo {
        BuildInfo {
            stream: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn error_msg(text: &str) -> BuildInfo {
        BuildInfo {
            error: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn as_stream(
        messages: Vec<BuildInfo>,
    ) -> impl Stream<Item = std::result::Result<BuildInfo, bollard::errors::Error>> + Unpin {
        tokio_stream::iter(messages.into_iter().map(Ok))
    }

    #[test]
    fn test_image_tag_is_deterministic() {
        assert_eq!(image_tag("abc"), "infracon-image-abc:latest");
        assert_eq!(image_tag("abc"), image_tag("abc"));
    }

    #[test]
    fn test_success_marker_wording() {
        assert!(is_success_marker("Successfully built 29318c2b7e67\n"));
        assert!(is_success_marker("Successfully tagged infracon-image-abc:latest\n"));
        assert!(!is_success_marker("Step 4/6 : RUN npm install\n"));
    }

    #[tokio::test]
    async fn test_marker_stream_is_verdict_positive() {
        let result = interpret_build_stream(as_stream(vec![
            stream_msg("Step 1/6 : FROM node:20-alpine\n"),
            stream_msg("Successfully built abc\n"),
        ]))
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_stream_without_marker_is_a_failure() {
        let result = interpret_build_stream(as_stream(vec![
            stream_msg("Step 1/6 : FROM node:20-alpine\n"),
            stream_msg("Removing intermediate container\n"),
        ]))
        .await;

        match result {
            Err(Error::Build(reason)) => assert_eq!(reason, "no success marker"),
            other => panic!("expected build failure, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_empty_stream_is_a_failure() {
        let result = interpret_build_stream(as_stream(vec![])).await;
        assert!(matches!(result, Err(Error::Build(_))));
    }

    #[tokio::test]
    async fn test_error_fragment_is_fatal_immediately() {
        // The error wins even when a success marker follows in the stream.
        let result = interpret_build_stream(as_stream(vec![
            stream_msg("Step 3/6 : RUN npm install\n"),
            error_msg("npm install exited with code 1"),
            stream_msg("Successfully built abc\n"),
        ]))
        .await;

        match result {
            Err(Error::Build(reason)) => {
                assert_eq!(reason, "npm install exited with code 1")
            }
            other => panic!("expected build failure, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_empty_error_fragment_is_not_fatal() {
        let result = interpret_build_stream(as_stream(vec![
            BuildInfo {
                error: Some(String::new()),
                stream: Some("Successfully tagged demo:latest\n".to_string()),
                ..Default::default()
            },
        ]))
        .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_pack_context_missing_directory() {
        let result = pack_context(Path::new("/definitely/not/a/real/context"));
        assert!(matches!(result, Err(Error::Context(_))));
    }

    #[test]
    fn test_pack_context_archives_project_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.js"), "console.log('hi')").unwrap();

        let archive = pack_context(dir.path()).unwrap();
        assert!(!archive.is_empty());

        let mut reader = tar::Archive::new(archive.as_slice());
        let names: Vec<String> = reader
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        assert!(names.iter().any(|n| n.contains("index.js")));
    }
}
